use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use selemo::{Dependant, Selector};

#[derive(Clone, PartialEq, Debug)]
struct Todo {
    text: &'static str,
    complete: bool,
}

struct State {
    todos: Rc<Vec<Todo>>,
}

fn todos() -> Rc<Vec<Todo>> {
    Rc::new(vec![
        Todo { text: "Go to the gym", complete: true },
        Todo { text: "Try to spend time in the sunlight", complete: false },
        Todo { text: "Laundry must be done", complete: true },
    ])
}

/// A todo-filtering selector that counts how often it actually computes.
fn filter_selector(
    calls: &Cell<usize>,
) -> Selector<
    State,
    (bool,),
    Vec<Todo>,
    impl Fn(&State, &(bool,)) -> Vec<Todo> + '_,
    impl Fn(&State, &(bool,)) -> Dependant,
    Dependant,
> {
    Selector::with_dependants(
        move |state: &State, &(complete,): &(bool,)| {
            calls.set(calls.get() + 1);
            state
                .todos
                .iter()
                .filter(|todo| todo.complete == complete)
                .cloned()
                .collect()
        },
        |state: &State, _: &(bool,)| Dependant::shared(&state.todos),
    )
}

#[test]
fn test_computes_once_for_stable_inputs() {
    let calls = Cell::new(0);
    let filter = filter_selector(&calls);
    let state = State { todos: todos() };

    let first = filter.call(&state, &(true,)); // [Miss] The cache is empty.
    assert!(!filter.last_was_hit());
    let second = filter.call(&state, &(true,)); // [Hit] Nothing changed.
    assert!(filter.last_was_hit());

    assert_eq!(calls.get(), 1);
    assert_eq!(first, second);
    assert_eq!(first, vec![
        Todo { text: "Go to the gym", complete: true },
        Todo { text: "Laundry must be done", complete: true },
    ]);
}

#[test]
fn test_distinct_arguments_are_distinct_entries() {
    let calls = Cell::new(0);
    let filter = filter_selector(&calls);
    let state = State { todos: todos() };

    filter.call(&state, &(true,)); // [Miss]
    filter.call(&state, &(false,)); // [Miss] Different argument.
    filter.call(&state, &(true,)); // [Hit] Both tuples stay resident.
    filter.call(&state, &(false,)); // [Hit]
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_source_replacement_with_stable_dependants_still_hits() {
    let calls = Cell::new(0);
    let filter = filter_selector(&calls);
    let state = State { todos: todos() };

    filter.call(&state, &(true,)); // [Miss]

    // A shallow copy of the state shares the todo list, so the dependants
    // are unchanged and the cache remains valid.
    let copy = State { todos: Rc::clone(&state.todos) };
    filter.call(&copy, &(true,)); // [Hit]
    assert!(filter.last_was_hit());
    assert_eq!(calls.get(), 1);

    // A new todo list is a new dependant even with identical contents.
    let replaced = State { todos: todos() };
    filter.call(&replaced, &(true,)); // [Miss]
    assert!(!filter.last_was_hit());
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_default_dependants_cache_on_the_whole_source() {
    let calls = Cell::new(0);
    let double = Selector::new(|source: &Rc<Vec<u32>>, &(at,): &(usize,)| {
        calls.set(calls.get() + 1);
        source[at] * 2
    });

    let source = Rc::new(vec![1, 2, 3]);
    assert_eq!(double.call(&source, &(1,)), 4); // [Miss]
    assert_eq!(double.call(&source, &(1,)), 4); // [Hit]
    assert_eq!(calls.get(), 1);

    // Same contents, different allocation: the source is the dependant.
    let replaced = Rc::new(vec![1, 2, 3]);
    assert_eq!(double.call(&replaced, &(1,)), 4); // [Miss]
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_clear_forces_recomputation() {
    let calls = Cell::new(0);
    let filter = filter_selector(&calls);
    let state = State { todos: todos() };

    filter.call(&state, &(true,)); // [Miss]
    filter.clear();
    filter.clear(); // Idempotent.
    filter.call(&state, &(true,)); // [Miss] Cleared.
    filter.call(&state, &(true,)); // [Hit]
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_empty_argument_tuple() {
    let calls = Cell::new(0);
    let total = Selector::with_dependants(
        |state: &State, _: &()| {
            calls.set(calls.get() + 1);
            state.todos.len()
        },
        |state: &State, _: &()| Dependant::shared(&state.todos),
    );

    let state = State { todos: todos() };
    assert_eq!(total.call(&state, &()), 3); // [Miss]
    assert_eq!(total.call(&state, &()), 3); // [Hit]
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_panicking_selector_caches_nothing() {
    let calls = Cell::new(0);
    let fail = Cell::new(true);
    let filter = Selector::with_dependants(
        |state: &State, &(complete,): &(bool,)| {
            calls.set(calls.get() + 1);
            assert!(!fail.get(), "derivation failed");
            state.todos.iter().filter(|t| t.complete == complete).count()
        },
        |state: &State, _: &(bool,)| Dependant::shared(&state.todos),
    );

    let state = State { todos: todos() };
    let result = catch_unwind(AssertUnwindSafe(|| filter.call(&state, &(true,))));
    assert!(result.is_err());

    // The failure was not cached: the same call computes again and the
    // selector stays usable.
    fail.set(false);
    assert_eq!(filter.call(&state, &(true,)), 2); // [Miss]
    assert_eq!(filter.call(&state, &(true,)), 2); // [Hit]
    assert_eq!(calls.get(), 2);
}
