//! Memoized selectors with dependant-based cache invalidation.
//!
//! A *selector* is a pure derivation over a source object plus extra
//! arguments, e.g. filtering a large collection held in a state tree. In
//! pipelines where the source is replaced wholesale on every update but most
//! of it is structurally unchanged, rerunning such derivations is wasted
//! work. [`Selector`] wraps a derivation and reruns it only when
//!
//! - the *dependants*, references derived from the source that the
//!   derivation actually reads, change identity, or
//! - the extra arguments differ from every recently seen call.
//!
//! Within one set of dependants, results are kept in a bounded
//! least-recently-used cache keyed by the identity of the extra arguments.
//! When dependants are shared allocations ([`Rc`]/[`Arc`]), each distinct
//! dependants path additionally gets its own independent cache, so unrelated
//! branches of a state tree invalidate independently.
//!
//! ```
//! use std::rc::Rc;
//! use selemo::{Dependant, Selector};
//!
//! struct State {
//!     todos: Rc<Vec<(&'static str, bool)>>,
//! }
//!
//! let filter = Selector::with_dependants(
//!     |state: &State, &(done,): &(bool,)| {
//!         state.todos.iter().filter(|t| t.1 == done).count()
//!     },
//!     |state: &State, _: &(bool,)| Dependant::shared(&state.todos),
//! );
//!
//! let state = State { todos: Rc::new(vec![("gym", true), ("laundry", false)]) };
//! assert_eq!(filter.call(&state, &(true,)), 1); // computed
//! assert_eq!(filter.call(&state, &(true,)), 1); // cached
//! assert!(filter.last_was_hit());
//! ```
//!
//! # Equality model
//!
//! All comparisons are shallow: arguments and dependants are reduced to
//! identity tokens ([`Key`]) and compared elementwise. There is no deep
//! equality, no hashing and no serialization; two distinct allocations with
//! equal contents are different keys.
//!
//! # Threading
//!
//! Selectors are single-threaded by design. The cache is interior-mutable
//! state behind a `RefCell` and keys may be raw addresses, so [`Selector`]
//! is neither `Send` nor `Sync`; wrap it in external synchronization if you
//! must share it, but note that this crate deliberately ships no locks.

mod dependants;
mod key;
mod lru;
mod select;
mod store;

pub use crate::dependants::{AsDependant, Dependant, IntoDependants};
pub use crate::key::{ArgKeys, Key, ShallowKey, shallow_eq};
pub use crate::select::Selector;
