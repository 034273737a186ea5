use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::num::NonZeroUsize;

use crate::dependants::{AsDependant, Dependant, IntoDependants};
use crate::key::{ArgKeys, Key, shallow_eq};
use crate::store::{Leaf, Store};

/// A memoized selector.
///
/// Wraps a derivation `select: Fn(&S, &A) -> T` over a source and an
/// extra-argument tuple, together with a dependants callback that names the
/// parts of the source the derivation reads. Calls recompute only when the
/// dependants change identity or the arguments differ from every recently
/// seen tuple; otherwise the cached result is cloned out and the derivation
/// does not run.
///
/// Each selector owns its caches exclusively: state persists between calls
/// to the same selector and never leaks across independently created ones.
///
/// By default caches are partitioned per dependants path, so a selector used
/// against several branches of a source tree keeps an independent cache per
/// branch; [`shared`](Selector::shared) opts into a single cache for all
/// calls instead. Partitions whose dependants have been dropped are swept
/// out periodically, or immediately via [`prune`](Selector::prune); in
/// shared mode memory is only released by [`clear`](Selector::clear).
///
/// A panic in the derivation propagates to the caller and caches nothing:
/// the next identical call recomputes.
pub struct Selector<S, A, T, F, G, D = Vec<Dependant>> {
    select: F,
    dependants: G,
    mode: RefCell<Mode<T>>,
    capacity: Option<usize>,
    last_was_hit: Cell<bool>,
    marker: PhantomData<fn(&S, &A) -> D>,
}

/// Where a selector keeps its cached results.
enum Mode<T> {
    /// An independent leaf cache per dependants path.
    Partitioned(Store<T>),
    /// One cache for all calls, regardless of dependants.
    Shared(Leaf<T>),
}

impl<T> Mode<T> {
    /// The leaf cache responsible for a dependants vector.
    fn leaf_for(&mut self, dependants: &[Dependant]) -> &mut Leaf<T> {
        match self {
            Self::Partitioned(store) => store.resolve(dependants),
            Self::Shared(leaf) => leaf,
        }
    }
}

impl<S, A, T, F> Selector<S, A, T, F, fn(&S, &A) -> Vec<Dependant>>
where
    S: AsDependant,
    A: ArgKeys,
    T: Clone,
    F: Fn(&S, &A) -> T,
{
    /// Creates a selector that caches on the identity of the entire source.
    ///
    /// Equivalent to [`with_dependants`](Selector::with_dependants) with a
    /// callback returning the source as its only dependant. Any change of
    /// source identity invalidates; supply a dependants callback to keep
    /// caches alive across source replacements that leave the read parts
    /// untouched.
    pub fn new(select: F) -> Self {
        Self::with_dependants(select, whole_source::<S, A>)
    }
}

impl<S, A, T, F, G, D> Selector<S, A, T, F, G, D>
where
    A: ArgKeys,
    T: Clone,
    F: Fn(&S, &A) -> T,
    G: Fn(&S, &A) -> D,
    D: IntoDependants,
{
    /// Creates a selector with an explicit dependants callback.
    ///
    /// The callback receives the full argument list on every call, before
    /// any cache work, and may return a single [`Dependant`] or a sequence
    /// of them.
    pub fn with_dependants(select: F, dependants: G) -> Self {
        Self {
            select,
            dependants,
            mode: RefCell::new(Mode::Partitioned(Store::new(None))),
            capacity: None,
            last_was_hit: Cell::new(false),
            marker: PhantomData,
        }
    }

    /// Bounds every cache's occupancy to `max_size` entries.
    ///
    /// Unset by default: every distinct argument tuple stays resident until
    /// the dependants change or the selector is cleared, which is the right
    /// tradeoff only for small argument spaces.
    pub fn max_size(mut self, max_size: NonZeroUsize) -> Self {
        self.capacity = Some(max_size.get());
        self.rebuild();
        self
    }

    /// Uses one shared cache for all calls instead of a cache per
    /// dependants path.
    ///
    /// Always correct, and the only mode that allocates nothing per
    /// dependant; the cost is that distinct dependants vectors now evict
    /// each other and per-branch memory is never reclaimed short of
    /// [`clear`](Selector::clear).
    pub fn shared(mut self) -> Self {
        self.mode = RefCell::new(Mode::Shared(Leaf::new(self.capacity)));
        self
    }

    /// Invokes the selector, using a cached result when one is valid.
    pub fn call(&self, source: &S, args: &A) -> T {
        // The dependants callback gates everything else.
        let dependants = (self.dependants)(source, args).into_dependants();
        let keys = args.keys();

        let mut mode = self.mode.borrow_mut();
        let leaf = mode.leaf_for(&dependants);

        let dep_keys: Vec<Key> = dependants.iter().map(|d| d.key()).collect();
        if let Some(last) = &leaf.last_dependants
            && !shallow_eq(last, &dep_keys)
        {
            // Dependants changed: invalidate only this partition.
            leaf.cache.clear();
        }
        leaf.last_dependants = Some(dep_keys);

        if let Some(value) = leaf.cache.get(&keys) {
            let value = value.clone();
            self.last_was_hit.set(true);
            return value;
        }

        // Release the borrow before running the derivation, so that a
        // panicking or reentrant selector never leaves the cache borrowed
        // and no entry exists for a computation that did not finish.
        drop(mode);

        let value = (self.select)(source, args);

        let mut mode = self.mode.borrow_mut();
        let leaf = mode.leaf_for(&dependants);
        // A reentrant call with the same arguments may have cached a value
        // in the meantime; tuples stay unique.
        if leaf.cache.get(&keys).is_none() {
            leaf.cache.insert(keys, value.clone());
        }
        self.last_was_hit.set(false);
        value
    }

    /// Drops all cached state and dependants memory. Idempotent.
    pub fn clear(&self) {
        match &mut *self.mode.borrow_mut() {
            Mode::Partitioned(store) => store.reset(),
            Mode::Shared(leaf) => leaf.reset(),
        }
    }

    /// Immediately releases partitions whose dependants have been dropped.
    ///
    /// A no-op in [`shared`](Selector::shared) mode.
    pub fn prune(&self) {
        if let Mode::Partitioned(store) = &mut *self.mode.borrow_mut() {
            store.prune();
        }
    }

    /// Whether the last [`call`](Selector::call) was served from cache.
    pub fn last_was_hit(&self) -> bool {
        self.last_was_hit.get()
    }

    /// Replaces the cache structure with an empty one of the same mode.
    fn rebuild(&mut self) {
        let mode = match &*self.mode.borrow() {
            Mode::Partitioned(_) => Mode::Partitioned(Store::new(self.capacity)),
            Mode::Shared(_) => Mode::Shared(Leaf::new(self.capacity)),
        };
        self.mode = RefCell::new(mode);
    }
}

/// The default dependants callback: the source itself.
fn whole_source<S: AsDependant, A>(source: &S, _: &A) -> Vec<Dependant> {
    vec![source.as_dependant()]
}
