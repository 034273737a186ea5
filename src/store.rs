use rustc_hash::FxHashMap;

use crate::dependants::{Dependant, Watch};
use crate::key::Key;
use crate::lru::ArgCache;

/// How many resolutions may pass between automatic dead-branch sweeps.
const SWEEP_INTERVAL: usize = 64;

/// A leaf cache: one argument cache plus the dependants vector it last saw.
///
/// The vector is kept as bare keys, so a recorded dependant is never kept
/// alive by the cache that remembers it.
pub(crate) struct Leaf<T> {
    pub cache: ArgCache<T>,
    pub last_dependants: Option<Vec<Key>>,
}

impl<T> Leaf<T> {
    /// Creates an empty leaf whose cache has the given occupancy bound.
    pub fn new(capacity: Option<usize>) -> Self {
        Self { cache: ArgCache::new(capacity), last_dependants: None }
    }

    /// Drops all cached state including the dependants memory.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.last_dependants = None;
    }
}

/// A tree of independent leaf caches, partitioned by dependant identity.
///
/// Each level associates a dependant's key with the next level; the branch
/// for a dependants path holds that path's own leaf, so unrelated branches
/// of a source tree invalidate independently. The association is non-owning:
/// a branch carries only a [`Watch`] on the dependant that keys it.
///
/// Rust has weak references but no ephemeron tables, so branches whose
/// dependant has been dropped are swept rather than collected: explicitly
/// via [`prune`](Store::prune), and automatically every [`SWEEP_INTERVAL`]
/// resolutions.
///
/// Only watchable dependants partition. Resolution stops at the first plain
/// value in the vector and everything past that prefix shares the leaf at
/// the stopping point, which over-shares cache entries but never
/// under-shares them.
pub(crate) struct Store<T> {
    root: Level<T>,
    /// Occupancy bound handed to each leaf cache created under this store.
    capacity: Option<usize>,
    /// Resolutions since the last automatic sweep.
    resolves: usize,
}

/// One level of the partition tree.
struct Level<T> {
    branches: FxHashMap<Key, Branch<T>>,
    /// The leaf for paths that terminate at this level.
    leaf: Option<Leaf<T>>,
}

/// The subtree keyed by one dependant.
struct Branch<T> {
    watch: Watch,
    level: Level<T>,
}

impl<T> Level<T> {
    fn new() -> Self {
        Self { branches: FxHashMap::default(), leaf: None }
    }
}

impl<T> Branch<T> {
    fn new(watch: Watch) -> Self {
        Self { watch, level: Level::new() }
    }
}

impl<T> Store<T> {
    /// Creates an empty store.
    pub fn new(capacity: Option<usize>) -> Self {
        Self { root: Level::new(), capacity, resolves: 0 }
    }

    /// Returns the leaf for a dependants vector, creating the path and the
    /// leaf on first visit.
    pub fn resolve(&mut self, dependants: &[Dependant]) -> &mut Leaf<T> {
        self.resolves += 1;
        if self.resolves >= SWEEP_INTERVAL {
            self.resolves = 0;
            self.prune();
        }

        let capacity = self.capacity;
        let mut level = &mut self.root;
        for dependant in dependants {
            let Some(watch) = dependant.watch() else { break };
            let branch = level
                .branches
                .entry(dependant.key())
                .and_modify(|branch| {
                    // The keying allocation died and its address was reused
                    // by a new one; the old subtree is stale.
                    if !branch.watch.alive() {
                        *branch = Branch::new(watch.clone());
                    }
                })
                .or_insert_with(|| Branch::new(watch.clone()));
            level = &mut branch.level;
        }

        level.leaf.get_or_insert_with(|| Leaf::new(capacity))
    }

    /// Removes every branch whose dependant has been dropped, releasing the
    /// caches below it.
    pub fn prune(&mut self) {
        prune_level(&mut self.root);
    }

    /// Discards the entire tree.
    pub fn reset(&mut self) {
        self.root = Level::new();
        self.resolves = 0;
    }

    /// The number of branches currently in the tree.
    #[cfg(test)]
    fn branch_count(&self) -> usize {
        fn count<T>(level: &Level<T>) -> usize {
            level
                .branches
                .values()
                .map(|branch| 1 + count(&branch.level))
                .sum()
        }
        count(&self.root)
    }
}

fn prune_level<T>(level: &mut Level<T>) {
    level.branches.retain(|_, branch| {
        if !branch.watch.alive() {
            return false;
        }
        prune_level(&mut branch.level);
        true
    });
}
