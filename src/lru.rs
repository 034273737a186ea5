use slab::Slab;

use crate::key::{Key, shallow_eq};

/// A bounded least-recently-used cache over argument tuples.
///
/// Entries form a doubly-linked list ordered by recency, with the most
/// recently used entry at the head and the eviction candidate at the tail.
/// Nodes live in a [`Slab`] and link to each other by index, so all pointer
/// surgery is plain index bookkeeping.
///
/// Lookup scans the list and compares tuples shallowly, which is linear in
/// the current occupancy; the promotion, insertion and eviction relinking
/// around it is constant-time. Occupancy is bounded by `capacity` when one
/// is set. An unbounded cache is an intentional tradeoff for small working
/// sets: every distinct tuple ever seen stays resident until [`clear`].
///
/// Argument tuples are cache keys: only the most recent insertion for a
/// given tuple exists. The caller upholds this by only inserting a tuple
/// after a missed lookup for it.
///
/// [`clear`]: ArgCache::clear
pub(crate) struct ArgCache<T> {
    /// The node arena. Its length is the cache's occupancy.
    nodes: Slab<Node<T>>,
    /// The most recently used node.
    head: Option<usize>,
    /// The least recently used node, evicted first on overflow.
    tail: Option<usize>,
    /// The occupancy bound. `None` is unbounded; zero retains nothing.
    capacity: Option<usize>,
}

/// A cached result, keyed by the argument tuple that produced it.
struct Node<T> {
    args: Vec<Key>,
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<T> ArgCache<T> {
    /// Creates an empty cache with the given occupancy bound.
    pub fn new(capacity: Option<usize>) -> Self {
        Self { nodes: Slab::new(), head: None, tail: None, capacity }
    }

    /// The current occupancy.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Resets the cache to empty. Idempotent.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    /// Looks up the value cached for a tuple, promoting a hit to the head.
    pub fn get(&mut self, args: &[Key]) -> Option<&T> {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            if shallow_eq(&self.nodes[id].args, args) {
                self.promote(id);
                return Some(&self.nodes[id].value);
            }
            cursor = self.nodes[id].next;
        }
        None
    }

    /// Inserts the value computed for a tuple, evicting the tail if the
    /// cache was already at capacity.
    ///
    /// Must only be called after [`get`](ArgCache::get) missed for the same
    /// tuple. With a capacity of zero the freshly linked node is itself the
    /// tail and is evicted on the spot, so nothing is ever retained.
    pub fn insert(&mut self, args: Vec<Key>, value: T) {
        let at_capacity = self.capacity.is_some_and(|cap| self.nodes.len() >= cap);

        let id = self.nodes.insert(Node { args, value, prev: None, next: self.head });
        match self.head {
            Some(head) => self.nodes[head].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);

        if at_capacity {
            self.pop_tail();
        }
    }

    /// Unlinks and drops the least recently used node.
    fn pop_tail(&mut self) {
        let Some(id) = self.tail else { return };
        let prev = self.nodes[id].prev;
        match prev {
            Some(prev) => self.nodes[prev].next = None,
            None => self.head = None,
        }
        self.tail = prev;
        self.nodes.remove(id);
    }

    /// Moves a resident node to the head of the recency list.
    fn promote(&mut self, id: usize) {
        if self.head == Some(id) {
            return;
        }

        // Not the head, so a predecessor exists.
        let prev = self.nodes[id].prev;
        let next = self.nodes[id].next;
        if let Some(prev) = prev {
            self.nodes[prev].next = next;
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }

        let old_head = self.head;
        self.nodes[id].prev = None;
        self.nodes[id].next = old_head;
        if let Some(head) = old_head {
            self.nodes[head].prev = Some(id);
        }
        self.head = Some(id);
    }

    /// Checks the linked-list invariants of the data structure.
    #[cfg(test)]
    fn assert_consistency(&self) {
        let mut seen = Vec::new();
        let mut cursor = self.head;
        let mut prev = None;
        while let Some(id) = cursor {
            let node = &self.nodes[id];
            assert_eq!(node.prev, prev);
            for &other in &seen {
                let other: &Node<T> = &self.nodes[other];
                assert!(!shallow_eq(&other.args, &node.args), "duplicate tuple");
            }
            seen.push(id);
            prev = cursor;
            cursor = node.next;
        }
        assert_eq!(self.tail, prev);
        assert_eq!(seen.len(), self.nodes.len());
        if let Some(cap) = self.capacity {
            assert!(self.nodes.len() <= cap);
        }
    }
}
