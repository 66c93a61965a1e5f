//! Node Pool Module
//!
//! Arena of list nodes addressed by slot index. Released slots go on a free
//! stack and are handed out again before the arena grows.

use std::mem;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::cache::entry::{Node, NodeId};

/// What is left of a node after it has been released back to the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Retired<K> {
    pub(crate) key: K,
    /// Handle the node had while live; no longer resolves
    pub(crate) id: NodeId,
    pub(crate) footprint: u64,
}

// == Node Pool ==
/// Arena plus freelist. Not synchronized; the owning engine serializes access.
#[derive(Debug)]
pub(crate) struct NodePool<K> {
    nodes: Vec<Node<K>>,
    free: Vec<usize>,
    live: usize,
}

impl<K> NodePool<K> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    // == Acquire ==
    /// Returns a node populated with `key` and `value`, recycling a retired
    /// slot when one is available.
    pub(crate) fn acquire(
        &mut self,
        key: K,
        value: Vec<u8>,
        ttl: Option<Duration>,
        now: Instant,
    ) -> NodeId {
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            let node = &mut self.nodes[slot];
            node.key = Some(key);
            node.value = value;
            node.prev = None;
            node.next = None;
            node.last_access = now;
            node.ttl = ttl;
            trace!(slot, "recycled pooled node");
            return NodeId {
                slot,
                generation: node.generation,
            };
        }

        self.nodes.push(Node::new(key, value, ttl, now));
        NodeId {
            slot: self.nodes.len() - 1,
            generation: 0,
        }
    }

    // == Release ==
    /// Clears the node at `slot` and pushes it onto the freelist.
    ///
    /// The caller must already have unlinked it from the recency list.
    /// Returns None when the slot is not live.
    pub(crate) fn release(&mut self, slot: usize) -> Option<Retired<K>> {
        let node = self.nodes.get_mut(slot)?;
        let key = node.key.take()?;
        let retired = Retired {
            key,
            id: NodeId {
                slot,
                generation: node.generation,
            },
            footprint: node.footprint(),
        };

        node.value = Vec::new();
        node.prev = None;
        node.next = None;
        node.ttl = None;
        node.generation = node.generation.wrapping_add(1);

        self.free.push(slot);
        self.live -= 1;
        Some(retired)
    }

    // == Resolve ==
    /// Returns the slot for `id` if it still names a live node.
    pub(crate) fn resolve(&self, id: NodeId) -> Option<usize> {
        self.nodes
            .get(id.slot)
            .filter(|node| node.is_live() && node.generation == id.generation)
            .map(|_| id.slot)
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&Node<K>> {
        self.nodes.get(slot)
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut Node<K>> {
        self.nodes.get_mut(slot)
    }

    /// Swaps in a new value, returning the old one.
    pub(crate) fn replace_value(&mut self, slot: usize, value: Vec<u8>) -> Option<Vec<u8>> {
        self.nodes
            .get_mut(slot)
            .filter(|node| node.is_live())
            .map(|node| mem::replace(&mut node.value, value))
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Number of slots ever allocated, live or pooled.
    pub(crate) fn allocated(&self) -> usize {
        self.nodes.len()
    }

    /// Number of retired slots waiting for reuse.
    pub(crate) fn pooled(&self) -> usize {
        self.free.len()
    }
}

impl<K> Default for NodePool<K> {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_acquire_fresh() {
        let mut pool = NodePool::new();
        let now = Instant::now();

        let a = pool.acquire("a", vec![1], None, now);
        let b = pool.acquire("b", vec![2], None, now);

        assert_ne!(a.slot(), b.slot());
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.allocated(), 2);
        assert_eq!(pool.pooled(), 0);
    }

    #[test]
    fn test_pool_release_clears_node() {
        let mut pool = NodePool::new();
        let id = pool.acquire("a", vec![0; 16], None, Instant::now());

        let retired = pool.release(id.slot()).unwrap();
        assert_eq!(retired.key, "a");
        assert_eq!(retired.id, id);
        assert_eq!(retired.footprint, 16);

        let node = pool.get(id.slot()).unwrap();
        assert!(node.key.is_none());
        assert!(node.value.is_empty());
        assert_eq!(node.value.capacity(), 0);
        assert!(node.prev.is_none() && node.next.is_none());
        assert_eq!(pool.len(), 0);
        assert_eq!(pool.pooled(), 1);
    }

    #[test]
    fn test_pool_reuses_released_slot() {
        let mut pool = NodePool::new();
        let now = Instant::now();

        let first = pool.acquire("a", vec![1], None, now);
        pool.release(first.slot());
        let second = pool.acquire("b", vec![2], None, now);

        assert_eq!(second.slot(), first.slot());
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.get(second.slot()).unwrap().key, Some("b"));
    }

    #[test]
    fn test_stale_handle_does_not_resolve_after_reuse() {
        let mut pool = NodePool::new();
        let now = Instant::now();

        let first = pool.acquire("a", vec![1], None, now);
        pool.release(first.slot());
        let second = pool.acquire("b", vec![2], None, now);

        assert_eq!(pool.resolve(first), None);
        assert_eq!(pool.resolve(second), Some(second.slot()));
    }

    #[test]
    fn test_release_twice_is_noop() {
        let mut pool = NodePool::new();
        let id = pool.acquire("a", vec![1], None, Instant::now());

        assert!(pool.release(id.slot()).is_some());
        assert!(pool.release(id.slot()).is_none());
        assert_eq!(pool.pooled(), 1);
        assert!(pool.release(99).is_none());
    }

    #[test]
    fn test_replace_value() {
        let mut pool = NodePool::new();
        let id = pool.acquire("a", b"old".to_vec(), None, Instant::now());

        let old = pool.replace_value(id.slot(), b"new".to_vec()).unwrap();
        assert_eq!(old, b"old");
        assert_eq!(pool.get(id.slot()).unwrap().value, b"new");
    }
}
