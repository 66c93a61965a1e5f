//! Recency List Module
//!
//! Doubly linked list threaded through the node pool by slot index.
//!
//! - Head = Most recently used
//! - Tail = Least recently used

use crate::cache::pool::NodePool;

// == Recency List ==
/// Head/tail bookkeeping for the intrusive list. Links live in the nodes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RecencyList {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl RecencyList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn head(&self) -> Option<usize> {
        self.head
    }

    #[cfg(test)]
    pub(crate) fn tail(&self) -> Option<usize> {
        self.tail
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A node is linked when it is the head or has a predecessor.
    pub(crate) fn is_linked<K>(&self, pool: &NodePool<K>, slot: usize) -> bool {
        self.head == Some(slot) || pool.get(slot).is_some_and(|node| node.prev.is_some())
    }

    // == Push Front ==
    /// Inserts `slot` at the head, or promotes it there if already linked.
    pub(crate) fn push_front<K>(&mut self, pool: &mut NodePool<K>, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        if self.is_linked(pool, slot) {
            self.detach(pool, slot);
        }
        self.attach_front(pool, slot);
    }

    // == Pop Back ==
    /// Detaches and returns the least recently used slot.
    pub(crate) fn pop_back<K>(&mut self, pool: &mut NodePool<K>) -> Option<usize> {
        let tail = self.tail?;
        self.detach(pool, tail);
        Some(tail)
    }

    // == Unlink ==
    /// Removes `slot` from wherever it sits. Returns false if it was not linked.
    pub(crate) fn unlink<K>(&mut self, pool: &mut NodePool<K>, slot: usize) -> bool {
        if !self.is_linked(pool, slot) {
            return false;
        }
        self.detach(pool, slot);
        true
    }

    /// Slots from head to tail.
    pub(crate) fn slots<K>(&self, pool: &NodePool<K>) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len);
        let mut current = self.head;
        while let Some(slot) = current {
            out.push(slot);
            current = pool.get(slot).and_then(|node| node.next);
        }
        out
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    fn detach<K>(&mut self, pool: &mut NodePool<K>, slot: usize) {
        let (prev, next) = match pool.get(slot) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        // A <-> B <-> C: remove B
        match prev {
            Some(prev_slot) => {
                if let Some(prev_node) = pool.get_mut(prev_slot) {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next_slot) => {
                if let Some(next_node) = pool.get_mut(next_slot) {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = pool.get_mut(slot) {
            node.prev = None;
            node.next = None;
        }
        self.len -= 1;
    }

    fn attach_front<K>(&mut self, pool: &mut NodePool<K>, slot: usize) {
        let old_head = self.head;
        match pool.get_mut(slot) {
            Some(node) => {
                node.prev = None;
                node.next = old_head;
            }
            None => return,
        }
        match old_head {
            Some(old_head) => {
                if let Some(head_node) = pool.get_mut(old_head) {
                    head_node.prev = Some(slot);
                }
            }
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        self.len += 1;
    }

    #[cfg(test)]
    pub(crate) fn debug_validate_invariants<K>(&self, pool: &NodePool<K>) {
        if self.head.is_none() || self.tail.is_none() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            assert_eq!(self.len, 0);
            return;
        }

        let mut seen = std::collections::HashSet::new();
        let mut count = 0usize;
        let mut current = self.head;
        let mut prev = None;

        while let Some(slot) = current {
            assert!(seen.insert(slot), "cycle at slot {slot}");
            let node = pool.get(slot).expect("node missing");
            assert!(node.is_live(), "dead node {slot} linked");
            assert_eq!(node.prev, prev);
            if node.next.is_none() {
                assert_eq!(self.tail, Some(slot));
            }
            prev = Some(slot);
            current = node.next;
            count += 1;
            assert!(count <= self.len);
        }

        assert_eq!(count, self.len);
        assert_eq!(pool.len(), self.len);
    }
}
