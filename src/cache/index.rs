//! Key Index Module
//!
//! Maps keys to node handles. The map is split into independently locked
//! partitions so lookups on different partitions never contend.
//!
//! ```text
//!   key ──► PartitionHasher ──► h % partitions
//!                                   │
//!        ┌─────────┬─────────┬──────┴──┬─────────┐
//!        │ RwLock  │ RwLock  │ RwLock  │   ...   │
//!        │ HashMap │ HashMap │ HashMap │         │
//!        └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! Lock order: a partition lock is always taken before the engine lock, and
//! never more than one partition lock at a time.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::entry::NodeId;

// == Partition Hasher ==
/// Polynomial rolling hash over the bytes a key's `Hash` impl writes.
///
/// Unlike `DefaultHasher` it is unseeded, so a key lands in the same
/// partition in every process.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartitionHasher {
    state: u64,
}

impl Hasher for PartitionHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = self.state.wrapping_mul(31).wrapping_add(u64::from(byte));
        }
    }
}

/// Partition for `key` among `partitions`.
pub fn partition_of<Q: Hash + ?Sized>(key: &Q, partitions: usize) -> usize {
    let mut hasher = PartitionHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

pub(crate) type Partition<K> = HashMap<K, NodeId>;

// == Key Index ==
#[derive(Debug)]
pub(crate) struct KeyIndex<K> {
    partitions: Box<[RwLock<Partition<K>>]>,
}

impl<K: Hash + Eq> KeyIndex<K> {
    /// Creates an index with `partitions` partitions, clamped to at least 1.
    pub(crate) fn new(partitions: usize) -> Self {
        Self {
            partitions: (0..partitions.max(1))
                .map(|_| RwLock::new(HashMap::new()))
                .collect(),
        }
    }

    pub(crate) fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub(crate) fn partition_for<Q>(&self, key: &Q) -> usize
    where
        Q: Hash + ?Sized,
    {
        partition_of(key, self.partitions.len())
    }

    pub(crate) fn read(&self, partition: usize) -> RwLockReadGuard<'_, Partition<K>> {
        self.partitions[partition].read()
    }

    pub(crate) fn write(&self, partition: usize) -> RwLockWriteGuard<'_, Partition<K>> {
        self.partitions[partition].write()
    }

    // == Lookup ==
    pub(crate) fn lookup<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read(self.partition_for(key)).get(key).copied()
    }

    // == Insert ==
    #[cfg(test)]
    pub(crate) fn insert(&self, key: K, id: NodeId) -> Option<NodeId> {
        self.write(self.partition_for(&key)).insert(key, id)
    }

    // == Remove ==
    #[cfg(test)]
    pub(crate) fn remove<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.write(self.partition_for(key)).remove(key)
    }

    /// Removes `key` only while it still maps to `id`.
    pub(crate) fn remove_if<Q>(&self, key: &Q, id: NodeId) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut partition = self.write(self.partition_for(key));
        remove_if_in(&mut *partition, key, id)
    }

    /// Total number of mapped keys. Not atomic across partitions.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.read().len()).sum()
    }
}

/// Compare-and-remove on an already locked partition.
pub(crate) fn remove_if_in<K, Q>(partition: &mut Partition<K>, key: &Q, id: NodeId) -> bool
where
    K: Borrow<Q> + Hash + Eq,
    Q: Hash + Eq + ?Sized,
{
    if partition.get(key) == Some(&id) {
        partition.remove(key);
        true
    } else {
        false
    }
}
