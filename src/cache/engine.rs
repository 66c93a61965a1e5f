//! Cache Engine Module
//!
//! Pool, recency list and footprint accounting bundled together. This is the
//! state a facade guards with its cache-wide lock; the key index lives outside.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::cache::entry::NodeId;
use crate::cache::list::RecencyList;
use crate::cache::policy::{evict_until_fits, CacheState, ExpirationPolicy};
use crate::cache::pool::{NodePool, Retired};

/// Outcome of a write.
#[derive(Debug)]
pub(crate) struct Written<K> {
    pub(crate) id: NodeId,
    /// False when the written node was itself evicted to restore capacity
    pub(crate) retained: bool,
    pub(crate) evicted: Vec<Retired<K>>,
}

/// Outcome of a read through a handle.
#[derive(Debug)]
pub(crate) enum Lookup<K> {
    /// Promoted; the slot holds the value
    Hit(usize),
    /// Found past its expiry and purged
    Expired(Retired<K>),
    /// The handle no longer names a live node
    Stale,
}

// == Engine ==
#[derive(Debug)]
pub(crate) struct Engine<K> {
    pool: NodePool<K>,
    list: RecencyList,
    /// Sum of live value capacities in bytes
    size: u64,
    capacity: u64,
    expiration: ExpirationPolicy,
}

impl<K> Engine<K> {
    pub(crate) fn new(capacity: u64, expiration: ExpirationPolicy) -> Self {
        Self {
            pool: NodePool::new(),
            list: RecencyList::new(),
            size: 0,
            capacity,
            expiration,
        }
    }

    // == Insert ==
    /// Links a new node for `key` at the head, then enforces capacity.
    pub(crate) fn insert(
        &mut self,
        key: K,
        value: Vec<u8>,
        ttl: Option<Duration>,
        now: Instant,
    ) -> Written<K> {
        let ttl = self.expiration.effective_ttl(ttl);
        let id = self.pool.acquire(key, value, ttl, now);
        self.size += self.footprint(id.slot);
        self.list.push_front(&mut self.pool, id.slot);
        self.finish_write(id)
    }

    // == Replace ==
    /// Swaps the value of a live node in place, refreshing its expiry and
    /// promoting it. Returns the value back when `id` is stale.
    pub(crate) fn replace(
        &mut self,
        id: NodeId,
        value: Vec<u8>,
        ttl: Option<Duration>,
        now: Instant,
    ) -> Result<Written<K>, Vec<u8>> {
        let Some(slot) = self.pool.resolve(id) else {
            return Err(value);
        };

        let new_footprint = value.capacity() as u64;
        if let Some(old) = self.pool.replace_value(slot, value) {
            self.size = self.size - old.capacity() as u64 + new_footprint;
        }
        let ttl = self.expiration.effective_ttl(ttl);
        if let Some(node) = self.pool.get_mut(slot) {
            node.ttl = ttl;
            node.touch(now);
        }
        self.list.push_front(&mut self.pool, slot);
        Ok(self.finish_write(id))
    }

    fn finish_write(&mut self, id: NodeId) -> Written<K> {
        let evicted = evict_until_fits(
            &mut self.pool,
            &mut self.list,
            &mut self.size,
            self.capacity,
        );
        Written {
            id,
            retained: self.pool.resolve(id).is_some(),
            evicted,
        }
    }

    // == Lookup ==
    /// Resolves `id`, purging it if expired and promoting it otherwise.
    pub(crate) fn lookup(&mut self, id: NodeId, now: Instant) -> Lookup<K> {
        let Some(slot) = self.pool.resolve(id) else {
            return Lookup::Stale;
        };

        let expired = self
            .pool
            .get(slot)
            .is_some_and(|node| node.is_expired(now));
        if expired {
            return match self.remove_slot(slot) {
                Some(retired) => {
                    trace!(slot, "purged expired entry on access");
                    Lookup::Expired(retired)
                }
                None => Lookup::Stale,
            };
        }

        if let Some(node) = self.pool.get_mut(slot) {
            node.touch(now);
        }
        self.list.push_front(&mut self.pool, slot);
        Lookup::Hit(slot)
    }

    /// Value bytes at a slot returned by [`Engine::lookup`].
    pub(crate) fn value(&self, slot: usize) -> &[u8] {
        self.pool
            .get(slot)
            .map(|node| node.value.as_slice())
            .unwrap_or_default()
    }

    /// Remaining ttl without promoting; None for stale, expired or durable.
    pub(crate) fn ttl_remaining(&self, id: NodeId, now: Instant) -> Option<Duration> {
        let node = self.pool.get(self.pool.resolve(id)?)?;
        if node.is_expired(now) {
            return None;
        }
        node.ttl_remaining(now)
    }

    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        self.pool.resolve(id).is_some()
    }

    // == Remove ==
    /// Unlinks and releases the node named by `id`.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Retired<K>> {
        let slot = self.pool.resolve(id)?;
        self.remove_slot(slot)
    }

    fn remove_slot(&mut self, slot: usize) -> Option<Retired<K>> {
        self.list.unlink(&mut self.pool, slot);
        let retired = self.pool.release(slot)?;
        self.size -= retired.footprint;
        Some(retired)
    }

    // == Purge Expired ==
    /// Releases every entry past its expiry.
    pub(crate) fn purge_expired(&mut self, now: Instant) -> Vec<Retired<K>> {
        let expired: Vec<usize> = self
            .list
            .slots(&self.pool)
            .into_iter()
            .filter(|&slot| self.pool.get(slot).is_some_and(|node| node.is_expired(now)))
            .collect();

        expired
            .into_iter()
            .filter_map(|slot| self.remove_slot(slot))
            .collect()
    }

    /// Releases every entry.
    pub(crate) fn clear(&mut self) -> Vec<Retired<K>> {
        let mut retired = Vec::with_capacity(self.list.len());
        while let Some(slot) = self.list.pop_back(&mut self.pool) {
            if let Some(r) = self.pool.release(slot) {
                retired.push(r);
            }
        }
        self.list.clear();
        self.size = 0;
        retired
    }

    fn footprint(&self, slot: usize) -> u64 {
        self.pool.get(slot).map(|node| node.footprint()).unwrap_or(0)
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn capacity(&self) -> u64 {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.pool.len()
    }

    pub(crate) fn state(&self) -> CacheState {
        CacheState::classify(self.len(), self.size, self.capacity)
    }

    pub(crate) fn expiration(&self) -> ExpirationPolicy {
        self.expiration
    }

    pub(crate) fn allocated(&self) -> usize {
        self.pool.allocated()
    }

    #[cfg(test)]
    pub(crate) fn debug_validate_invariants(&self) {
        self.list.debug_validate_invariants(&self.pool);
        let total: u64 = self
            .list
            .slots(&self.pool)
            .into_iter()
            .map(|slot| self.footprint(slot))
            .sum();
        assert_eq!(total, self.size, "footprint out of sync");
        assert!(self.size <= self.capacity, "size above capacity");
    }
}
