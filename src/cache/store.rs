//! Cache Store Module
//!
//! Single-threaded cache: a plain `HashMap` index in front of the engine.
//! Every operation takes `&mut self`; wrap it in a mutex to share it, which
//! serializes all callers behind one coarse lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::cache::engine::{Engine, Lookup, Written};
use crate::cache::entry::NodeId;
use crate::cache::policy::{CacheState, ExpirationPolicy};
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::config::CacheConfig;
use crate::error::Result;

// == Cache Store ==
/// Byte cache with LRU eviction and optional ttl, for single-owner use.
#[derive(Debug)]
pub struct LruStore<K = String> {
    index: HashMap<K, NodeId>,
    engine: Engine<K>,
    stats: StatsRecorder,
}

impl<K> LruStore<K>
where
    K: Hash + Eq + Clone,
{
    // == Constructors ==
    /// Creates a store holding at most `capacity` bytes of values, without
    /// a default ttl.
    pub fn new(capacity: u64) -> Self {
        Self::with_policy(capacity, ExpirationPolicy::durable())
    }

    /// Creates a store whose writes without an explicit ttl expire after
    /// `default_ttl`. A zero `default_ttl` disables expiration.
    pub fn with_default_ttl(capacity: u64, default_ttl: Duration) -> Self {
        Self::with_policy(capacity, ExpirationPolicy::with_default_ttl(default_ttl))
    }

    /// Creates a store from a validated configuration; the partition count
    /// does not apply to this variant.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_default_ttl(config.capacity, config.default_ttl))
    }

    fn with_policy(capacity: u64, expiration: ExpirationPolicy) -> Self {
        Self {
            index: HashMap::new(),
            engine: Engine::new(capacity, expiration),
            stats: StatsRecorder::default(),
        }
    }

    // == Set ==
    /// Stores `value` under `key` using the default ttl.
    ///
    /// An existing key is updated in place and promoted. Least recently used
    /// entries are evicted until the footprint fits; with zero capacity this
    /// is a no-op.
    pub fn set(&mut self, key: K, value: Vec<u8>) {
        self.write(key, value, None);
    }

    /// Stores `value` under `key`, expiring `ttl` after its last access.
    /// A zero `ttl` makes the entry durable.
    pub fn set_with_ttl(&mut self, key: K, value: Vec<u8>, ttl: Duration) {
        self.write(key, value, Some(ttl));
    }

    fn write(&mut self, key: K, value: Vec<u8>, ttl: Option<Duration>) {
        if self.engine.capacity() == 0 {
            return;
        }
        let now = Instant::now();

        let written = match self.index.get(&key).copied() {
            Some(id) => match self.engine.replace(id, value, ttl, now) {
                Ok(written) => written,
                // Unreachable while index and list agree; recover by reinserting
                Err(value) => self.engine.insert(key.clone(), value, ttl, now),
            },
            None => self.engine.insert(key.clone(), value, ttl, now),
        };
        self.apply(key, written);
    }

    fn apply(&mut self, key: K, written: Written<K>) {
        self.stats.record_evictions(written.evicted.len());
        for retired in &written.evicted {
            if self.index.get(&retired.key) == Some(&retired.id) {
                self.index.remove(&retired.key);
            }
        }
        if written.retained {
            self.index.insert(key, written.id);
        } else {
            self.index.remove(&key);
        }
    }

    // == Get ==
    /// Returns the value for `key`, promoting it to most recently used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&[u8]>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(id) = self.index.get(key).copied() else {
            self.stats.record_miss();
            return None;
        };

        match self.engine.lookup(id, Instant::now()) {
            Lookup::Hit(slot) => {
                self.stats.record_hit();
                Some(self.engine.value(slot))
            }
            Lookup::Expired(_) => {
                trace!("expired entry purged on get");
                self.index.remove(key);
                self.stats.record_expirations(1);
                self.stats.record_miss();
                None
            }
            Lookup::Stale => {
                self.index.remove(key);
                self.stats.record_miss();
                None
            }
        }
    }

    /// Remaining ttl for `key` without promoting it.
    ///
    /// None when the key is absent, expired or durable.
    pub fn ttl_remaining<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.index.get(key)?;
        self.engine.ttl_remaining(*id, Instant::now())
    }

    // == Delete ==
    /// Removes `key`. Returns false, changing nothing, if it was absent.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.remove(key) {
            Some(id) => self.engine.remove(id).is_some(),
            None => false,
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&mut self) -> usize {
        let purged = self.engine.purge_expired(Instant::now());
        for retired in &purged {
            self.index.remove(&retired.key);
        }
        self.stats.record_expirations(purged.len());
        purged.len()
    }

    /// Removes every entry, keeping the released nodes for reuse.
    pub fn clear(&mut self) {
        self.engine.clear();
        self.index.clear();
    }

    // == Size ==
    /// Aggregate value footprint in bytes.
    pub fn size(&self) -> u64 {
        self.engine.size()
    }

    pub fn capacity(&self) -> u64 {
        self.engine.capacity()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.engine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> CacheState {
        self.engine.state()
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.engine.expiration().default_ttl()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.len(), self.size())
    }

    #[cfg(test)]
    pub(crate) fn debug_validate_invariants(&self) {
        self.engine.debug_validate_invariants();
        assert_eq!(self.index.len(), self.engine.len(), "index and list disagree");
        for id in self.index.values() {
            assert!(self.engine.is_live(*id), "index holds a dead handle");
        }
    }

    #[cfg(test)]
    pub(crate) fn allocated_nodes(&self) -> usize {
        self.engine.allocated()
    }
}
