//! Concurrent Cache Module
//!
//! Thread-safe facade over the engine with a sharded key index.
//!
//! # Locking
//!
//! The recency list, pool and footprint sit behind one cache-wide mutex; the
//! key index is split into partitions, each behind its own `RwLock`.
//!
//! - `get` read-locks the key's partition just long enough to resolve the
//!   handle, then takes the engine lock to check expiry and promote.
//! - `set` and `delete` hold the key's partition write lock across the
//!   engine section, so writes to one key are totally ordered.
//! - Entries evicted from other partitions are de-indexed after the engine
//!   lock is dropped. Until then their handles no longer resolve and lookups
//!   treat them as misses.
//!
//! Partition locks are always taken before the engine lock and at most one
//! partition lock is held at a time.

use std::borrow::Borrow;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::engine::{Engine, Lookup};
use crate::cache::index::{remove_if_in, KeyIndex};
use crate::cache::policy::{CacheState, ExpirationPolicy};
use crate::cache::pool::Retired;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::cache::DEFAULT_PARTITIONS;
use crate::config::CacheConfig;
use crate::error::Result;

// == LRU Cache ==
/// Shared byte cache with LRU eviction, optional ttl and a sharded index.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use byte_lru::LruCache;
///
/// let cache: LruCache = LruCache::new(1024);
/// cache.set("greeting".to_string(), b"hello".to_vec());
/// assert_eq!(cache.get("greeting").as_deref(), Some(&b"hello"[..]));
///
/// cache.set_with_ttl("session".to_string(), b"token".to_vec(), Duration::from_secs(30));
/// assert!(cache.delete("session"));
/// assert_eq!(cache.size(), 5);
/// ```
#[derive(Debug)]
pub struct LruCache<K = String> {
    index: KeyIndex<K>,
    engine: Mutex<Engine<K>>,
    stats: StatsRecorder,
    /// Copy of the engine's capacity, readable without the lock
    capacity: u64,
}

impl<K> LruCache<K>
where
    K: Hash + Eq + Clone,
{
    // == Constructors ==
    /// Creates a cache holding at most `capacity` bytes of values, without a
    /// default ttl, using the default partition count.
    pub fn new(capacity: u64) -> Self {
        Self::build(capacity, ExpirationPolicy::durable(), DEFAULT_PARTITIONS)
    }

    /// Creates a cache whose writes without an explicit ttl expire after
    /// `default_ttl`. A zero `default_ttl` disables expiration.
    pub fn with_default_ttl(capacity: u64, default_ttl: Duration) -> Self {
        Self::build(
            capacity,
            ExpirationPolicy::with_default_ttl(default_ttl),
            DEFAULT_PARTITIONS,
        )
    }

    /// Creates a cache from a configuration, rejecting invalid values.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(
            config.capacity,
            ExpirationPolicy::with_default_ttl(config.default_ttl),
            config.partition_count,
        ))
    }

    fn build(capacity: u64, expiration: ExpirationPolicy, partitions: usize) -> Self {
        debug!(capacity, partitions, "creating cache");
        Self {
            index: KeyIndex::new(partitions),
            engine: Mutex::new(Engine::new(capacity, expiration)),
            stats: StatsRecorder::default(),
            capacity,
        }
    }

    // == Set ==
    /// Stores `value` under `key` using the default ttl.
    ///
    /// An existing key is updated in place and promoted. Least recently used
    /// entries are evicted until the footprint fits; with zero capacity this
    /// is a no-op.
    pub fn set(&self, key: K, value: Vec<u8>) {
        self.write(key, value, None);
    }

    /// Stores `value` under `key`, expiring `ttl` after its last access.
    /// A zero `ttl` makes the entry durable.
    pub fn set_with_ttl(&self, key: K, value: Vec<u8>, ttl: Duration) {
        self.write(key, value, Some(ttl));
    }

    fn write(&self, key: K, value: Vec<u8>, ttl: Option<Duration>) {
        if self.capacity == 0 {
            return;
        }
        let now = Instant::now();
        let home = self.index.partition_for(&key);
        let mut partition = self.index.write(home);
        let existing = partition.get(&key).copied();

        let written = {
            let mut engine = self.engine.lock();
            let replaced = match existing {
                Some(id) => engine.replace(id, value, ttl, now),
                None => Err(value),
            };
            match replaced {
                Ok(written) => written,
                Err(value) => engine.insert(key.clone(), value, ttl, now),
            }
        };

        self.stats.record_evictions(written.evicted.len());
        let mut elsewhere = Vec::new();
        for retired in written.evicted {
            if self.index.partition_for(&retired.key) == home {
                remove_if_in(&mut *partition, &retired.key, retired.id);
            } else {
                elsewhere.push(retired);
            }
        }
        // No live node can exist for `key` unless this write kept one
        if written.retained {
            partition.insert(key, written.id);
        } else {
            partition.remove(&key);
        }
        drop(partition);

        self.deindex(elsewhere);
    }

    fn deindex(&self, retired: Vec<Retired<K>>) {
        for r in retired {
            self.index.remove_if(&r.key, r.id);
        }
    }

    // == Get ==
    /// Returns a copy of the value for `key`, promoting it to most recently
    /// used.
    ///
    /// Reads mutate recency order and refresh the entry's expiry. An expired
    /// entry is removed and reported as a miss.
    pub fn get<Q>(&self, key: &Q) -> Option<Vec<u8>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(id) = self.index.lookup(key) else {
            self.stats.record_miss();
            return None;
        };

        let lookup = {
            let mut engine = self.engine.lock();
            match engine.lookup(id, Instant::now()) {
                Lookup::Hit(slot) => Ok(engine.value(slot).to_vec()),
                Lookup::Expired(retired) => Err(Some(retired)),
                Lookup::Stale => Err(None),
            }
        };

        match lookup {
            Ok(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Err(expired) => {
                if let Some(retired) = expired {
                    trace!("expired entry purged on get");
                    self.stats.record_expirations(1);
                    self.index.remove_if(key, retired.id);
                }
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
        let id = self.index.lookup(key)?;
        self.engine.lock().ttl_remaining(id, Instant::now())
    }

    // == Delete ==
    /// Removes `key`. Returns false, changing nothing, if it was absent.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut partition = self.index.write(self.index.partition_for(key));
        match partition.remove(key) {
            Some(id) => self.engine.lock().remove(id).is_some(),
            None => false,
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let purged = self.engine.lock().purge_expired(Instant::now());
        let count = purged.len();
        self.stats.record_expirations(count);
        self.deindex(purged);
        count
    }

    /// Removes every entry, keeping the released nodes for reuse.
    ///
    /// Works one partition at a time; entries written concurrently into an
    /// already cleared partition survive.
    pub fn clear(&self) {
        for p in 0..self.index.partition_count() {
            let mut partition = self.index.write(p);
            let mut engine = self.engine.lock();
            for (_, id) in partition.drain() {
                engine.remove(id);
            }
        }
    }

    // == Size ==
    /// Aggregate value footprint in bytes.
    pub fn size(&self) -> u64 {
        self.engine.lock().size()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.engine.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> CacheState {
        self.engine.lock().state()
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.engine.lock().expiration().default_ttl()
    }

    pub fn partition_count(&self) -> usize {
        self.index.partition_count()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let engine = self.engine.lock();
        self.stats.snapshot(engine.len(), engine.size())
    }

    /// Checks list, footprint and index agreement. Call only while no other
    /// thread is using the cache.
    #[cfg(test)]
    pub(crate) fn debug_validate_invariants(&self) {
        let ids: Vec<_> = (0..self.index.partition_count())
            .flat_map(|p| self.index.read(p).values().copied().collect::<Vec<_>>())
            .collect();
        let engine = self.engine.lock();
        engine.debug_validate_invariants();
        assert_eq!(ids.len(), engine.len(), "index and list disagree");
        for id in ids {
            assert!(engine.is_live(id), "index holds a dead handle");
        }
    }
}
