//! Capacity & Expiration Policy
//!
//! Footprint-driven eviction from the list tail and ttl resolution for
//! lazily expiring entries.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cache::list::RecencyList;
use crate::cache::pool::{NodePool, Retired};

// == Expiration Policy ==
/// Decides which ttl a write ends up with.
///
/// A zero duration, at the call site or as the default, means the entry never
/// expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirationPolicy {
    default_ttl: Option<Duration>,
}

impl ExpirationPolicy {
    /// Entries live until evicted or deleted unless a write supplies a ttl.
    pub fn durable() -> Self {
        Self { default_ttl: None }
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            default_ttl: non_zero(default_ttl),
        }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// The ttl a write should store given what the caller passed.
    pub fn effective_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        match ttl {
            Some(ttl) => non_zero(ttl),
            None => self.default_ttl,
        }
    }
}

fn non_zero(ttl: Duration) -> Option<Duration> {
    (!ttl.is_zero()).then_some(ttl)
}

// == Cache State ==
/// Coarse fill level of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    /// No live entries
    Empty,
    /// Some entries, footprint below capacity
    Partial,
    /// Footprint at capacity; the next growth evicts
    Full,
}

impl CacheState {
    pub(crate) fn classify(entries: usize, size: u64, capacity: u64) -> Self {
        if entries == 0 || capacity == 0 {
            CacheState::Empty
        } else if size >= capacity {
            CacheState::Full
        } else {
            CacheState::Partial
        }
    }
}

// == Capacity Enforcement ==
/// Evicts from the tail until `size <= capacity` or the list is empty.
///
/// Every evicted node is released to the pool; the returned victims still
/// have to be removed from the key index by the caller.
pub(crate) fn evict_until_fits<K>(
    pool: &mut NodePool<K>,
    list: &mut RecencyList,
    size: &mut u64,
    capacity: u64,
) -> Vec<Retired<K>> {
    let mut evicted = Vec::new();
    while *size > capacity {
        let Some(slot) = list.pop_back(pool) else {
            break;
        };
        if let Some(retired) = pool.release(slot) {
            *size -= retired.footprint;
            evicted.push(retired);
        }
    }

    if !evicted.is_empty() {
        debug!(
            evicted = evicted.len(),
            size = *size,
            capacity,
            "evicted least recently used entries"
        );
    }
    evicted
}
