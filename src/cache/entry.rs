//! Cache Entry Module
//!
//! Defines the list node that holds one cache entry, its expiration metadata
//! and the handle used to address it.

use std::time::{Duration, Instant};

// == Node Handle ==
/// Stable handle to a node in the pool.
///
/// The generation changes every time the slot is released, so a handle kept
/// past its node's lifetime never resolves to a recycled node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) slot: usize,
    pub(crate) generation: u64,
}

impl NodeId {
    /// Returns the arena slot this handle points at.
    pub fn slot(self) -> usize {
        self.slot
    }
}

// == Node ==
/// A single cache entry, linked into the recency list by slot index.
#[derive(Debug)]
pub(crate) struct Node<K> {
    /// None while the node sits on the freelist
    pub(crate) key: Option<K>,
    pub(crate) value: Vec<u8>,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
    /// Refreshed on every write and successful read
    pub(crate) last_access: Instant,
    /// None = never expires
    pub(crate) ttl: Option<Duration>,
    pub(crate) generation: u64,
}

impl<K> Node<K> {
    pub(crate) fn new(key: K, value: Vec<u8>, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            key: Some(key),
            value,
            prev: None,
            next: None,
            last_access: now,
            ttl,
            generation: 0,
        }
    }

    /// Bytes this node counts against capacity.
    pub(crate) fn footprint(&self) -> u64 {
        self.value.capacity() as u64
    }

    pub(crate) fn is_live(&self) -> bool {
        self.key.is_some()
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_access = now;
    }

    // == Expires At ==
    /// Absolute instant after which the entry is invalid.
    ///
    /// Returns None for durable entries and for ttls too large to represent.
    pub(crate) fn expires_at(&self) -> Option<Instant> {
        self.ttl.and_then(|ttl| self.last_access.checked_add(ttl))
    }

    // == Is Expired ==
    /// An entry is expired once `now` is strictly past its expiry instant.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at() {
            Some(expires) => now > expires,
            None => false,
        }
    }

    /// Remaining lifetime at `now`; `Some(ZERO)` once expired, None if durable.
    pub(crate) fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at()
            .map(|expires| expires.saturating_duration_since(now))
    }
}
