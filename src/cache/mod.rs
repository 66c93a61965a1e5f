//! Cache Module
//!
//! Provides a bounded in-memory byte cache with LRU eviction and TTL expiration.

mod concurrent;
mod engine;
mod entry;
mod index;
mod list;
mod policy;
mod pool;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use concurrent::LruCache;
pub use entry::NodeId;
pub use index::{partition_of, PartitionHasher};
pub use policy::{CacheState, ExpirationPolicy};
pub use stats::CacheStats;
pub use store::LruStore;

// == Public Constants ==
/// Default number of key index partitions
pub const DEFAULT_PARTITIONS: usize = 64;
