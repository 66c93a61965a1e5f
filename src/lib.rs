//! byte_lru - A bounded in-process byte cache
//!
//! Provides least-recently-used eviction by value footprint, optional
//! per-entry TTL with lazy expiration, and a sharded key index for
//! concurrent access.

pub mod cache;
pub mod config;
pub mod error;
#[cfg(feature = "janitor")]
pub mod tasks;

pub use cache::{CacheState, CacheStats, LruCache, LruStore};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
#[cfg(feature = "janitor")]
pub use tasks::spawn_cleanup_task;
