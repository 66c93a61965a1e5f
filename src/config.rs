//! Configuration Module
//!
//! Handles loading and validating cache configuration, either programmatically
//! or from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_PARTITIONS;
use crate::error::{CacheError, Result};

/// Default capacity in bytes (64 MiB).
pub const DEFAULT_CAPACITY: u64 = 64 * 1024 * 1024;

/// Default interval between background sweeps.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum aggregate value footprint in bytes
    pub capacity: u64,
    /// TTL applied when a write does not carry one; zero keeps entries until evicted
    pub default_ttl: Duration,
    /// Number of independently locked key index partitions
    pub partition_count: usize,
    /// Interval between background sweeps of expired entries
    pub cleanup_interval: Duration,
}

impl CacheConfig {
    /// Creates a configuration with the given capacity and defaults elsewhere.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LRU_CAPACITY` - Capacity in bytes (default: 64 MiB)
    /// - `LRU_DEFAULT_TTL_MS` - Default TTL in milliseconds, 0 disables expiration (default: 0)
    /// - `LRU_PARTITIONS` - Key index partition count (default: 64)
    /// - `LRU_CLEANUP_INTERVAL_MS` - Sweep interval in milliseconds (default: 1000)
    ///
    /// Unset variables fall back to their defaults. A set but malformed value
    /// is an error rather than being silently replaced.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`CacheConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let capacity = match lookup("LRU_CAPACITY") {
            Some(raw) => parse_capacity(&raw)?,
            None => defaults.capacity,
        };
        let default_ttl = match lookup("LRU_DEFAULT_TTL_MS") {
            Some(raw) => Duration::from_millis(parse_number("LRU_DEFAULT_TTL_MS", &raw)?),
            None => defaults.default_ttl,
        };
        let partition_count = match lookup("LRU_PARTITIONS") {
            Some(raw) => parse_number("LRU_PARTITIONS", &raw)?,
            None => defaults.partition_count,
        };
        let cleanup_interval = match lookup("LRU_CLEANUP_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(parse_number("LRU_CLEANUP_INTERVAL_MS", &raw)?),
            None => defaults.cleanup_interval,
        };

        let config = Self {
            capacity,
            default_ttl,
            partition_count,
            cleanup_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the values a cache cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.partition_count == 0 {
            return Err(CacheError::InvalidConfig(
                "partition_count must be at least 1".to_string(),
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl: Duration::ZERO,
            partition_count: DEFAULT_PARTITIONS,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

// Parsed as signed first so a negative capacity gets its own error.
fn parse_capacity(raw: &str) -> Result<u64> {
    let value: i128 = raw
        .trim()
        .parse()
        .map_err(|_| CacheError::InvalidCapacity(format!("{raw:?} is not an integer")))?;
    if value < 0 {
        return Err(CacheError::InvalidCapacity(format!(
            "{value} is negative"
        )));
    }
    u64::try_from(value)
        .map_err(|_| CacheError::InvalidCapacity(format!("{value} does not fit in 64 bits")))
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CacheError::InvalidConfig(format!("{name}={raw:?} is not a valid number")))
}
