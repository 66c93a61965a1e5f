//! Error types for the cache
//!
//! Cache operations never fail; the only errors are configuration mistakes
//! rejected when a cache is constructed.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Capacity is negative or not a number
    #[error("Invalid capacity: {0}")]
    InvalidCapacity(String),

    /// Any other configuration value is out of range or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
