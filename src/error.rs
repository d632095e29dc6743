//! Error types for the resilience layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Store Error Enum ==
/// Failures reported by a durable store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store has no room left for the write
    #[error("Quota exceeded: needed {needed} characters, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    /// The store cannot be reached at all
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Backing file could not be read or written
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file contents could not be encoded
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Cache Error Enum ==
/// Errors surfaced by cache key construction and store setup.
///
/// Reads and writes through the engine never return these; the cache is
/// advisory and hides its own failures.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A filter object could not be turned into a cache key
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Underlying store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::InvalidKey(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the resilience layer.
pub type Result<T> = std::result::Result<T, CacheError>;
