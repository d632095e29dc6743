//! Cache Module
//!
//! Provides a durable TTL cache with size-bounded eviction over an injected
//! key-value text store.

mod durable;
mod engine;
mod entry;
mod stats;


use std::time::Duration;

// Re-export public types
pub use durable::{char_len, DurableStore, FileStore, MemoryStore};
pub use engine::{CacheConfig, CacheEngine, CacheOptions};
pub use entry::{current_timestamp_ms, CacheEntry, Clock, ManualClock, SystemClock};
pub use stats::CacheStats;

// == Public Constants ==
/// Namespace prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "app_cache_";

/// Lifetime of entries written without an explicit TTL
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Capacity in characters (UTF-16 code units of key + value)
pub const MAX_CACHE_SIZE: usize = 50 * 1024 * 1024;
