//! Resilience Cache - A durable TTL cache with network resilience helpers
//!
//! Provides a size-bounded, time-to-live cache over a shared key-value text
//! store, read-through fetching, and retry/backoff and connectivity-wait
//! utilities for flaky networks.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod network;

pub use cache::{CacheConfig, CacheEngine, CacheOptions, DurableStore, FileStore, MemoryStore};
pub use config::Config;
pub use domain::{stable_serialize, DistrictCache, FeedCache};
pub use error::{CacheError, Result, StoreError};
pub use fetch::{CachedFetcher, FetchOptions};
pub use network::{retry_with_backoff, Connectivity, RetryPolicy};
