//! Cache-Backed Fetch Helper
//!
//! Read-through caching over a caller-supplied async producer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheEngine, CacheOptions};

// == Fetch Options ==
/// Options for a single read-through call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// TTL for the value written on a miss, engine default when None
    pub ttl: Option<Duration>,
    /// When false the cache is bypassed entirely
    pub enabled: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            enabled: true,
        }
    }
}

impl FetchOptions {
    /// Cached options with an explicit TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            enabled: true,
        }
    }

    /// Options that skip the cache for both reads and writes.
    pub fn bypass() -> Self {
        Self {
            ttl: None,
            enabled: false,
        }
    }
}

// == Cached Fetcher ==
/// Read-through access to a shared [`CacheEngine`].
///
/// Concurrent misses on the same key are not coalesced: each caller runs its
/// own producer and the last write wins.
#[derive(Debug, Clone)]
pub struct CachedFetcher {
    engine: Arc<CacheEngine>,
}

impl CachedFetcher {
    // == Constructor ==
    /// Creates a fetcher over `engine`.
    pub fn new(engine: Arc<CacheEngine>) -> Self {
        Self { engine }
    }

    /// The engine reads and writes go through.
    pub fn engine(&self) -> &Arc<CacheEngine> {
        &self.engine
    }

    // == Fetch With Cache ==
    /// Returns the cached value for `key`, or runs `producer` and caches its
    /// result.
    ///
    /// Producer errors are returned unchanged and nothing is written.
    pub async fn fetch_with_cache<T, E, F, Fut>(
        &self,
        key: &str,
        producer: F,
        options: FetchOptions,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !options.enabled {
            debug!("Cache bypassed for {}", key);
            return producer().await;
        }

        if let Some(cached) = self.engine.get::<T>(key) {
            return Ok(cached);
        }

        let fresh = producer().await?;
        self.engine.set(key, &fresh, CacheOptions { ttl: options.ttl });
        Ok(fresh)
    }

    // == Raw Primitives ==
    /// Live value under `key`, if any.
    pub fn get_cached_data<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.engine.get(key)
    }

    /// Writes `data` under `key`; `None` uses the engine's default TTL.
    pub fn set_cached_data<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        self.engine.set(key, data, CacheOptions { ttl });
    }

    /// Removes one entry, or the whole namespace when `key` is None.
    pub fn clear_cache(&self, key: Option<&str>) {
        match key {
            Some(key) => self.engine.delete(key),
            None => {
                self.engine.clear();
            }
        }
    }

    /// Returns true if a live entry exists under `key`.
    pub fn has_cache(&self, key: &str) -> bool {
        self.engine.has(key)
    }
}
