//! Cache Engine Module
//!
//! TTL cache over a shared durable store, with capacity enforcement and
//! corruption tolerance. The engine is advisory: it hides its own failures
//! and never becomes a source of truth.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::durable::{char_len, DurableStore};
use crate::cache::entry::{CacheEntry, Clock, RawEntry, SystemClock};
use crate::cache::{CacheStats, DEFAULT_PREFIX, DEFAULT_TTL, MAX_CACHE_SIZE};

// == Cache Config ==
/// Engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Prepended to every logical key; the engine owns this namespace
    pub prefix: String,
    /// Lifetime used when a write does not specify one
    pub default_ttl: Duration,
    /// Capacity in characters (UTF-16 code units of key + value)
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            default_ttl: DEFAULT_TTL,
            max_size: MAX_CACHE_SIZE,
        }
    }
}

// == Cache Options ==
/// Per-write options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Overrides the engine's default TTL
    pub ttl: Option<Duration>,
}

impl CacheOptions {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }
}

/// A namespaced entry considered by the capacity policy.
struct SizedEntry {
    key: String,
    timestamp: i64,
    size: usize,
}

// == Cache Engine ==
/// TTL key-value cache over an injected [`DurableStore`].
pub struct CacheEngine {
    /// Shared backing store
    store: Arc<dyn DurableStore>,
    /// Time source for stamping and expiry
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    stats: Mutex<CacheStats>,
}

impl fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEngine")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl CacheEngine {
    // == Constructors ==
    /// Creates an engine over `store` using wall clock time.
    pub fn new(store: Arc<dyn DurableStore>, config: CacheConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Creates an engine with an explicit time source.
    pub fn with_clock(
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            stats: Mutex::new(CacheStats::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    fn stats_mut(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Set ==
    /// Stores `data` under `key`.
    ///
    /// A rejected write triggers one expired-entry sweep and a single retry.
    /// If the retry is also rejected the write is dropped; nothing is
    /// reported to the caller.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, options: CacheOptions) {
        let full_key = self.namespaced(key);
        let ttl = options.ttl.unwrap_or(self.config.default_ttl);
        let entry = CacheEntry::new(data, self.clock.now_ms(), ttl);

        let value = match serde_json::to_string(&entry) {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache write for {} skipped, value not serializable: {}", key, e);
                self.stats_mut().record_dropped_write();
                return;
            }
        };

        if let Err(e) = self.store.set_item(&full_key, &value) {
            warn!("Cache write for {} failed, sweeping expired entries: {}", key, e);
            self.cleanup_expired();

            if let Err(e) = self.store.set_item(&full_key, &value) {
                warn!("Cache write for {} dropped after retry: {}", key, e);
                self.stats_mut().record_dropped_write();
                return;
            }
        }

        self.enforce_size_limit(&full_key);
    }

    // == Get ==
    /// Returns the live value stored under `key`.
    ///
    /// Expired entries, unparsable entries and entries whose payload does not
    /// decode as `T` are removed and reported as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.namespaced(key);
        let Some(raw) = self.store.get_item(&full_key) else {
            debug!("Cache miss: {}", key);
            self.stats_mut().record_miss();
            return None;
        };

        match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) if entry.is_live(self.clock.now_ms()) => {
                debug!("Cache hit: {}", key);
                self.stats_mut().record_hit();
                Some(entry.data)
            }
            Ok(_) => {
                self.purge(&full_key, "expired");
                self.stats_mut().record_miss();
                None
            }
            Err(_) => {
                self.purge(&full_key, "unparsable");
                self.stats_mut().record_miss();
                None
            }
        }
    }

    // == Has ==
    /// Returns true if a live entry exists under `key`.
    ///
    /// Dead entries found here are removed, exactly as [`get`](Self::get) does.
    pub fn has(&self, key: &str) -> bool {
        let full_key = self.namespaced(key);
        let Some(raw) = self.store.get_item(&full_key) else {
            return false;
        };

        match serde_json::from_str::<RawEntry>(&raw) {
            Ok(entry) if entry.is_live(self.clock.now_ms()) => true,
            Ok(_) => {
                self.purge(&full_key, "expired");
                false
            }
            Err(_) => {
                self.purge(&full_key, "unparsable");
                false
            }
        }
    }

    fn purge(&self, full_key: &str, reason: &str) {
        debug!("Purging {} cache entry {}", reason, full_key);
        self.store.remove_item(full_key);
        self.stats_mut().record_purge();
    }

    // == Delete ==
    /// Removes `key`. Deleting a missing key is a no-op.
    pub fn delete(&self, key: &str) {
        self.store.remove_item(&self.namespaced(key));
    }

    // == Clear ==
    /// Removes every entry under the namespace and nothing else.
    ///
    /// Returns the number of keys removed.
    pub fn clear(&self) -> usize {
        let keys = self.namespaced_keys();
        for key in &keys {
            self.store.remove_item(key);
        }
        info!("Cache cleared: removed {} entries", keys.len());
        keys.len()
    }

    /// All store keys under the namespace, collected before any mutation.
    fn namespaced_keys(&self) -> Vec<String> {
        self.store
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(&self.config.prefix))
            .collect()
    }

    // == Cleanup Expired ==
    /// Removes all dead entries (expired or unparsable) under the namespace.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        for key in self.namespaced_keys() {
            let live = self
                .store
                .get_item(&key)
                .and_then(|raw| serde_json::from_str::<RawEntry>(&raw).ok())
                .is_some_and(|entry| entry.is_live(now));

            if !live {
                self.store.remove_item(&key);
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Expired sweep: removed {} dead entries", removed);
            self.stats_mut().purged += removed as u64;
        } else {
            debug!("Expired sweep: no dead entries found");
        }
        removed
    }

    // == Size ==
    /// Occupied size of the namespace in characters.
    pub fn size(&self) -> usize {
        self.namespaced_keys()
            .iter()
            .map(|key| {
                let value = self.store.get_item(key).unwrap_or_default();
                char_len(key) + char_len(&value)
            })
            .sum()
    }

    /// Number of entries under the namespace, dead or alive.
    pub fn len(&self) -> usize {
        self.namespaced_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Enforce Size Limit ==
    /// Evicts the oldest entries once the namespace outgrows `max_size`,
    /// freeing down to 80% of the limit.
    ///
    /// Age is write time, not read time. `just_written` sorts after entries
    /// with the same timestamp so it is only evicted when nothing else is left.
    /// Returns the number of entries evicted.
    fn enforce_size_limit(&self, just_written: &str) -> usize {
        // Size and age come from the same read, so the totals always agree
        let mut current = 0;
        let mut entries = Vec::new();
        let mut corrupt = Vec::new();
        for key in self.namespaced_keys() {
            let Some(raw) = self.store.get_item(&key) else {
                continue;
            };
            let size = char_len(&key) + char_len(&raw);
            current += size;

            match serde_json::from_str::<RawEntry>(&raw) {
                Ok(entry) => entries.push(SizedEntry {
                    key,
                    timestamp: entry.timestamp,
                    size,
                }),
                Err(_) => corrupt.push((key, size)),
            }
        }

        if current <= self.config.max_size {
            return 0;
        }

        for (key, size) in corrupt {
            self.store.remove_item(&key);
            self.stats_mut().record_purge();
            current = current.saturating_sub(size);
        }

        entries.sort_by_key(|entry| (entry.timestamp, entry.key == just_written));

        let target = (self.config.max_size as u128 * 4 / 5) as usize;
        let mut evicted = 0;
        let mut freed = 0;
        for entry in entries {
            if current <= target {
                break;
            }
            self.store.remove_item(&entry.key);
            current = current.saturating_sub(entry.size);
            freed += entry.size;
            evicted += 1;
        }

        if evicted > 0 {
            info!(
                "Capacity eviction: removed {} entries, freed {} characters",
                evicted, freed
            );
            self.stats_mut().record_evictions(evicted);
        }
        evicted
    }

    // == Stats ==
    /// Returns a snapshot of engine statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats_mut().clone();
        stats.total_entries = self.len();
        stats.total_size = self.size();
        stats
    }
}
