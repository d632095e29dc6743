//! Cache Statistics Module
//!
//! Tracks cache engine metrics including hits, misses, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache engine metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of reads that returned a live entry
    pub hits: u64,
    /// Number of reads that found nothing usable
    pub misses: u64,
    /// Number of entries removed by the capacity policy
    pub evictions: u64,
    /// Number of dead entries (expired or corrupt) removed
    pub purged: u64,
    /// Number of writes dropped after the retry also failed
    pub dropped_writes: u64,
    /// Current number of entries under the namespace
    pub total_entries: usize,
    /// Current occupied size in characters
    pub total_size: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Evictions ==
    /// Adds `count` capacity evictions.
    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    // == Record Purge ==
    /// Increments the dead-entry counter.
    pub fn record_purge(&mut self) {
        self.purged += 1;
    }

    // == Record Dropped Write ==
    /// Increments the dropped-write counter.
    pub fn record_dropped_write(&mut self) {
        self.dropped_writes += 1;
    }
}
