//! Cache Entry Module
//!
//! Defines the persisted envelope for cache entries and the clocks used to
//! stamp and expire them.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single cache entry as written to the durable store.
///
/// Serialized as `{"data":…,"timestamp":…,"ttl":…}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,
    /// Write time (Unix milliseconds)
    pub timestamp: i64,
    /// Lifetime in milliseconds
    pub ttl: i64,
}

/// Entry header used when the payload type is unknown (sizing, sweeps).
pub(crate) type RawEntry = CacheEntry<IgnoredAny>;

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry stamped at `now` that lives for `ttl`.
    pub fn new(data: T, now: i64, ttl: Duration) -> Self {
        Self {
            data,
            timestamp: now,
            ttl: duration_to_ms(ttl),
        }
    }

    // == Is Live ==
    /// An entry is live while `now - timestamp <= ttl`.
    ///
    /// Boundary condition: an entry read exactly `ttl` milliseconds after it
    /// was written is still live; one millisecond later it is dead.
    pub fn is_live(&self, now: i64) -> bool {
        now.saturating_sub(self.timestamp) <= self.ttl
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, `0` once dead.
    pub fn ttl_remaining_ms(&self, now: i64) -> u64 {
        let remaining = self
            .timestamp
            .saturating_add(self.ttl)
            .saturating_sub(now);
        remaining.max(0) as u64
    }
}

pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

// == Clock ==
/// Source of "now" for stamping and expiring entries.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time in Unix milliseconds.
    fn now_ms(&self) -> i64;
}

/// Wall clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        current_timestamp_ms()
    }
}

/// A clock that only moves when told to. Used for virtual-time tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(duration_to_ms(by), Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
