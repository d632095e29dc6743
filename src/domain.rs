//! Domain Cache Wrappers
//!
//! Fixed-TTL, namespaced views over the shared cache engine for weather
//! snapshots, weather forecasts and feed listings.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cache::{CacheEngine, CacheOptions};
use crate::error::Result;

// == Domain TTLs ==
pub const WEATHER_TTL: Duration = Duration::from_secs(30 * 60);
pub const FORECAST_TTL: Duration = Duration::from_secs(2 * 60 * 60);
pub const FEED_TTL: Duration = Duration::from_secs(10 * 60);

// == Stable Serialize ==
/// Serializes `filter` to JSON with object fields sorted at every depth, so
/// equal filters always produce the same text.
pub fn stable_serialize<F: Serialize + ?Sized>(filter: &F) -> Result<String> {
    let value = serde_json::to_value(filter)?;
    Ok(canonicalize(value).to_string())
}

/// Rebuilds `value` with every object's fields in key order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(String, Value)> = map.into_iter().collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

// == District Cache ==
/// Per-district cache with a fixed key prefix and TTL.
#[derive(Debug, Clone)]
pub struct DistrictCache {
    engine: Arc<CacheEngine>,
    key_prefix: &'static str,
    ttl: Duration,
}

impl DistrictCache {
    // == Constructors ==
    /// Current conditions: `weather_<district>`, 30 minutes.
    pub fn weather(engine: Arc<CacheEngine>) -> Self {
        Self {
            engine,
            key_prefix: "weather_",
            ttl: WEATHER_TTL,
        }
    }

    /// Multi-day forecast: `forecast_<district>`, 2 hours.
    pub fn forecast(engine: Arc<CacheEngine>) -> Self {
        Self {
            engine,
            key_prefix: "forecast_",
            ttl: FORECAST_TTL,
        }
    }

    // == Keys ==
    /// Logical key for `district`, e.g. `weather_Colombo`.
    pub fn key(&self, district: &str) -> String {
        format!("{}{}", self.key_prefix, district)
    }

    /// Lifetime applied to every write.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Get ==
    /// Live cached value for `district`, if any.
    pub fn get<T: DeserializeOwned>(&self, district: &str) -> Option<T> {
        self.engine.get(&self.key(district))
    }

    // == Set ==
    /// Caches `data` for `district` with this wrapper's TTL.
    pub fn set<T: Serialize + ?Sized>(&self, district: &str, data: &T) {
        self.engine
            .set(&self.key(district), data, CacheOptions::with_ttl(self.ttl));
    }

    // == Has ==
    /// Returns true if a live entry exists for `district`.
    pub fn has(&self, district: &str) -> bool {
        self.engine.has(&self.key(district))
    }

    // == Invalidate ==
    /// Drops the entry for `district`.
    pub fn invalidate(&self, district: &str) {
        self.engine.delete(&self.key(district));
    }
}

// == Feed Cache ==
/// Feed listings keyed by their filter set.
#[derive(Debug, Clone)]
pub struct FeedCache {
    engine: Arc<CacheEngine>,
}

impl FeedCache {
    // == Constructor ==
    /// Creates a feed cache over `engine`.
    pub fn new(engine: Arc<CacheEngine>) -> Self {
        Self { engine }
    }

    // == Keys ==
    /// `posts_<stable filter JSON>`
    pub fn key<F: Serialize + ?Sized>(filter: &F) -> Result<String> {
        Ok(format!("posts_{}", stable_serialize(filter)?))
    }

    // == Get ==
    /// Live cached listing for `filter`, if any. A filter that cannot be
    /// serialized is treated as a miss.
    pub fn get<F, T>(&self, filter: &F) -> Option<T>
    where
        F: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match Self::key(filter) {
            Ok(key) => self.engine.get(&key),
            Err(e) => {
                warn!("Feed cache lookup skipped: {}", e);
                None
            }
        }
    }

    // == Set ==
    /// Caches the listing for `filter` for [`FEED_TTL`].
    pub fn set<F, T>(&self, filter: &F, data: &T)
    where
        F: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        match Self::key(filter) {
            Ok(key) => self.engine.set(&key, data, CacheOptions::with_ttl(FEED_TTL)),
            Err(e) => warn!("Feed cache write skipped: {}", e),
        }
    }

    // == Invalidate ==
    /// Drops every cached entry in the namespace, not only feed listings.
    pub fn invalidate(&self) {
        self.engine.clear();
    }
}
