//! Configuration Module
//!
//! Handles loading cache and retry settings from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::{CacheConfig, DEFAULT_PREFIX, DEFAULT_TTL, MAX_CACHE_SIZE};
use crate::network::RetryPolicy;

/// Resilience layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace prefix for every key the cache writes
    pub prefix: String,
    /// Default TTL in milliseconds for entries without explicit TTL
    pub default_ttl_ms: u64,
    /// Capacity limit in characters (UTF-16 code units of key + value)
    pub max_cache_size: usize,
    /// Total attempts made by the retry wrapper
    pub retry_max_attempts: u32,
    /// Delay before the second attempt, doubled for each one after
    pub retry_base_delay_ms: u64,
    /// How long callers wait for connectivity by default
    pub connection_timeout_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PREFIX` - Key namespace prefix (default: `app_cache_`)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in ms (default: 300000)
    /// - `CACHE_MAX_SIZE` - Capacity in characters (default: 52428800)
    /// - `RETRY_MAX_ATTEMPTS` - Retry attempts (default: 3)
    /// - `RETRY_BASE_DELAY_MS` - Base backoff delay in ms (default: 1000)
    /// - `CONNECTION_TIMEOUT_MS` - Connectivity wait in ms (default: 5000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            prefix: env::var("CACHE_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.prefix),
            default_ttl_ms: parse_var("CACHE_DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            max_cache_size: parse_var("CACHE_MAX_SIZE").unwrap_or(defaults.max_cache_size),
            retry_max_attempts: parse_var("RETRY_MAX_ATTEMPTS")
                .unwrap_or(defaults.retry_max_attempts),
            retry_base_delay_ms: parse_var("RETRY_BASE_DELAY_MS")
                .unwrap_or(defaults.retry_base_delay_ms),
            connection_timeout_ms: parse_var("CONNECTION_TIMEOUT_MS")
                .unwrap_or(defaults.connection_timeout_ms),
        }
    }

    /// Engine settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            prefix: self.prefix.clone(),
            default_ttl: Duration::from_millis(self.default_ttl_ms),
            max_size: self.max_cache_size,
        }
    }

    /// Backoff settings derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    /// Default deadline for [`Connectivity::wait_for_connection`](crate::network::Connectivity::wait_for_connection).
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            default_ttl_ms: DEFAULT_TTL.as_millis() as u64,
            max_cache_size: MAX_CACHE_SIZE,
            retry_max_attempts: 3,
            retry_base_delay_ms: 1000,
            connection_timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.prefix, "app_cache_");
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.max_cache_size, 50 * 1024 * 1024);
        assert_eq!(config.retry_max_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 1000);
        assert_eq!(config.connection_timeout_ms, 5000);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_PREFIX");
        env::remove_var("CACHE_DEFAULT_TTL_MS");
        env::remove_var("CACHE_MAX_SIZE");
        env::remove_var("RETRY_MAX_ATTEMPTS");
        env::remove_var("RETRY_BASE_DELAY_MS");
        env::remove_var("CONNECTION_TIMEOUT_MS");

        let config = Config::from_env();
        assert_eq!(config.prefix, "app_cache_");
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.retry_max_attempts, 3);
        assert_eq!(config.connection_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_derived_settings() {
        let config = Config {
            prefix: "t_".to_string(),
            default_ttl_ms: 1500,
            max_cache_size: 400,
            retry_max_attempts: 5,
            retry_base_delay_ms: 20,
            connection_timeout_ms: 100,
        };

        let cache = config.cache_config();
        assert_eq!(cache.prefix, "t_");
        assert_eq!(cache.default_ttl, Duration::from_millis(1500));
        assert_eq!(cache.max_size, 400);

        let retry = config.retry_policy();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.base_delay, Duration::from_millis(20));
    }
}
