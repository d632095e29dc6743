//! Retry With Backoff
//!
//! Re-runs a failing async operation with pure exponential backoff.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// How many times to attempt an operation and how long to wait in between.
///
/// The delay after attempt `n` (starting at 0) is `base_delay * 2^n`. No
/// jitter is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    // == Constructor ==
    /// Creates a policy making `max_retries` attempts in total.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    // == Delay For ==
    /// Delay slept after the failed attempt with index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    // == Retry ==
    /// Runs `operation` until it succeeds or the attempts run out.
    ///
    /// The error from the final attempt is returned as-is. A policy with
    /// `max_retries == 0` still makes one attempt.
    pub async fn retry<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Debug,
    {
        let attempts = self.max_retries.max(1);
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(value);
                }
                Err(e) if attempt + 1 >= attempts => {
                    warn!("Giving up after {} attempts: {:?}", attempts, e);
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "Attempt {}/{} failed, retrying in {:?}: {:?}",
                        attempt + 1,
                        attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

// == Retry With Backoff ==
/// Runs `operation` up to `max_retries` times with exponential backoff
/// starting at `base_delay`.
pub async fn retry_with_backoff<T, E, F, Fut>(
    operation: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Debug,
{
    RetryPolicy::new(max_retries, base_delay)
        .retry(operation)
        .await
}
