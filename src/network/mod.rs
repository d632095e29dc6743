//! Network Resilience Module
//!
//! Connectivity probing, bounded waits for connectivity, and exponential
//! backoff retries for caller-supplied requests.

mod connectivity;
mod retry;

pub use connectivity::Connectivity;
pub use retry::{retry_with_backoff, RetryPolicy};
