//! Connectivity Signal
//!
//! Tracks the host's online flag and lets tasks wait, with a deadline, for it
//! to come back.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Shared handle to the host's connectivity flag.
///
/// The host reports changes with [`set_online`](Self::set_online); clones
/// observe the same flag.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity {
    // == Constructor ==
    /// Creates a flag starting at `online`.
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    // == Is Online ==
    /// Current connectivity flag.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    // == Set Online ==
    /// Records a connectivity change. Waiters are woken only when the flag
    /// actually flips.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            info!("Connectivity changed: online={}", online);
        }
    }

    // == Subscribe ==
    /// A receiver for observers that want every change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    // == Wait For Connection ==
    /// Waits until the host is online or `timeout` elapses.
    ///
    /// Resolves immediately with `true` when already online. Otherwise the
    /// first of "went online" (`true`) and the deadline (`false`) wins.
    pub async fn wait_for_connection(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        if *rx.borrow_and_update() {
            return true;
        }

        debug!("Offline, waiting up to {:?} for connectivity", timeout);
        tokio::select! {
            res = rx.wait_for(|online| *online) => res.is_ok(),
            _ = tokio::time::sleep(timeout) => {
                warn!("No connectivity after {:?}", timeout);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_flag_tracks_updates() {
        let connectivity = Connectivity::new(false);
        assert!(!connectivity.is_online());

        connectivity.set_online(true);
        assert!(connectivity.is_online());

        let clone = connectivity.clone();
        clone.set_online(false);
        assert!(!connectivity.is_online());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_immediately_when_online() {
        let connectivity = Connectivity::default();
        let start = Instant::now();

        assert!(connectivity.wait_for_connection(Duration::from_secs(5)).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_resolves_when_online_event_fires() {
        let connectivity = Connectivity::new(false);
        let host = connectivity.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2000)).await;
            host.set_online(true);
        });

        let start = Instant::now();
        assert!(connectivity.wait_for_connection(Duration::from_millis(5000)).await);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed < Duration::from_millis(2100), "waited {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_without_event() {
        let connectivity = Connectivity::new(false);

        let start = Instant::now();
        assert!(!connectivity.wait_for_connection(Duration::from_millis(5000)).await);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5000));
        assert!(elapsed < Duration::from_millis(5100), "waited {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ignores_repeated_offline_reports() {
        let connectivity = Connectivity::new(false);
        let host = connectivity.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            host.set_online(false);
        });

        assert!(!connectivity.wait_for_connection(Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let connectivity = Connectivity::new(true);
        let mut rx = connectivity.subscribe();

        connectivity.set_online(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());
    }
}
