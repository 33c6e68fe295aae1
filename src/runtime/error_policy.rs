//! # Error Policy
//!
//! Classification and backoff for watch stream errors. Reconcile errors are
//! retried by the scheduler; this module only keeps the watchers alive.

use crate::constants;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{error, warn};

/// Broad class of a watch stream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorClass {
    /// 401, RBAC revoked or token expired
    Unauthorized,
    /// 410, resource version too old
    Expired,
    /// 429, API server storage reinitializing
    Throttled,
    /// CRD missing or object already gone
    NotFound,
    Other,
}

pub fn classify_watch_error(message: &str) -> WatchErrorClass {
    if message.contains("401") || message.contains("Unauthorized") {
        WatchErrorClass::Unauthorized
    } else if message.contains("410")
        || message.contains("too old resource version")
        || message.contains("Expired")
        || message.contains("Gone")
    {
        WatchErrorClass::Expired
    } else if message.contains("429")
        || message.contains("storage is (re)initializing")
        || message.contains("TooManyRequests")
    {
        WatchErrorClass::Throttled
    } else if message.contains("ObjectNotFound")
        || (message.contains("404") && message.contains("not found"))
    {
        WatchErrorClass::NotFound
    } else {
        WatchErrorClass::Other
    }
}

/// Per-watcher backoff for throttled watch streams
#[derive(Debug)]
pub struct WatchBackoff {
    current_ms: AtomicU64,
    max_ms: u64,
}

impl Default for WatchBackoff {
    fn default() -> Self {
        Self::new(1_000, constants::DEFAULT_WATCH_MAX_BACKOFF_MS)
    }
}

impl WatchBackoff {
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            current_ms: AtomicU64::new(initial_ms),
            max_ms,
        }
    }

    /// Current delay, doubling the stored one for next time
    pub fn next_delay(&self) -> Duration {
        let current = self.current_ms.load(Ordering::Relaxed);
        self.current_ms
            .store(current.saturating_mul(2).min(self.max_ms), Ordering::Relaxed);
        Duration::from_millis(current)
    }

    pub fn reset(&self, initial_ms: u64) {
        self.current_ms.store(initial_ms, Ordering::Relaxed);
    }
}

/// Log a watch stream error for `kind` and wait before the stream is polled again
pub async fn handle_watch_stream_error(kind: &str, message: &str, backoff: &WatchBackoff) {
    match classify_watch_error(message) {
        WatchErrorClass::Unauthorized => {
            error!(kind, "❌ Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired");
            error!("🔍 SRE Diagnostics:");
            error!("   1. Verify ClusterRole 'apigateway-controller' still exists:");
            error!("      kubectl get clusterrole apigateway-controller");
            error!("   2. Verify RBAC permissions are still active:");
            error!("      kubectl auth can-i watch {}s.apigateway.services.k8s.aws --as=system:serviceaccount:<namespace>:apigateway-controller", kind.to_lowercase());
            warn!(
                "⏳ Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                constants::DEFAULT_WATCH_RESTART_DELAY_SECS
            );
            tokio::time::sleep(Duration::from_secs(
                constants::DEFAULT_WATCH_RESTART_DELAY_SECS,
            ))
            .await;
        }
        WatchErrorClass::Expired => {
            warn!(kind, "Watch resource version expired (410), watch will restart");
        }
        WatchErrorClass::Throttled => {
            let delay = backoff.next_delay();
            warn!(
                kind,
                "API server storage reinitializing (429), backing off for {}ms...",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
        WatchErrorClass::NotFound => {
            error!(kind, "Watched resource not found. Is the CRD installed? Run `crdgen | kubectl apply -f -`");
            tokio::time::sleep(Duration::from_secs(
                constants::DEFAULT_WATCH_RESTART_DELAY_SECS,
            ))
            .await;
        }
        WatchErrorClass::Other => {
            error!(kind, "Watch stream error: {}", message);
            tokio::time::sleep(Duration::from_secs(
                constants::DEFAULT_WATCH_RESTART_DELAY_SECS,
            ))
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_watch_errors() {
        assert_eq!(
            classify_watch_error("ApiError: Unauthorized (401)"),
            WatchErrorClass::Unauthorized
        );
        assert_eq!(
            classify_watch_error("too old resource version: 123 (456)"),
            WatchErrorClass::Expired
        );
        assert_eq!(
            classify_watch_error("storage is (re)initializing"),
            WatchErrorClass::Throttled
        );
        assert_eq!(
            classify_watch_error("404 page not found"),
            WatchErrorClass::NotFound
        );
        assert_eq!(classify_watch_error("connection reset"), WatchErrorClass::Other);
    }

    #[test]
    fn test_watch_backoff_doubles_and_caps() {
        let backoff = WatchBackoff::new(1_000, 3_000);
        assert_eq!(backoff.next_delay(), Duration::from_millis(1_000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2_000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(3_000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(3_000));
        backoff.reset(500);
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    }
}
