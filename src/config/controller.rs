//! # Controller Settings
//!
//! Reconciliation, scheduling, remote-API and health server settings loaded
//! from environment variables.

use super::env_var_or_default;
use anyhow::Result;
use regex::Regex;
use std::time::Duration;
use tracing::warn;

/// Controller configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Number of reconcile workers
    pub worker_count: usize,
    /// Periodic resync interval for synced resources
    pub resync_period: Duration,
    /// Requeue delay while references are unresolved
    pub pending_requeue: Duration,
    /// Requeue delay while waiting out read-after-create inconsistency
    pub consistency_requeue: Duration,
    /// How long after a create a missing remote entity is not treated as drift
    pub consistency_window: Duration,
    /// First backoff delay for throttled/unknown remote errors
    pub backoff_initial: Duration,
    /// Backoff cap
    pub backoff_max: Duration,
    /// Unknown remote errors tolerated per resource before going terminal
    pub max_unknown_retries: u32,
    /// Namespace to watch (all namespaces when unset)
    pub watch_namespace: Option<String>,
    pub aws_region: String,
    /// Endpoint override for a local API Gateway emulator
    pub aws_endpoint_url: Option<String>,
    /// Prefix of controller-owned tags
    pub system_tag_prefix: String,
    /// Port of the metrics and health server
    pub metrics_port: u16,
    /// Startup fails if the health server has not bound within this time
    pub server_startup_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            resync_period: Duration::from_secs(10 * 3600),
            pending_requeue: Duration::from_secs(DEFAULT_PENDING_REQUEUE_SECS),
            consistency_requeue: Duration::from_secs(DEFAULT_CONSISTENCY_REQUEUE_SECS),
            consistency_window: Duration::from_secs(DEFAULT_CONSISTENCY_WINDOW_SECS),
            backoff_initial: Duration::from_millis(DEFAULT_BACKOFF_INITIAL_MS),
            backoff_max: Duration::from_secs(DEFAULT_BACKOFF_MAX_SECS),
            max_unknown_retries: DEFAULT_MAX_UNKNOWN_RETRIES,
            watch_namespace: None,
            aws_region: DEFAULT_AWS_REGION.to_string(),
            aws_endpoint_url: None,
            system_tag_prefix: DEFAULT_SYSTEM_TAG_PREFIX.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            server_startup_timeout: Duration::from_secs(DEFAULT_SERVER_STARTUP_TIMEOUT_SECS),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;

        let resync_raw = env_var_or_default("RESYNC_PERIOD", DEFAULT_RESYNC_PERIOD.to_string());
        let resync_period = parse_kubernetes_duration(&resync_raw).unwrap_or_else(|e| {
            warn!(
                "Invalid RESYNC_PERIOD '{}': {}, using default {}",
                resync_raw, e, DEFAULT_RESYNC_PERIOD
            );
            Duration::from_secs(10 * 3600)
        });

        Self {
            worker_count: env_var_or_default("WORKER_COUNT", DEFAULT_WORKER_COUNT).max(1),
            resync_period,
            pending_requeue: Duration::from_secs(env_var_or_default(
                "PENDING_REQUEUE_SECS",
                DEFAULT_PENDING_REQUEUE_SECS,
            )),
            consistency_requeue: Duration::from_secs(env_var_or_default(
                "CONSISTENCY_REQUEUE_SECS",
                DEFAULT_CONSISTENCY_REQUEUE_SECS,
            )),
            consistency_window: Duration::from_secs(env_var_or_default(
                "CONSISTENCY_WINDOW_SECS",
                DEFAULT_CONSISTENCY_WINDOW_SECS,
            )),
            backoff_initial: Duration::from_millis(env_var_or_default(
                "BACKOFF_INITIAL_MS",
                DEFAULT_BACKOFF_INITIAL_MS,
            )),
            backoff_max: Duration::from_secs(env_var_or_default(
                "BACKOFF_MAX_SECS",
                DEFAULT_BACKOFF_MAX_SECS,
            )),
            max_unknown_retries: env_var_or_default(
                "MAX_UNKNOWN_RETRIES",
                DEFAULT_MAX_UNKNOWN_RETRIES,
            ),
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|ns| !ns.is_empty()),
            aws_region: env_var_or_default("AWS_REGION", DEFAULT_AWS_REGION.to_string()),
            aws_endpoint_url: std::env::var("AWS_ENDPOINT_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            system_tag_prefix: env_var_or_default(
                "SYSTEM_TAG_PREFIX",
                DEFAULT_SYSTEM_TAG_PREFIX.to_string(),
            ),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            server_startup_timeout: Duration::from_secs(env_var_or_default(
                "STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            )),
        }
    }
}

/// Parse Kubernetes duration string into std::time::Duration
/// Supports formats: "30s", "1m", "5m", "1h", "2h", "1d"
pub fn parse_kubernetes_duration(duration_str: &str) -> Result<Duration> {
    let duration_trimmed = duration_str.trim();

    if duration_trimmed.is_empty() {
        return Err(anyhow::anyhow!("Duration string cannot be empty"));
    }

    let duration_regex = Regex::new(r"^(?P<number>\d+)(?P<unit>[smhd])$")
        .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    let interval_lower = duration_trimmed.to_lowercase();
    let captures = duration_regex.captures(&interval_lower).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid duration format '{}'. Expected format: <number><unit> (e.g., '30m', '10h')",
            duration_trimmed
        )
    })?;

    let number: u64 = captures["number"].parse().map_err(|e| {
        anyhow::anyhow!("Invalid duration number in '{}': {}", duration_trimmed, e)
    })?;
    if number == 0 {
        return Err(anyhow::anyhow!(
            "Duration number must be greater than 0, got '{}'",
            duration_trimmed
        ));
    }

    let seconds = match &captures["unit"] {
        "s" => number,
        "m" => number * 60,
        "h" => number * 3600,
        _ => number * 86400,
    };
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kubernetes_duration() {
        assert_eq!(
            parse_kubernetes_duration("30s").unwrap(),
            Duration::from_secs(30)
        );
        assert_eq!(
            parse_kubernetes_duration("10h").unwrap(),
            Duration::from_secs(36_000)
        );
        assert_eq!(
            parse_kubernetes_duration(" 1D ").unwrap(),
            Duration::from_secs(86_400)
        );
    }

    #[test]
    fn test_parse_kubernetes_duration_rejects_garbage() {
        assert!(parse_kubernetes_duration("").is_err());
        assert!(parse_kubernetes_duration("0m").is_err());
        assert!(parse_kubernetes_duration("5 minutes").is_err());
        assert!(parse_kubernetes_duration("1w").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.resync_period, Duration::from_secs(36_000));
        assert_eq!(config.system_tag_prefix, "services.k8s.aws/");
        assert!(config.watch_namespace.is_none());
        assert_eq!(config.metrics_port, 8080);
        assert_eq!(config.server_startup_timeout, Duration::from_secs(10));
    }
}
