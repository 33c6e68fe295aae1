//! # Constants
//!
//! Default values for controller configuration. Every default can be
//! overridden through the environment (see [`crate::config`]).

/// Finalizer placed on every managed custom resource
pub const FINALIZER: &str = "apigateway.services.k8s.aws/finalizer";

/// Server-side apply field manager
pub const FIELD_MANAGER: &str = "apigateway-controller";

/// Value of the `managed-by` system tag
pub const MANAGED_BY: &str = "apigateway-controller";

/// Prefix identifying controller-owned tags
pub const DEFAULT_SYSTEM_TAG_PREFIX: &str = "services.k8s.aws/";

// Condition types
pub const CONDITION_RESOURCE_SYNCED: &str = "ACK.ResourceSynced";
pub const CONDITION_TERMINAL: &str = "ACK.Terminal";
pub const CONDITION_REFERENCES_RESOLVED: &str = "ACK.ReferencesResolved";

// Scheduler
pub const DEFAULT_WORKER_COUNT: usize = 4;
/// Kubernetes duration format
pub const DEFAULT_RESYNC_PERIOD: &str = "10h";
pub const DEFAULT_PENDING_REQUEUE_SECS: u64 = 5;
pub const DEFAULT_CONSISTENCY_REQUEUE_SECS: u64 = 3;
pub const DEFAULT_CONSISTENCY_WINDOW_SECS: u64 = 60;
pub const DEFAULT_BACKOFF_INITIAL_MS: u64 = 500;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
/// Fraction of each backoff delay randomised
pub const DEFAULT_BACKOFF_JITTER: f64 = 0.1;
pub const DEFAULT_MAX_UNKNOWN_RETRIES: u32 = 5;

// Remote
pub const DEFAULT_AWS_REGION: &str = "us-west-2";

// Server
pub const DEFAULT_METRICS_PORT: u16 = 8080;
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

// Watch
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;
pub const DEFAULT_WATCH_MAX_BACKOFF_MS: u64 = 30_000;
