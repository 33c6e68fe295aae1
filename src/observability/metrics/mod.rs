//! # Metrics Module
//!
//! Prometheus metrics for monitoring the controller, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text encoding
//! - `controller_metrics` - Events, reconcile outcomes and requeues
//! - `remote_metrics` - API Gateway calls and their failures

pub mod controller_metrics;
pub mod registry;
pub mod remote_metrics;

pub use controller_metrics::*;
pub use registry::*;
pub use remote_metrics::*;
