//! # Observability
//!
//! Prometheus metrics and the HTTP server exposing them next to the
//! liveness and readiness probes.

pub mod metrics;
pub mod server;
