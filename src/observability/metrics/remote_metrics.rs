//! # Remote Metrics
//!
//! API Gateway call volume and failures, labelled by resource kind.

use crate::observability::metrics::registry::register;
use anyhow::Result;
use prometheus::IntCounterVec;
use std::sync::LazyLock;

static REMOTE_CALLS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "apigateway_controller_remote_calls_total",
            "Total number of API Gateway calls by kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create REMOTE_CALLS_TOTAL metric - this should never happen")
});

static REMOTE_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "apigateway_controller_remote_errors_total",
            "Total number of failed API Gateway calls by kind and error reason",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create REMOTE_ERRORS_TOTAL metric - this should never happen")
});

pub(crate) fn register_remote_metrics() -> Result<()> {
    register(Box::new(REMOTE_CALLS_TOTAL.clone()))?;
    register(Box::new(REMOTE_ERRORS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_remote_calls(kind: &str, operation: &str) {
    REMOTE_CALLS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_remote_errors(kind: &str, reason: &str) {
    REMOTE_ERRORS_TOTAL.with_label_values(&[kind, reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::{encode_metrics, register_metrics};

    #[test]
    fn test_remote_metrics_are_exported() {
        register_metrics().unwrap();
        increment_remote_calls("RestAPI", "create");
        increment_remote_errors("RestAPI", "Throttled");

        let encoded = encode_metrics().unwrap();
        assert!(encoded.contains("apigateway_controller_remote_calls_total"));
        assert!(encoded.contains("operation=\"create\""));
        assert!(encoded.contains("reason=\"Throttled\""));
    }
}
