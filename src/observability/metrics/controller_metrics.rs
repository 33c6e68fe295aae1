//! # Controller Metrics
//!
//! Metrics for the work queue and reconcile passes.

use crate::observability::metrics::registry::register;
use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, IntGauge};
use std::sync::LazyLock;

static EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "apigateway_controller_events_total",
            "Total number of custom resource events received",
        ),
        &["kind"],
    )
    .expect("Failed to create EVENTS_TOTAL metric - this should never happen")
});

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "apigateway_controller_reconciliations_total",
            "Total number of reconcile passes by kind and outcome",
        ),
        &["kind", "outcome"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "apigateway_controller_reconciliation_duration_seconds",
            "Duration of reconcile passes in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "apigateway_controller_requeues_total",
            "Total number of reconciliation requeues",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static ACTIVE_OBJECTS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "apigateway_controller_active_objects",
        "Objects currently known to the work queue",
    )
    .expect("Failed to create ACTIVE_OBJECTS metric - this should never happen")
});

/// Register controller metrics with the registry
pub(crate) fn register_controller_metrics() -> Result<()> {
    register(Box::new(EVENTS_TOTAL.clone()))?;
    register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    register(Box::new(RECONCILIATION_DURATION.clone()))?;
    register(Box::new(REQUEUES_TOTAL.clone()))?;
    register(Box::new(ACTIVE_OBJECTS.clone()))?;
    Ok(())
}

pub fn increment_events(kind: &str) {
    EVENTS_TOTAL.with_label_values(&[kind]).inc();
}

/// Count one reconcile pass and record its duration
pub fn observe_reconcile(kind: &str, outcome: &str, duration_secs: f64) {
    RECONCILIATIONS_TOTAL
        .with_label_values(&[kind, outcome])
        .inc();
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration_secs);
}

pub fn increment_requeues(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn set_active_objects(count: usize) {
    ACTIVE_OBJECTS.set(i64::try_from(count).unwrap_or(i64::MAX));
}
