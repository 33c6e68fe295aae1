//! # API Gateway Controller
//!
//! A Kubernetes controller that reconciles API Gateway custom resources
//! (`RestAPI`, `Resource`, `Method`, `Integration`, `Stage`, ...) against AWS API Gateway.
//!
//! ## Overview
//!
//! 1. **Watching custom resources** - one watcher per kind feeds a per-object work queue
//! 2. **Resolving references** - `*Ref` fields are resolved to the referent's remote id
//! 3. **Reconciling** - create, minimal field patches, immutable-field replacement, tag merge
//! 4. **Reporting** - `ACK.ResourceSynced` / `ACK.Terminal` conditions on each object
//!
//! ## Features
//!
//! - **Drift correction**: periodic resync re-applies diverging fields
//! - **Ordered deletion**: objects with live dependents are deleted last
//! - **Backoff**: throttled and unknown remote errors retry with capped exponential delays
//! - **Prometheus metrics**: Exposes metrics for monitoring and observability
//! - **Health probes**: HTTP endpoints for liveness and readiness checks

use anyhow::Result;
use apigateway_controller::runtime::{initialize, run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(init_result).await
}
