//! # Engine
//!
//! Entry point for custom resource events. Events become reconcile tasks on
//! the [`Scheduler`]; reconcile outcomes become requeue decisions.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{ReconcileOutcome, Reconciler};
use crate::controller::scheduler::{
    BackoffConfig, ReconcileTask, Requeue, Scheduler, TaskHandler, TriggerReason,
};
use crate::crd::{ObjectKey, ObjectRef};
use crate::descriptor::Kind;
use crate::observability::metrics;
use crate::store::StoreError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Kind of custom resource event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Created or spec changed
    Applied { generation: i64 },
    /// Deletion requested
    Deleted,
    Resync,
}

impl From<EventType> for TriggerReason {
    fn from(event: EventType) -> Self {
        match event {
            EventType::Applied { generation } => TriggerReason::Applied { generation },
            EventType::Deleted => TriggerReason::Deleted,
            EventType::Resync => TriggerReason::Resync,
        }
    }
}

/// Requeue intervals for non-error outcomes
#[derive(Debug, Clone)]
pub struct RequeueTimings {
    pub resync_period: Duration,
    pub pending: Duration,
    pub consistency: Duration,
}

impl From<&ControllerConfig> for RequeueTimings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            resync_period: config.resync_period,
            pending: config.pending_requeue,
            consistency: config.consistency_requeue,
        }
    }
}

impl RequeueTimings {
    pub fn requeue_for(&self, outcome: &ReconcileOutcome) -> Requeue {
        match outcome {
            ReconcileOutcome::Synced => Requeue::After {
                delay: self.resync_period,
                reason: "resync",
            },
            ReconcileOutcome::Pending(_) => Requeue::After {
                delay: self.pending,
                reason: "pending",
            },
            ReconcileOutcome::Waiting(reason) => Requeue::After {
                delay: self.consistency,
                reason: reason.as_str(),
            },
            ReconcileOutcome::Transient(_) => Requeue::Backoff,
            ReconcileOutcome::Terminal(_) | ReconcileOutcome::Deleted | ReconcileOutcome::Gone => {
                Requeue::Never
            }
        }
    }
}

struct ReconcileHandler {
    reconciler: Arc<Reconciler>,
    timings: RequeueTimings,
}

#[async_trait]
impl TaskHandler for ReconcileHandler {
    async fn handle(&self, task: &ReconcileTask) -> Requeue {
        let kind = task.object.kind.as_str();
        let started = Instant::now();
        let result = self.reconciler.reconcile(&task.object).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(outcome) => {
                metrics::observe_reconcile(kind, outcome.as_str(), elapsed);
                self.timings.requeue_for(&outcome)
            }
            Err(e) => {
                error!(object = %task.object, reason = %task.reason, error = %e, "❌ Reconcile failed");
                metrics::observe_reconcile(kind, "error", elapsed);
                Requeue::Backoff
            }
        }
    }
}

pub struct Engine {
    reconciler: Arc<Reconciler>,
    scheduler: Scheduler,
    timings: RequeueTimings,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("scheduler", &self.scheduler)
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(reconciler: Reconciler, config: &ControllerConfig) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            scheduler: Scheduler::new(BackoffConfig::from(config)),
            timings: RequeueTimings::from(config),
        }
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Start the reconcile workers
    pub fn start(&self, workers: usize) -> Vec<JoinHandle<()>> {
        info!(workers, "Starting reconcile workers");
        let handler = Arc::new(ReconcileHandler {
            reconciler: Arc::clone(&self.reconciler),
            timings: self.timings.clone(),
        });
        self.scheduler.spawn_workers(handler, workers)
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    /// Feed one custom resource event into the work queue
    pub fn on_custom_resource_event(&self, kind: Kind, identity: ObjectKey, event: EventType) {
        metrics::increment_events(kind.as_str());
        self.scheduler.enqueue(ReconcileTask::new(
            ObjectRef { kind, key: identity },
            event.into(),
        ));
    }

    /// Enqueue every known object of every registered kind
    pub async fn resync_all(&self) -> Result<usize, StoreError> {
        let mut kinds: Vec<Kind> = self.reconciler.registry().kinds().collect();
        kinds.sort();

        let mut count = 0;
        for kind in kinds {
            for object in self.reconciler.store().list(kind).await? {
                self.on_custom_resource_event(kind, object.key, EventType::Resync);
                count += 1;
            }
        }
        info!(count, "📅 Periodic resync enqueued");
        Ok(count)
    }

    /// Run [`Engine::resync_all`] every `period` until the task is aborted
    pub fn spawn_resync_timer(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // first tick completes immediately; watchers already deliver the initial state
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = engine.resync_all().await {
                    warn!(error = %e, "Periodic resync failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::WaitReason;
    use crate::provider::RemoteError;

    fn timings() -> RequeueTimings {
        RequeueTimings {
            resync_period: Duration::from_secs(36_000),
            pending: Duration::from_secs(5),
            consistency: Duration::from_secs(3),
        }
    }

    #[test]
    fn test_requeue_policy() {
        let t = timings();
        assert_eq!(
            t.requeue_for(&ReconcileOutcome::Synced),
            Requeue::After {
                delay: Duration::from_secs(36_000),
                reason: "resync"
            }
        );
        assert_eq!(
            t.requeue_for(&ReconcileOutcome::Pending(vec![])),
            Requeue::After {
                delay: Duration::from_secs(5),
                reason: "pending"
            }
        );
        assert_eq!(
            t.requeue_for(&ReconcileOutcome::Waiting(WaitReason::Busy)),
            Requeue::After {
                delay: Duration::from_secs(3),
                reason: "Busy"
            }
        );
        assert_eq!(
            t.requeue_for(&ReconcileOutcome::Transient(RemoteError::Throttled("slow".into()))),
            Requeue::Backoff
        );
        assert_eq!(
            t.requeue_for(&ReconcileOutcome::Terminal("bad".into())),
            Requeue::Never
        );
        assert_eq!(t.requeue_for(&ReconcileOutcome::Deleted), Requeue::Never);
    }
}
