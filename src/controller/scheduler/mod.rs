//! # Scheduler
//!
//! Per-identity work queue feeding a pool of reconcile workers.
//!
//! - At most one task runs per identity; distinct identities run concurrently.
//! - A trigger arriving while its identity is queued coalesces with the queued
//!   task; one arriving while it runs is parked and queued when the run ends.
//! - Waits and backoff are delayed requeues on timer tasks. Spec changes and
//!   deletions bump the identity's epoch, which cancels any delayed requeue
//!   scheduled before it.
//! - Resyncs never touch the epoch and are dropped while the identity has
//!   queued, running, parked or delayed work.

pub mod backoff;

pub use backoff::BackoffConfig;

use crate::crd::ObjectRef;
use crate::observability::metrics;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Why a task was enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Spec created or changed
    Applied { generation: i64 },
    /// Deletion requested
    Deleted,
    /// Periodic full resync
    Resync,
    /// Delayed requeue after a previous run
    Requeue,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::Applied { generation } => write!(f, "applied(generation={generation})"),
            TriggerReason::Deleted => write!(f, "deleted"),
            TriggerReason::Resync => write!(f, "resync"),
            TriggerReason::Requeue => write!(f, "requeue"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTask {
    pub object: ObjectRef,
    pub reason: TriggerReason,
}

impl ReconcileTask {
    pub fn new(object: ObjectRef, reason: TriggerReason) -> Self {
        Self { object, reason }
    }

    /// Merge a newer trigger into this queued one.
    ///
    /// Spec changes and deletions replace what is queued; resyncs and
    /// requeues never displace them.
    fn coalesce(self, newer: ReconcileTask) -> ReconcileTask {
        match newer.reason {
            TriggerReason::Resync | TriggerReason::Requeue => self,
            TriggerReason::Applied { .. } if self.reason == TriggerReason::Deleted => self,
            _ => newer,
        }
    }
}

/// What to do with an identity after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    Never,
    /// Fixed delay
    After {
        delay: Duration,
        reason: &'static str,
    },
    /// Exponential backoff on consecutive failures of this identity
    Backoff,
}

/// Work executed by the workers
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &ReconcileTask) -> Requeue;
}

#[derive(Debug, Default)]
struct IdentityState {
    /// Task sitting in the ready channel
    queued: Option<ReconcileTask>,
    running: bool,
    /// Trigger that arrived during a run
    parked: Option<ReconcileTask>,
    epoch: u64,
    /// A timer holds a requeue for the current epoch
    delayed: bool,
    failures: u32,
}

impl IdentityState {
    fn is_idle(&self) -> bool {
        self.queued.is_none() && !self.running && self.parked.is_none()
    }
}

struct Inner {
    identities: Mutex<HashMap<ObjectRef, IdentityState>>,
    ready_tx: mpsc::UnboundedSender<ObjectRef>,
    ready_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ObjectRef>>,
    backoff: BackoffConfig,
    shutdown: watch::Sender<bool>,
}

impl Inner {
    fn identities(&self) -> MutexGuard<'_, HashMap<ObjectRef, IdentityState>> {
        self.identities.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put `task` on the ready queue or fold it into what is already pending
    fn submit(&self, task: ReconcileTask, external: bool) {
        let mut identities = self.identities();
        let state = identities.entry(task.object.clone()).or_default();
        if task.reason == TriggerReason::Resync && (state.delayed || !state.is_idle()) {
            debug!(object = %task.object, "Resync dropped, work already pending");
            return;
        }
        if external {
            state.epoch += 1;
            state.delayed = false;
        }
        if state.running {
            state.parked = Some(match state.parked.take() {
                Some(parked) => parked.coalesce(task),
                None => task,
            });
        } else if let Some(queued) = state.queued.take() {
            state.queued = Some(queued.coalesce(task));
        } else {
            let object = task.object.clone();
            state.queued = Some(task);
            // Receiver lives as long as Inner
            let _ = self.ready_tx.send(object);
        }
        metrics::set_active_objects(identities.len());
    }
}

/// Handle to the work queue; clones share the queue
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("backoff", &self.inner.backoff)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(backoff: BackoffConfig) -> Self {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                identities: Mutex::new(HashMap::new()),
                ready_tx,
                ready_rx: tokio::sync::Mutex::new(ready_rx),
                backoff,
                shutdown,
            }),
        }
    }

    /// Enqueue a watch or resync trigger.
    ///
    /// Spec changes and deletions cancel any delayed requeue for the identity;
    /// a resync leaves it in place.
    pub fn enqueue(&self, task: ReconcileTask) {
        debug!(object = %task.object, reason = %task.reason, "Enqueued reconcile task");
        let external = matches!(
            task.reason,
            TriggerReason::Applied { .. } | TriggerReason::Deleted
        );
        self.inner.submit(task, external);
    }

    /// Number of identities with queued, running or parked work
    pub fn active(&self) -> usize {
        self.inner
            .identities()
            .values()
            .filter(|s| !s.is_idle())
            .count()
    }

    /// Start `count` workers running `handler`
    pub fn spawn_workers(&self, handler: Arc<dyn TaskHandler>, count: usize) -> Vec<JoinHandle<()>> {
        (0..count.max(1))
            .map(|worker| {
                let inner = Arc::clone(&self.inner);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move { run_worker(worker, inner, handler).await })
            })
            .collect()
    }

    /// Stop workers after their current task
    pub fn shutdown(&self) {
        info!("Stopping reconcile workers");
        self.inner.shutdown.send_replace(true);
    }
}

async fn run_worker(worker: usize, inner: Arc<Inner>, handler: Arc<dyn TaskHandler>) {
    let mut shutdown = inner.shutdown.subscribe();
    debug!(worker, "Reconcile worker started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let next = {
            let mut ready = inner.ready_rx.lock().await;
            tokio::select! {
                object = ready.recv() => object,
                _ = shutdown.changed() => None,
            }
        };
        let Some(object) = next else {
            break;
        };

        let task = {
            let mut identities = inner.identities();
            let Some(state) = identities.get_mut(&object) else {
                continue;
            };
            let Some(task) = state.queued.take() else {
                continue;
            };
            state.running = true;
            task
        };

        let requeue = handler.handle(&task).await;
        finish(&inner, &object, requeue);
    }
    debug!(worker, "Reconcile worker stopped");
}

/// Release the identity and schedule whatever comes next for it
fn finish(inner: &Arc<Inner>, object: &ObjectRef, requeue: Requeue) {
    let mut identities = inner.identities();
    let Some(state) = identities.get_mut(object) else {
        return;
    };
    state.running = false;

    let delay = match requeue {
        Requeue::Never => {
            state.failures = 0;
            None
        }
        Requeue::After { delay, reason } => {
            state.failures = 0;
            metrics::increment_requeues(reason);
            Some(delay)
        }
        Requeue::Backoff => {
            let delay = inner.backoff.delay_for_attempt(state.failures);
            state.failures = state.failures.saturating_add(1);
            metrics::increment_requeues("backoff");
            Some(delay)
        }
    };

    if let Some(parked) = state.parked.take() {
        state.queued = Some(parked);
        let _ = inner.ready_tx.send(object.clone());
        return;
    }

    match delay {
        Some(delay) => {
            let epoch = state.epoch;
            state.delayed = true;
            let inner = Arc::clone(inner);
            let object = object.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let current = {
                    let mut identities = inner.identities();
                    match identities.get_mut(&object) {
                        Some(state) if state.epoch == epoch => {
                            state.delayed = false;
                            true
                        }
                        _ => false,
                    }
                };
                if current {
                    inner.submit(ReconcileTask::new(object, TriggerReason::Requeue), false);
                } else {
                    debug!(object = %object, "Delayed requeue superseded");
                }
            });
        }
        None => {
            if state.is_idle() && state.failures == 0 {
                identities.remove(object);
                metrics::set_active_objects(identities.len());
            }
        }
    }
}
