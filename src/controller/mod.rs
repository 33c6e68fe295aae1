//! # Controller
//!
//! The reconciliation engine:
//!
//! - **conditions**: condition bookkeeping and the status-read API
//! - **dependency**: reference resolution and dependent lookup
//! - **reconciler**: per-object control loop
//! - **scheduler**: per-identity work queue with backoff
//! - **engine**: event entry point wiring reconciler and scheduler

pub mod conditions;
pub mod dependency;
pub mod engine;
pub mod reconciler;
pub mod scheduler;

pub use conditions::{ConditionStatus, ConditionTracker};
pub use dependency::{DependencyResolver, Resolution};
pub use engine::{Engine, EventType};
pub use reconciler::{ReconcileOutcome, Reconciler, ReconcilerSettings, WaitReason};
pub use scheduler::{ReconcileTask, Scheduler, TriggerReason};
