//! Finite state machine for the lifecycle of a managed API Gateway resource
//!
//! Valid transitions are listed explicitly; anything else is rejected and
//! logged by the reconciler.
//!
//! ```text
//! Pending ──Create──▶ Creating ──Succeeded──▶ Synced ──Update──▶ Updating ──Succeeded──▶ Synced
//!    any ──Fail──▶ Terminal          Synced | Terminal ──Delete──▶ Deleting ──Deleted──▶ Deleted
//! ```

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pending,
    Creating,
    Synced,
    Updating,
    Terminal,
    Deleting,
    Deleted,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "Pending",
            Phase::Creating => "Creating",
            Phase::Synced => "Synced",
            Phase::Updating => "Updating",
            Phase::Terminal => "Terminal",
            Phase::Deleting => "Deleting",
            Phase::Deleted => "Deleted",
        }
    }

    /// Phase recorded in status, `Pending` when absent or unrecognised
    pub fn from_status(phase: Option<&str>) -> Self {
        phase.and_then(|p| p.parse().ok()).unwrap_or(Phase::Pending)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Phase::Pending),
            "Creating" => Ok(Phase::Creating),
            "Synced" => Ok(Phase::Synced),
            "Updating" => Ok(Phase::Updating),
            "Terminal" => Ok(Phase::Terminal),
            "Deleting" => Ok(Phase::Deleting),
            "Deleted" => Ok(Phase::Deleted),
            other => Err(format!("unknown phase `{other}`")),
        }
    }
}

/// Events driving lifecycle transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// References are not resolvable yet
    ReferencesUnresolved,
    /// Remote create (or recreate) is about to be issued
    CreateStarted,
    /// Remote patch is about to be issued
    UpdateStarted,
    /// Remote entity matches the spec
    Succeeded,
    /// Unrecoverable error
    Failed,
    DeletionRequested,
    DeletionConfirmed,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::ReferencesUnresolved => write!(f, "ReferencesUnresolved"),
            LifecycleEvent::CreateStarted => write!(f, "CreateStarted"),
            LifecycleEvent::UpdateStarted => write!(f, "UpdateStarted"),
            LifecycleEvent::Succeeded => write!(f, "Succeeded"),
            LifecycleEvent::Failed => write!(f, "Failed"),
            LifecycleEvent::DeletionRequested => write!(f, "DeletionRequested"),
            LifecycleEvent::DeletionConfirmed => write!(f, "DeletionConfirmed"),
        }
    }
}

#[derive(Debug)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    pub event: LifecycleEvent,
    pub description: &'static str,
}

impl Transition {
    const fn new(
        from: Phase,
        to: Phase,
        event: LifecycleEvent,
        description: &'static str,
    ) -> Self {
        Self {
            from,
            to,
            event,
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    Success {
        from: Phase,
        to: Phase,
        event: LifecycleEvent,
        description: &'static str,
    },
    InvalidTransition {
        current: Phase,
        event: LifecycleEvent,
    },
}

use LifecycleEvent as E;
use Phase as P;

static TRANSITIONS: &[Transition] = &[
    // === Pending ===
    Transition::new(P::Pending, P::Pending, E::ReferencesUnresolved, "Still waiting on references"),
    Transition::new(P::Pending, P::Creating, E::CreateStarted, "References resolved, creating"),
    Transition::new(P::Pending, P::Synced, E::Succeeded, "References resolved again, no drift"),
    Transition::new(P::Pending, P::Updating, E::UpdateStarted, "References resolved again, patching"),
    Transition::new(P::Pending, P::Terminal, E::Failed, "Spec rejected before create"),
    Transition::new(P::Pending, P::Deleting, E::DeletionRequested, "Deleted before creation"),
    // === Creating ===
    Transition::new(P::Creating, P::Synced, E::Succeeded, "Remote entity created"),
    Transition::new(P::Creating, P::Terminal, E::Failed, "Create failed"),
    Transition::new(P::Creating, P::Creating, E::CreateStarted, "Create retried"),
    Transition::new(P::Creating, P::Pending, E::ReferencesUnresolved, "Referent disappeared before create"),
    Transition::new(P::Creating, P::Deleting, E::DeletionRequested, "Deleted while creating"),
    // === Synced ===
    Transition::new(P::Synced, P::Synced, E::Succeeded, "No drift"),
    Transition::new(P::Synced, P::Updating, E::UpdateStarted, "Spec or drift change"),
    Transition::new(P::Synced, P::Creating, E::CreateStarted, "Remote entity missing or replaced"),
    Transition::new(P::Synced, P::Pending, E::ReferencesUnresolved, "Referent no longer synced"),
    Transition::new(P::Synced, P::Terminal, E::Failed, "Resync failed"),
    Transition::new(P::Synced, P::Deleting, E::DeletionRequested, "Deletion requested"),
    // === Updating ===
    Transition::new(P::Updating, P::Synced, E::Succeeded, "Patch applied"),
    Transition::new(P::Updating, P::Updating, E::UpdateStarted, "Patch retried"),
    Transition::new(P::Updating, P::Creating, E::CreateStarted, "Immutable field replaced"),
    Transition::new(P::Updating, P::Terminal, E::Failed, "Patch rejected"),
    Transition::new(P::Updating, P::Pending, E::ReferencesUnresolved, "Referent no longer synced"),
    Transition::new(P::Updating, P::Deleting, E::DeletionRequested, "Deleted while updating"),
    // === Terminal ===
    Transition::new(P::Terminal, P::Synced, E::Succeeded, "Recovered"),
    Transition::new(P::Terminal, P::Creating, E::CreateStarted, "Spec changed, retrying create"),
    Transition::new(P::Terminal, P::Updating, E::UpdateStarted, "Spec changed, retrying update"),
    Transition::new(P::Terminal, P::Pending, E::ReferencesUnresolved, "Spec changed, waiting on references"),
    Transition::new(P::Terminal, P::Terminal, E::Failed, "Still failing"),
    Transition::new(P::Terminal, P::Deleting, E::DeletionRequested, "Deletion requested"),
    // === Deleting ===
    Transition::new(P::Deleting, P::Deleting, E::DeletionRequested, "Deletion deferred"),
    Transition::new(P::Deleting, P::Deleted, E::DeletionConfirmed, "Remote entity gone"),
    Transition::new(P::Deleting, P::Terminal, E::Failed, "Delete rejected"),
];

pub fn transition(current: Phase, event: LifecycleEvent) -> TransitionResult {
    match TRANSITIONS
        .iter()
        .find(|t| t.from == current && t.event == event)
    {
        Some(t) => TransitionResult::Success {
            from: t.from,
            to: t.to,
            event,
            description: t.description,
        },
        None => TransitionResult::InvalidTransition { current, event },
    }
}

pub fn can_transition(from: Phase, event: LifecycleEvent) -> bool {
    TRANSITIONS.iter().any(|t| t.from == from && t.event == event)
}

pub fn valid_events(state: Phase) -> Vec<LifecycleEvent> {
    TRANSITIONS
        .iter()
        .filter(|t| t.from == state)
        .map(|t| t.event)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut phase = Phase::Pending;
        for event in [E::CreateStarted, E::Succeeded, E::UpdateStarted, E::Succeeded] {
            match transition(phase, event) {
                TransitionResult::Success { to, .. } => phase = to,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(phase, Phase::Synced);
    }

    #[test]
    fn test_every_live_phase_can_fail() {
        for phase in [P::Pending, P::Creating, P::Synced, P::Updating, P::Deleting] {
            assert!(can_transition(phase, E::Failed), "{phase} cannot fail");
        }
    }

    #[test]
    fn test_deleted_is_final() {
        assert!(valid_events(Phase::Deleted).is_empty());
        assert_eq!(
            transition(Phase::Deleted, E::CreateStarted),
            TransitionResult::InvalidTransition {
                current: Phase::Deleted,
                event: E::CreateStarted
            }
        );
    }

    #[test]
    fn test_deletion_only_from_deleting() {
        assert!(!can_transition(Phase::Synced, E::DeletionConfirmed));
        assert!(can_transition(Phase::Deleting, E::DeletionConfirmed));
    }

    #[test]
    fn test_phase_round_trips_through_status() {
        assert_eq!(Phase::from_status(Some("Updating")), Phase::Updating);
        assert_eq!(Phase::from_status(None), Phase::Pending);
        assert_eq!(Phase::from_status(Some("Bogus")), Phase::Pending);
    }
}
