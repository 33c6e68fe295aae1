//! # Conditions
//!
//! Condition bookkeeping on [`ResourceStatus`].
//!
//! Updates are idempotent: writing the same `(status, reason, message)` tuple
//! again is a no-op and never moves `lastTransitionTime`. `Terminal=True` and
//! `ResourceSynced=True` are kept mutually exclusive:
//!
//! - setting `Terminal=True` forces `ResourceSynced=False` with reason `Terminal`
//! - setting `ResourceSynced=True` removes the `Terminal` condition

use crate::constants::{CONDITION_RESOURCE_SYNCED, CONDITION_TERMINAL};
use crate::crd::{Condition, ObjectRef, ResourceStatus};
use crate::store::{ObjectStore, StoreError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set one condition, returning whether anything changed
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
    message: Option<&str>,
) -> bool {
    let mut changed = upsert(conditions, condition_type, status, reason, message);

    if status == ConditionStatus::True {
        if condition_type == CONDITION_TERMINAL {
            changed |= upsert(
                conditions,
                CONDITION_RESOURCE_SYNCED,
                ConditionStatus::False,
                "Terminal",
                message,
            );
        } else if condition_type == CONDITION_RESOURCE_SYNCED {
            changed |= remove_condition(conditions, CONDITION_TERMINAL);
        }
    }
    changed
}

fn upsert(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: ConditionStatus,
    reason: &str,
    message: Option<&str>,
) -> bool {
    let now = chrono::Utc::now().to_rfc3339();
    match conditions.iter_mut().find(|c| c.r#type == condition_type) {
        Some(existing) => {
            if existing.status == status.as_str()
                && existing.reason.as_deref() == Some(reason)
                && existing.message.as_deref() == message
            {
                return false;
            }
            if existing.status != status.as_str() {
                existing.last_transition_time = Some(now);
            }
            existing.status = status.as_str().to_string();
            existing.reason = Some(reason.to_string());
            existing.message = message.map(str::to_string);
            true
        }
        None => {
            conditions.push(Condition {
                r#type: condition_type.to_string(),
                status: status.as_str().to_string(),
                last_transition_time: Some(now),
                reason: Some(reason.to_string()),
                message: message.map(str::to_string),
            });
            true
        }
    }
}

/// Drop a condition entirely, returning whether it was present
pub fn remove_condition(conditions: &mut Vec<Condition>, condition_type: &str) -> bool {
    let before = conditions.len();
    conditions.retain(|c| c.r#type != condition_type);
    conditions.len() != before
}

/// Whether `condition_type` currently has `status`
pub fn has_condition(
    status: &ResourceStatus,
    condition_type: &str,
    expected: ConditionStatus,
) -> bool {
    status
        .condition(condition_type)
        .is_some_and(|c| c.status == expected.as_str())
}

/// Condition reads and writes against the object store
#[derive(Clone)]
pub struct ConditionTracker {
    store: Arc<dyn ObjectStore>,
}

impl fmt::Debug for ConditionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionTracker").finish_non_exhaustive()
    }
}

impl ConditionTracker {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Set a condition on a stored object; writes only when something changed
    pub async fn set_condition(
        &self,
        object: &ObjectRef,
        condition_type: &str,
        status: ConditionStatus,
        reason: &str,
    ) -> Result<bool, StoreError> {
        let mut managed = self
            .store
            .get(object)
            .await?
            .ok_or_else(|| StoreError::NotFound(object.clone()))?;

        if !set_condition(
            &mut managed.status.conditions,
            condition_type,
            status,
            reason,
            None,
        ) {
            return Ok(false);
        }
        self.store.patch_status(object, &managed.status).await?;
        debug!(object = %object, condition = condition_type, status = %status, "Condition updated");
        Ok(true)
    }

    pub async fn get_condition(
        &self,
        object: &ObjectRef,
        condition_type: &str,
    ) -> Result<Option<Condition>, StoreError> {
        Ok(self
            .store
            .get(object)
            .await?
            .and_then(|o| o.status.condition(condition_type).cloned()))
    }

    /// Poll until `condition_type` has `desired`.
    ///
    /// Checks up to `max_wait_periods` times, sleeping `period` between
    /// checks. Returns false on exhaustion; store errors count as "not yet".
    pub async fn wait_on_condition(
        &self,
        object: &ObjectRef,
        condition_type: &str,
        desired: ConditionStatus,
        max_wait_periods: u32,
        period: Duration,
    ) -> bool {
        for attempt in 0..max_wait_periods {
            if let Ok(Some(condition)) = self.get_condition(object, condition_type).await {
                if condition.status == desired.as_str() {
                    return true;
                }
            }
            if attempt + 1 < max_wait_periods {
                tokio::time::sleep(period).await;
            }
        }
        false
    }

    /// Poll until the object is gone from the store
    pub async fn wait_until_deleted(
        &self,
        object: &ObjectRef,
        max_wait_periods: u32,
        period: Duration,
    ) -> bool {
        for attempt in 0..max_wait_periods {
            if let Ok(None) = self.store.get(object).await {
                return true;
            }
            if attempt + 1 < max_wait_periods {
                tokio::time::sleep(period).await;
            }
        }
        false
    }
}
