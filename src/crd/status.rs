//! # API Gateway Resource Status
//!
//! Status shared by every API Gateway custom resource: the remote identity,
//! remote-only attributes, the last applied field map, and conditions.

use crate::descriptor::FieldMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of an API Gateway custom resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    /// Primary remote identifier (REST API id, resource id, stage name, HTTP method...)
    #[serde(default)]
    pub id: Option<String>,
    /// Full composite remote key, e.g. restApiId + resourceId + httpMethod
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub key: BTreeMap<String, String>,
    /// ARN of taggable entities
    #[serde(default)]
    pub arn: Option<String>,
    /// Remote-only read-only attributes (rootResourceId, path, status...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub remote: BTreeMap<String, String>,
    /// Field map written to the remote entity by the last successful create/update
    #[serde(default)]
    pub last_applied: Option<FieldMap>,
    /// Lifecycle phase
    /// Values: Pending, Creating, Synced, Updating, Terminal, Deleting, Deleted
    #[serde(default)]
    pub phase: Option<String>,
    /// Generation last acted upon
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Time the remote entity was created by this controller (RFC3339)
    /// Bounds the eventual-consistency window after create
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last reconciliation time (RFC3339)
    #[serde(default)]
    pub last_reconciled: Option<String>,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl ResourceStatus {
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == condition_type)
    }
}
