//! # Patch Sets
//!
//! API Gateway updates entities with a list of JSON-patch-like operations.
//! [`PatchSet`] accumulates them; [`PatchSet::for_slice`] and
//! [`PatchSet::for_map`] derive element-wise operations from current and
//! desired collections.

use paths::join;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatchOp::Add => "add",
            PatchOp::Remove => "remove",
            PatchOp::Replace => "replace",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Ordered set of patch operations for one update call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    operations: Vec<PatchOperation>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<PatchOperation> {
        self.operations
    }

    fn push(&mut self, op: PatchOp, path: String, value: Option<String>) {
        self.operations.push(PatchOperation { op, path, value });
    }

    pub fn replace(&mut self, path: &str, value: Option<String>) {
        self.push(PatchOp::Replace, path.to_string(), value);
    }

    pub fn add(&mut self, path: &str, value: Option<String>) {
        self.push(PatchOp::Add, path.to_string(), value);
    }

    pub fn remove(&mut self, path: &str) {
        self.push(PatchOp::Remove, path.to_string(), None);
    }

    /// `remove` carrying the element to drop, for lists addressed by value
    /// (authorizer `providerARNs`)
    pub fn remove_with_value(&mut self, path: &str, value: &str) {
        self.push(PatchOp::Remove, path.to_string(), Some(value.to_string()));
    }

    /// Remove elements no longer desired, then add new ones, each at `path/<element>`
    pub fn for_slice(&mut self, path: &str, current: &[String], desired: &[String]) {
        for value in current.iter().filter(|v| !desired.contains(v)) {
            self.push(PatchOp::Remove, join(path, value), None);
        }
        for value in desired.iter().filter(|v| !current.contains(v)) {
            self.push(PatchOp::Add, join(path, value), None);
        }
    }

    /// Like [`PatchSet::for_slice`] but with elements carried as values on `path` itself
    pub fn for_value_slice(&mut self, path: &str, current: &[String], desired: &[String]) {
        for value in current.iter().filter(|v| !desired.contains(v)) {
            self.remove_with_value(path, value);
        }
        for value in desired.iter().filter(|v| !current.contains(v)) {
            self.add(path, Some(value.clone()));
        }
    }

    /// Remove keys no longer desired, then write every desired key.
    ///
    /// Desired keys are replaced, or added when the key is new and the
    /// target supports `add`.
    pub fn for_map(
        &mut self,
        path: &str,
        current: &BTreeMap<String, String>,
        desired: &BTreeMap<String, String>,
        add_supported: bool,
    ) {
        for key in current.keys().filter(|k| !desired.contains_key(*k)) {
            self.push(PatchOp::Remove, join(path, key), None);
        }
        for (key, value) in desired {
            let op = if add_supported && !current.contains_key(key) {
                PatchOp::Add
            } else {
                PatchOp::Replace
            };
            self.push(op, join(path, key), Some(value.clone()));
        }
    }
}
