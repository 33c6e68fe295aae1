//! # Tags
//!
//! Tag ownership rules. Keys carrying the system prefix belong to the
//! controller: they are written on create, never removed, and user tags
//! using the prefix are ignored. Everything else is owned by the spec.

use crate::constants::{DEFAULT_SYSTEM_TAG_PREFIX, MANAGED_BY};
use crate::crd::ObjectKey;
use std::collections::BTreeMap;

/// Tag changes for one update call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    /// Tags to add or overwrite
    pub set: BTreeMap<String, String>,
    /// Keys to untag
    pub remove: Vec<String>,
}

impl TagDelta {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }

    pub fn apply(&self, tags: &mut BTreeMap<String, String>) {
        for key in &self.remove {
            tags.remove(key);
        }
        tags.extend(self.set.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPolicy {
    prefix: String,
}

impl Default for TagPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_TAG_PREFIX)
    }
}

impl TagPolicy {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_system(&self, key: &str) -> bool {
        key.starts_with(&self.prefix)
    }

    /// Ownership tags written on every entity this controller creates
    pub fn system_tags(&self, owner: &ObjectKey) -> BTreeMap<String, String> {
        BTreeMap::from([
            (format!("{}managed-by", self.prefix), MANAGED_BY.to_string()),
            (format!("{}namespace", self.prefix), owner.namespace.clone()),
            (format!("{}name", self.prefix), owner.name.clone()),
        ])
    }

    /// Spec tags with system-prefixed keys dropped
    pub fn user_tags(&self, desired: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        desired
            .iter()
            .filter(|(k, _)| !self.is_system(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Full tag set for a create call
    pub fn create_tags(
        &self,
        owner: &ObjectKey,
        desired: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let mut tags = self.user_tags(desired);
        tags.extend(self.system_tags(owner));
        tags
    }

    /// Changes that bring `current` to the spec's user tags, leaving system tags alone
    pub fn compute_delta(
        &self,
        current: &BTreeMap<String, String>,
        desired: &BTreeMap<String, String>,
    ) -> TagDelta {
        let desired = self.user_tags(desired);
        let remove = current
            .keys()
            .filter(|k| !self.is_system(k) && !desired.contains_key(*k))
            .cloned()
            .collect();
        let set = desired
            .into_iter()
            .filter(|(k, v)| current.get(k) != Some(v))
            .collect();
        TagDelta { set, remove }
    }
}
