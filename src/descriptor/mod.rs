//! # Resource Descriptor
//!
//! Static description of every managed kind's remote-API shape:
//!
//! - spec fields with their patch path, mutability and shape
//! - the identifying key used for remote lookups
//! - reference fields and the kind each one points at
//! - read-only remote fields copied into status
//!
//! Descriptors are pure data. The reconciler, resolver and remote adapters
//! consult them; nothing here performs I/O.

mod field;
mod kind;
mod tables;

pub use field::{bool_map, put, FieldMap, FieldValue, Identifiers};
pub use kind::Kind;

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("unknown kind `{0}`")]
    UnknownKind(String),

    #[error("kind {kind} has no reference field `{field}`")]
    UnknownReference { kind: Kind, field: String },
}

/// Whether a field can be changed in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Patchable,
    /// Changing the value requires deleting and recreating the remote entity
    Immutable,
}

/// How a field is patched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Single value, patched with `replace`
    Scalar,
    /// Set of strings, patched per element at `path/<value>`
    List,
    /// Set of strings, patched with `remove`/`add` carrying the element as value
    ValueList,
    /// String map, patched per key at `path/<key>`
    Map { add_supported: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub path: &'static str,
    pub mutability: Mutability,
    pub shape: FieldShape,
}

/// Where a key component comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Supplied by the spec (directly or through a reference)
    Identifier,
    /// Assigned by the remote API on create
    Assigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPart {
    pub name: &'static str,
    pub source: KeySource,
}

/// Where a resolved reference lands in the desired state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Identifier(&'static str),
    Field(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceDescriptor {
    /// Spec field holding the reference (`restAPIRef`)
    pub name: &'static str,
    pub target: Kind,
    pub slot: Slot,
}

/// Read-only remote states in which the entity must not be modified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyGuard {
    pub field: &'static str,
    pub states: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct KindDescriptor {
    pub kind: Kind,
    pub fields: &'static [FieldDescriptor],
    pub key: &'static [KeyPart],
    pub references: &'static [ReferenceDescriptor],
    /// Remote-only attributes mirrored into `status.remote`
    pub read_only: &'static [&'static str],
    pub taggable: bool,
    /// Remote create conflicts mean "already exists" and the entity can be adopted
    pub name_unique: bool,
    /// Nested objects removed as a whole once none of their fields are desired
    pub sections: &'static [&'static str],
    pub busy: Option<BusyGuard>,
}

impl KindDescriptor {
    pub fn field(&self, path: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.path == path)
    }

    pub fn reference(&self, name: &str) -> Result<&'static ReferenceDescriptor, DescriptorError> {
        self.references
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| DescriptorError::UnknownReference {
                kind: self.kind,
                field: name.to_string(),
            })
    }

    /// Key component assigned by the remote API, if any
    pub fn assigned_key(&self) -> Option<&'static str> {
        self.key
            .iter()
            .find(|part| part.source == KeySource::Assigned)
            .map(|part| part.name)
    }

    /// Last key component, reported as `status.id`
    pub fn primary_key(&self) -> &'static str {
        self.key.last().map_or("id", |part| part.name)
    }

    /// Section containing `path`, if any
    pub fn section_of(&self, path: &str) -> Option<&'static str> {
        self.sections.iter().copied().find(|section| {
            path.strip_prefix(section)
                .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn is_immutable(&self, path: &str) -> bool {
        self.field(path)
            .is_some_and(|f| f.mutability == Mutability::Immutable)
    }
}

/// Registry mapping kind → descriptor
#[derive(Debug, Clone)]
pub struct DescriptorRegistry {
    descriptors: HashMap<Kind, &'static KindDescriptor>,
}

impl Default for DescriptorRegistry {
    fn default() -> Self {
        Self::with_kinds(&Kind::ALL)
    }
}

impl DescriptorRegistry {
    /// Registry limited to `kinds`
    pub fn with_kinds(kinds: &[Kind]) -> Self {
        Self {
            descriptors: kinds
                .iter()
                .map(|kind| (*kind, tables::descriptor_for(*kind)))
                .collect(),
        }
    }

    pub fn get(&self, kind: Kind) -> Result<&'static KindDescriptor, DescriptorError> {
        self.descriptors
            .get(&kind)
            .copied()
            .ok_or_else(|| DescriptorError::UnknownKind(kind.to_string()))
    }

    /// Look up a descriptor by manifest kind name
    pub fn get_by_name(&self, name: &str) -> Result<&'static KindDescriptor, DescriptorError> {
        self.get(name.parse()?)
    }

    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        self.descriptors.keys().copied()
    }

    /// Kinds holding a reference to `target`, with the reference descriptors involved
    pub fn dependents_of(&self, target: Kind) -> Vec<(Kind, &'static ReferenceDescriptor)> {
        let mut dependents: Vec<_> = self
            .descriptors
            .values()
            .flat_map(|descriptor| {
                descriptor
                    .references
                    .iter()
                    .filter(move |r| r.target == target)
                    .map(move |r| (descriptor.kind, r))
            })
            .collect();
        dependents.sort_by_key(|(kind, r)| (*kind, r.name));
        dependents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_is_registered_by_default() {
        let registry = DescriptorRegistry::default();
        for kind in Kind::ALL {
            assert_eq!(registry.get(kind).unwrap().kind, kind);
        }
    }

    #[test]
    fn test_unregistered_kind_fails() {
        let registry = DescriptorRegistry::with_kinds(&[Kind::RestApi]);
        assert_eq!(
            registry.get(Kind::Stage).unwrap_err(),
            DescriptorError::UnknownKind("Stage".to_string())
        );
        assert!(matches!(
            registry.get_by_name("Widget"),
            Err(DescriptorError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_method_key_is_composite() {
        let registry = DescriptorRegistry::default();
        let method = registry.get(Kind::Method).unwrap();
        let names: Vec<_> = method.key.iter().map(|p| p.name).collect();
        assert_eq!(names, ["restApiId", "resourceId", "httpMethod"]);
        assert_eq!(method.assigned_key(), None);
        assert_eq!(method.primary_key(), "httpMethod");
    }

    #[test]
    fn test_rest_api_id_is_assigned() {
        let registry = DescriptorRegistry::default();
        let rest_api = registry.get(Kind::RestApi).unwrap();
        assert_eq!(rest_api.assigned_key(), Some("restApiId"));
        assert!(rest_api.read_only.contains(&"rootResourceId"));
        assert!(rest_api.taggable);
    }

    #[test]
    fn test_immutable_and_patchable_fields() {
        let registry = DescriptorRegistry::default();
        let integration = registry.get(Kind::Integration).unwrap();
        assert!(integration.is_immutable("/type"));
        assert!(!integration.is_immutable("/uri"));
        let vpc_link = registry.get(Kind::VpcLink).unwrap();
        assert!(vpc_link.is_immutable("/targetArns"));
    }

    #[test]
    fn test_canary_settings_form_a_section() {
        let registry = DescriptorRegistry::default();
        let stage = registry.get(Kind::Stage).unwrap();
        assert_eq!(
            stage.section_of("/canarySettings/percentTraffic"),
            Some("/canarySettings")
        );
        assert_eq!(stage.section_of("/canarySettingsOld"), None);
        assert_eq!(stage.section_of("/variables"), None);
        let deployment = registry.get(Kind::Deployment).unwrap();
        assert!(deployment.is_immutable("/canarySettings/percentTraffic"));
    }

    #[test]
    fn test_references_have_target_kinds() {
        let registry = DescriptorRegistry::default();
        let stage = registry.get(Kind::Stage).unwrap();
        assert_eq!(stage.reference("deploymentRef").unwrap().target, Kind::Deployment);
        assert_eq!(stage.reference("restAPIRef").unwrap().target, Kind::RestApi);
        assert!(stage.reference("resourceRef").is_err());
    }

    #[test]
    fn test_dependents_of_rest_api() {
        let registry = DescriptorRegistry::default();
        let kinds: Vec<Kind> = registry
            .dependents_of(Kind::RestApi)
            .into_iter()
            .map(|(kind, _)| kind)
            .collect();
        assert!(kinds.contains(&Kind::Resource));
        assert!(kinds.contains(&Kind::Stage));
        assert!(!kinds.contains(&Kind::ApiKey));
        assert!(!kinds.contains(&Kind::VpcLink));
    }
}
