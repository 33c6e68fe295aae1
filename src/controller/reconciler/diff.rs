//! # Field Diff
//!
//! Turns desired vs remote field maps into a minimal [`PatchSet`].
//!
//! Patchable fields are compared against what the remote reports. A field the
//! user removed from the spec is only cleared when it was written by the
//! controller before (`last_applied`), so remote defaults the user never set
//! are left alone. Immutable fields are compared against `last_applied`
//! because the remote does not echo all of them back. A section the spec no
//! longer sets at all is removed with a single operation on its root path.

use crate::descriptor::{FieldMap, FieldShape, FieldValue, KindDescriptor, Mutability};
use crate::provider::PatchSet;
use std::collections::BTreeMap;

/// Immutable fields whose desired value differs from the one last applied
pub fn immutable_changes(
    descriptor: &KindDescriptor,
    desired: &FieldMap,
    remote: &FieldMap,
    last_applied: Option<&FieldMap>,
) -> Vec<&'static str> {
    let baseline = last_applied.unwrap_or(remote);
    descriptor
        .fields
        .iter()
        .filter(|f| f.mutability == Mutability::Immutable)
        .filter(|f| !same(desired.get(f.path), baseline.get(f.path)))
        .map(|f| f.path)
        .collect()
}

fn same(a: Option<&FieldValue>, b: Option<&FieldValue>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.equivalent(b),
        (None, None) => true,
        (Some(v), None) | (None, Some(v)) => is_empty(v),
    }
}

fn is_empty(value: &FieldValue) -> bool {
    match value {
        FieldValue::List(values) => values.is_empty(),
        FieldValue::Map(map) => map.is_empty(),
        _ => false,
    }
}

/// Patch operations bringing the remote entity's patchable fields to `desired`
pub fn compute_patch(
    descriptor: &KindDescriptor,
    desired: &FieldMap,
    remote: &FieldMap,
    last_applied: Option<&FieldMap>,
) -> PatchSet {
    let mut patch = PatchSet::new();
    let empty_map = BTreeMap::new();

    let sets_section = |fields: &FieldMap, section: &str| {
        fields
            .keys()
            .any(|path| descriptor.section_of(path) == Some(section))
    };
    let removed: Vec<&str> = descriptor
        .sections
        .iter()
        .copied()
        .filter(|section| !sets_section(desired, section) && sets_section(remote, section))
        .collect();
    for section in &removed {
        patch.remove(section);
    }

    for field in descriptor
        .fields
        .iter()
        .filter(|f| f.mutability == Mutability::Patchable)
        .filter(|f| {
            descriptor
                .section_of(f.path)
                .is_none_or(|section| !removed.contains(&section))
        })
    {
        let want = desired.get(field.path);
        let have = remote.get(field.path);
        let previously_applied = last_applied.is_some_and(|l| l.contains_key(field.path));

        match field.shape {
            FieldShape::Scalar => match (want, have) {
                (Some(want), Some(have)) if want.equivalent(have) => {}
                (Some(want), _) => patch.replace(field.path, want.to_patch_value()),
                (None, Some(_)) if previously_applied => patch.replace(field.path, None),
                (None, _) => {}
            },
            FieldShape::List => {
                let want = want.map_or(&[][..], FieldValue::as_list);
                let have = have.map_or(&[][..], FieldValue::as_list);
                if want.is_empty() && !previously_applied {
                    continue;
                }
                patch.for_slice(field.path, have, want);
            }
            FieldShape::ValueList => {
                let want = want.map_or(&[][..], FieldValue::as_list);
                let have = have.map_or(&[][..], FieldValue::as_list);
                if want.is_empty() && !previously_applied {
                    continue;
                }
                patch.for_value_slice(field.path, have, want);
            }
            FieldShape::Map { add_supported } => {
                let want_map = want.and_then(FieldValue::as_map).unwrap_or(&empty_map);
                let have_map = have.and_then(FieldValue::as_map).unwrap_or(&empty_map);
                if want_map == have_map || (want_map.is_empty() && !previously_applied) {
                    continue;
                }
                patch.for_map(field.path, have_map, want_map, add_supported);
            }
        }
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DescriptorRegistry, Kind};
    use crate::provider::PatchOp;

    fn fields(pairs: &[(&str, FieldValue)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(value: &str) -> FieldValue {
        FieldValue::Text(value.to_string())
    }

    #[test]
    fn test_equal_maps_produce_no_patch() {
        let registry = DescriptorRegistry::default();
        let descriptor = registry.get(Kind::RestApi).unwrap();
        let desired = fields(&[("/name", text("orders")), ("/apiKeySource", text("HEADER"))]);
        let patch = compute_patch(descriptor, &desired, &desired, Some(&desired));
        assert!(patch.is_empty());
    }

    #[test]
    fn test_scalar_change_is_replaced() {
        let registry = DescriptorRegistry::default();
        let descriptor = registry.get(Kind::RestApi).unwrap();
        let desired = fields(&[("/name", text("orders")), ("/description", text("v2"))]);
        let remote = fields(&[("/name", text("orders")), ("/description", text("v1"))]);
        let patch = compute_patch(descriptor, &desired, &remote, None);
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.operations()[0].op, PatchOp::Replace);
        assert_eq!(patch.operations()[0].path, "/description");
        assert_eq!(patch.operations()[0].value.as_deref(), Some("v2"));
    }

    #[test]
    fn test_bool_text_equivalence() {
        let registry = DescriptorRegistry::default();
        let descriptor = registry.get(Kind::RestApi).unwrap();
        let desired = fields(&[("/disableExecuteApiEndpoint", FieldValue::Bool(false))]);
        let remote = fields(&[("/disableExecuteApiEndpoint", text("false"))]);
        assert!(compute_patch(descriptor, &desired, &remote, None).is_empty());
    }

    #[test]
    fn test_removed_field_cleared_only_when_previously_applied() {
        let registry = DescriptorRegistry::default();
        let descriptor = registry.get(Kind::RestApi).unwrap();
        let desired = fields(&[("/name", text("orders"))]);
        let remote = fields(&[("/name", text("orders")), ("/description", text("old"))]);

        assert!(compute_patch(descriptor, &desired, &remote, Some(&desired)).is_empty());

        let applied = fields(&[("/name", text("orders")), ("/description", text("old"))]);
        let patch = compute_patch(descriptor, &desired, &remote, Some(&applied));
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.operations()[0].path, "/description");
        assert_eq!(patch.operations()[0].value, None);
    }

    #[test]
    fn test_map_without_add_uses_replace() {
        let registry = DescriptorRegistry::default();
        let descriptor = registry.get(Kind::Stage).unwrap();
        let desired = fields(&[(
            "/variables",
            FieldValue::Map(BTreeMap::from([("env".to_string(), "prod".to_string())])),
        )]);
        let remote = fields(&[(
            "/variables",
            FieldValue::Map(BTreeMap::from([("tier".to_string(), "gold".to_string())])),
        )]);
        let patch = compute_patch(descriptor, &desired, &remote, None);
        let ops: Vec<_> = patch
            .operations()
            .iter()
            .map(|o| (o.op, o.path.as_str()))
            .collect();
        assert_eq!(
            ops,
            [
                (PatchOp::Remove, "/variables/tier"),
                (PatchOp::Replace, "/variables/env")
            ]
        );
    }

    #[test]
    fn test_canary_section_patched_per_field() {
        let registry = DescriptorRegistry::default();
        let descriptor = registry.get(Kind::Stage).unwrap();
        let desired = fields(&[
            ("/canarySettings/percentTraffic", text("10.1")),
            (
                "/canarySettings/stageVariableOverrides",
                FieldValue::Map(BTreeMap::from([("v1".to_string(), "k1".to_string())])),
            ),
        ]);
        let remote = fields(&[
            ("/canarySettings/percentTraffic", text("5")),
            ("/canarySettings/useStageCache", FieldValue::Bool(false)),
        ]);
        let patch = compute_patch(descriptor, &desired, &remote, None);
        let ops: Vec<_> = patch
            .operations()
            .iter()
            .map(|o| (o.op, o.path.as_str(), o.value.as_deref()))
            .collect();
        assert_eq!(
            ops,
            [
                (PatchOp::Replace, "/canarySettings/percentTraffic", Some("10.1")),
                (
                    PatchOp::Replace,
                    "/canarySettings/stageVariableOverrides/v1",
                    Some("k1")
                ),
            ]
        );
    }

    #[test]
    fn test_unset_canary_section_is_removed_whole() {
        let registry = DescriptorRegistry::default();
        let descriptor = registry.get(Kind::Stage).unwrap();
        let desired = fields(&[("/description", text("prod"))]);
        let remote = fields(&[
            ("/description", text("prod")),
            ("/canarySettings/percentTraffic", text("10")),
            (
                "/canarySettings/stageVariableOverrides",
                FieldValue::Map(BTreeMap::from([("v1".to_string(), "k1".to_string())])),
            ),
        ]);
        let patch = compute_patch(descriptor, &desired, &remote, Some(&remote));
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.operations()[0].op, PatchOp::Remove);
        assert_eq!(patch.operations()[0].path, "/canarySettings");

        let without_canary = fields(&[("/description", text("prod"))]);
        assert!(compute_patch(descriptor, &desired, &without_canary, None).is_empty());
    }

    #[test]
    fn test_immutable_change_detected_against_last_applied() {
        let registry = DescriptorRegistry::default();
        let descriptor = registry.get(Kind::Integration).unwrap();
        let applied = fields(&[("/type", text("MOCK"))]);
        let desired = fields(&[("/type", text("HTTP"))]);
        // remote echo is ignored once something was applied
        let remote = fields(&[("/type", text("HTTP"))]);
        assert_eq!(
            immutable_changes(descriptor, &desired, &remote, Some(&applied)),
            ["/type"]
        );
        assert!(immutable_changes(descriptor, &applied, &remote, Some(&applied)).is_empty());
    }
}
