//! # Dependency Resolution
//!
//! Resolves `*Ref.from.name` references to the referent's remote id.
//!
//! The reference graph is walked depth-first so cycles are found even when
//! nothing in them has synced yet. A referent that is missing or not synced
//! makes the resolution [`Resolution::Pending`]; a cycle makes it
//! [`Resolution::Cyclic`]. Resolution only reads the store.

use crate::constants::CONDITION_RESOURCE_SYNCED;
use crate::controller::conditions::{has_condition, ConditionStatus};
use crate::crd::{ManagedObject, ObjectKey, ObjectRef, ResourceReference, SpecView};
use crate::descriptor::{
    DescriptorError, DescriptorRegistry, FieldMap, FieldValue, Identifiers, Slot,
};
use crate::store::{ObjectStore, StoreError};
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Values contributed by resolved references
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRefs {
    pub identifiers: Identifiers,
    pub fields: FieldMap,
}

impl ResolvedRefs {
    /// Merge resolved values into a spec view
    pub fn apply(self, view: &mut SpecView) {
        view.identifiers.extend(self.identifiers);
        view.fields.extend(self.fields);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedRefs),
    /// Referents that are missing or not yet synced
    Pending(Vec<ObjectRef>),
    /// Reference path that loops back on itself
    Cyclic(Vec<ObjectRef>),
}

/// Target of a declared reference, defaulting to the referrer's namespace
fn target_of(owner: &ObjectKey, reference: &ResourceReference) -> ObjectKey {
    ObjectKey {
        namespace: reference
            .from
            .namespace
            .clone()
            .unwrap_or_else(|| owner.namespace.clone()),
        name: reference.from.name.clone(),
    }
}

/// A referent is usable once it has a remote id and is synced
fn is_ready(object: &ManagedObject) -> bool {
    object.status.id.is_some()
        && !object.deletion_requested
        && has_condition(&object.status, CONDITION_RESOURCE_SYNCED, ConditionStatus::True)
}

#[derive(Clone)]
pub struct DependencyResolver {
    registry: DescriptorRegistry,
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl DependencyResolver {
    pub fn new(registry: DescriptorRegistry, store: Arc<dyn ObjectStore>) -> Self {
        Self { registry, store }
    }

    /// Resolve every reference declared in `view`
    pub async fn resolve(
        &self,
        object: &ManagedObject,
        view: &SpecView,
    ) -> Result<Resolution, ResolveError> {
        let root = object.object_ref();
        let mut stack = vec![root.clone()];
        let mut visited = BTreeSet::from([root]);
        if let Some(cycle) = self
            .find_cycle(object, view, &mut stack, &mut visited)
            .await?
        {
            return Ok(Resolution::Cyclic(cycle));
        }

        let descriptor = self.registry.get(object.kind)?;
        let mut resolved = ResolvedRefs::default();
        let mut pending = Vec::new();
        for (name, reference) in &view.references {
            let target_ref = ObjectRef {
                kind: descriptor.reference(name)?.target,
                key: target_of(&object.key, reference),
            };
            let target = self.store.get(&target_ref).await?;
            let Some(id) = target
                .filter(is_ready)
                .and_then(|t| t.status.id.clone())
            else {
                pending.push(target_ref);
                continue;
            };
            match descriptor.reference(name)?.slot {
                Slot::Identifier(key) => {
                    resolved.identifiers.insert(key.to_string(), id);
                }
                Slot::Field(path) => {
                    resolved.fields.insert(path.to_string(), FieldValue::Text(id));
                }
            }
        }

        if pending.is_empty() {
            Ok(Resolution::Resolved(resolved))
        } else {
            Ok(Resolution::Pending(pending))
        }
    }

    /// Depth-first walk returning the first reference path that revisits a node on the stack
    fn find_cycle<'a>(
        &'a self,
        object: &'a ManagedObject,
        view: &'a SpecView,
        stack: &'a mut Vec<ObjectRef>,
        visited: &'a mut BTreeSet<ObjectRef>,
    ) -> BoxFuture<'a, Result<Option<Vec<ObjectRef>>, ResolveError>> {
        Box::pin(async move {
            let descriptor = self.registry.get(object.kind)?;
            for (name, reference) in &view.references {
                let target_ref = ObjectRef {
                    kind: descriptor.reference(name)?.target,
                    key: target_of(&object.key, reference),
                };
                if let Some(position) = stack.iter().position(|r| *r == target_ref) {
                    let mut cycle = stack[position..].to_vec();
                    cycle.push(target_ref);
                    return Ok(Some(cycle));
                }
                if !visited.insert(target_ref.clone()) {
                    continue;
                }
                let Some(target) = self.store.get(&target_ref).await? else {
                    continue;
                };
                // An invalid referent spec surfaces when the referent itself reconciles
                let Ok(target_view) = target.spec.view() else {
                    continue;
                };
                stack.push(target_ref);
                let cycle = self
                    .find_cycle(&target, &target_view, stack, visited)
                    .await?;
                stack.pop();
                if cycle.is_some() {
                    return Ok(cycle);
                }
            }
            Ok(None)
        })
    }

    /// Live objects referencing `object`, by name or by raw remote id
    pub async fn dependents(&self, object: &ManagedObject) -> Result<Vec<ObjectRef>, ResolveError> {
        let mut dependents = Vec::new();
        let mut kinds: Vec<_> = self
            .registry
            .dependents_of(object.kind)
            .into_iter()
            .map(|(kind, _)| kind)
            .collect();
        kinds.dedup();

        for kind in kinds {
            let descriptor = self.registry.get(kind)?;
            for candidate in self.store.list(kind).await? {
                if candidate.object_ref() == object.object_ref() {
                    continue;
                }
                let Ok(view) = candidate.spec.view() else {
                    continue;
                };
                let by_name = view.references.iter().any(|(name, reference)| {
                    descriptor
                        .reference(name)
                        .is_ok_and(|r| r.target == object.kind)
                        && target_of(&candidate.key, reference) == object.key
                });
                let by_id = object.status.id.as_deref().is_some_and(|id| {
                    descriptor
                        .references
                        .iter()
                        .filter(|r| r.target == object.kind)
                        .any(|r| match r.slot {
                            Slot::Identifier(key) => {
                                view.identifiers.get(key).map(String::as_str) == Some(id)
                            }
                            Slot::Field(path) => {
                                view.fields.get(path).and_then(FieldValue::as_text) == Some(id)
                            }
                        })
                });
                if by_name || by_id {
                    dependents.push(candidate.object_ref());
                }
            }
        }
        Ok(dependents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::conditions::set_condition;
    use crate::crd::{GatewayResourceSpec, KindSpec, RestApiSpec};
    use crate::descriptor::Kind;
    use crate::store::InMemoryStore;

    fn resource(name: &str, rest_api: &str, parent: Option<&str>) -> KindSpec {
        KindSpec::Resource(GatewayResourceSpec {
            rest_api_ref: Some(ResourceReference::to(rest_api)),
            parent_ref: parent.map(ResourceReference::to),
            path_part: name.to_string(),
            ..Default::default()
        })
    }

    async fn mark_synced(store: &InMemoryStore, reference: &ObjectRef, id: &str) {
        let mut status = store.snapshot(reference).await.unwrap().status;
        status.id = Some(id.to_string());
        set_condition(
            &mut status.conditions,
            CONDITION_RESOURCE_SYNCED,
            ConditionStatus::True,
            "Synced",
            None,
        );
        store.patch_status(reference, &status).await.unwrap();
    }

    fn resolver(store: Arc<InMemoryStore>) -> DependencyResolver {
        DependencyResolver::new(DescriptorRegistry::default(), store)
    }

    #[tokio::test]
    async fn test_unsynced_referent_is_pending() {
        let store = Arc::new(InMemoryStore::new());
        store
            .apply(
                ObjectKey::new("default", "api"),
                KindSpec::RestApi(RestApiSpec {
                    name: "api".into(),
                    ..Default::default()
                }),
            )
            .await;
        store
            .apply(ObjectKey::new("default", "pets"), resource("pets", "api", None))
            .await;

        let pets = store
            .snapshot(&ObjectRef::new(Kind::Resource, "default", "pets"))
            .await
            .unwrap();
        let view = pets.spec.view().unwrap();
        let resolution = resolver(Arc::clone(&store)).resolve(&pets, &view).await.unwrap();
        assert_eq!(
            resolution,
            Resolution::Pending(vec![ObjectRef::new(Kind::RestApi, "default", "api")])
        );
    }

    #[tokio::test]
    async fn test_synced_referent_fills_slot() {
        let store = Arc::new(InMemoryStore::new());
        let api = ObjectRef::new(Kind::RestApi, "default", "api");
        store
            .apply(
                api.key.clone(),
                KindSpec::RestApi(RestApiSpec {
                    name: "api".into(),
                    ..Default::default()
                }),
            )
            .await;
        mark_synced(&store, &api, "a1b2c3").await;
        store
            .apply(ObjectKey::new("default", "pets"), resource("pets", "api", None))
            .await;

        let pets = store
            .snapshot(&ObjectRef::new(Kind::Resource, "default", "pets"))
            .await
            .unwrap();
        let mut view = pets.spec.view().unwrap();
        let Resolution::Resolved(refs) = resolver(Arc::clone(&store))
            .resolve(&pets, &view)
            .await
            .unwrap()
        else {
            panic!("expected resolved references");
        };
        refs.apply(&mut view);
        assert_eq!(view.identifiers.get("restApiId").unwrap(), "a1b2c3");
    }

    #[tokio::test]
    async fn test_cycle_is_reported() {
        let store = Arc::new(InMemoryStore::new());
        store
            .apply(ObjectKey::new("default", "a"), resource("a", "api", Some("b")))
            .await;
        store
            .apply(ObjectKey::new("default", "b"), resource("b", "api", Some("a")))
            .await;

        let a = store
            .snapshot(&ObjectRef::new(Kind::Resource, "default", "a"))
            .await
            .unwrap();
        let view = a.spec.view().unwrap();
        let resolution = resolver(Arc::clone(&store)).resolve(&a, &view).await.unwrap();
        let Resolution::Cyclic(path) = resolution else {
            panic!("expected a cycle, got {resolution:?}");
        };
        assert_eq!(
            path,
            vec![
                ObjectRef::new(Kind::Resource, "default", "a"),
                ObjectRef::new(Kind::Resource, "default", "b"),
                ObjectRef::new(Kind::Resource, "default", "a"),
            ]
        );
    }

    #[tokio::test]
    async fn test_dependents_by_name_and_by_id() {
        let store = Arc::new(InMemoryStore::new());
        let api = ObjectRef::new(Kind::RestApi, "default", "api");
        store
            .apply(
                api.key.clone(),
                KindSpec::RestApi(RestApiSpec {
                    name: "api".into(),
                    ..Default::default()
                }),
            )
            .await;
        mark_synced(&store, &api, "a1b2c3").await;
        store
            .apply(ObjectKey::new("default", "by-ref"), resource("pets", "api", None))
            .await;
        store
            .apply(
                ObjectKey::new("default", "by-id"),
                KindSpec::Resource(GatewayResourceSpec {
                    rest_api_id: Some("a1b2c3".into()),
                    parent_id: Some("root".into()),
                    path_part: "orders".into(),
                    ..Default::default()
                }),
            )
            .await;

        let api_object = store.snapshot(&api).await.unwrap();
        let dependents = resolver(Arc::clone(&store))
            .dependents(&api_object)
            .await
            .unwrap();
        assert_eq!(
            dependents,
            vec![
                ObjectRef::new(Kind::Resource, "default", "by-id"),
                ObjectRef::new(Kind::Resource, "default", "by-ref"),
            ]
        );
    }
}
