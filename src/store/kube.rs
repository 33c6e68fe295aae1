//! # Kube Store
//!
//! [`ObjectStore`] over the Kubernetes API. Status is written with a merge
//! patch on the status subresource, diffed against the stored status so that
//! fields and map keys no longer present are sent as `null` and removed. The
//! finalizer is added and removed with merge patches on `metadata.finalizers`.

use super::{ObjectStore, StoreError};
use crate::constants::{FIELD_MANAGER, FINALIZER};
use crate::crd::{
    ApiKey, Authorizer, GatewayDeployment, GatewayObject, GatewayResource, Integration,
    IntegrationResponse, ManagedObject, Method, MethodResponse, ObjectRef, ResourceStatus,
    RestAPI, Stage, VpcLink,
};
use crate::descriptor::Kind;
use async_trait::async_trait;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Run `$body` with `$ty` bound to the typed custom resource of `$kind`
macro_rules! for_kind {
    ($kind:expr, $ty:ident => $body:expr) => {
        match $kind {
            Kind::RestApi => {
                type $ty = RestAPI;
                $body
            }
            Kind::Resource => {
                type $ty = GatewayResource;
                $body
            }
            Kind::Method => {
                type $ty = Method;
                $body
            }
            Kind::MethodResponse => {
                type $ty = MethodResponse;
                $body
            }
            Kind::Integration => {
                type $ty = Integration;
                $body
            }
            Kind::IntegrationResponse => {
                type $ty = IntegrationResponse;
                $body
            }
            Kind::Deployment => {
                type $ty = GatewayDeployment;
                $body
            }
            Kind::Stage => {
                type $ty = Stage;
                $body
            }
            Kind::Authorizer => {
                type $ty = Authorizer;
                $body
            }
            Kind::ApiKey => {
                type $ty = ApiKey;
                $body
            }
            Kind::VpcLink => {
                type $ty = VpcLink;
                $body
            }
        }
    };
}

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    /// Restrict `list` to one namespace
    namespace: Option<String>,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    fn api<T: GatewayObject>(&self, namespace: &str) -> Api<T> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_typed<T: GatewayObject>(
        &self,
        object: &ObjectRef,
    ) -> Result<Option<ManagedObject>, StoreError> {
        let api = self.api::<T>(&object.key.namespace);
        Ok(api.get_opt(&object.key.name).await?.map(|o| o.to_managed()))
    }

    async fn list_typed<T: GatewayObject>(&self) -> Result<Vec<ManagedObject>, StoreError> {
        let api: Api<T> = match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(GatewayObject::to_managed).collect())
    }

    async fn patch_status_typed<T: GatewayObject>(
        &self,
        object: &ObjectRef,
        status: &ResourceStatus,
    ) -> Result<(), StoreError> {
        let api = self.api::<T>(&object.key.namespace);
        let previous = match api.get_opt(&object.key.name).await? {
            Some(current) => serde_json::to_value(current.to_managed().status)?,
            None => Value::Null,
        };
        let desired = serde_json::to_value(status)?;
        let patch = json!({ "status": merge_patch(&previous, &desired) });
        api.patch_status(
            &object.key.name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }

    async fn set_finalizer_typed<T: GatewayObject>(
        &self,
        object: &ObjectRef,
        present: bool,
    ) -> Result<(), StoreError> {
        let api = self.api::<T>(&object.key.namespace);
        let Some(current) = api.get_opt(&object.key.name).await? else {
            return Ok(());
        };

        let mut finalizers: Vec<String> = current.finalizers().to_vec();
        let has_finalizer = finalizers.iter().any(|f| f == FINALIZER);
        if has_finalizer == present {
            return Ok(());
        }
        if present {
            finalizers.push(FINALIZER.to_string());
        } else {
            finalizers.retain(|f| f != FINALIZER);
        }

        let patch = if finalizers.is_empty() {
            json!({ "metadata": { "finalizers": null } })
        } else {
            json!({ "metadata": { "finalizers": finalizers } })
        };
        api.patch(
            &object.key.name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        debug!(
            kind = %object.kind,
            namespace = %object.key.namespace,
            name = %object.key.name,
            present,
            "Updated finalizer"
        );
        Ok(())
    }
}

/// JSON merge patch turning `previous` into `desired`.
///
/// Keys missing from `desired` become `null`; arrays and scalars are replaced
/// whole.
fn merge_patch(previous: &Value, desired: &Value) -> Value {
    let (Value::Object(previous), Value::Object(desired)) = (previous, desired) else {
        return desired.clone();
    };
    let mut patch = Map::new();
    for (key, value) in desired {
        match previous.get(key) {
            Some(old) if old == value => {}
            Some(old) => {
                patch.insert(key.clone(), merge_patch(old, value));
            }
            None => {
                patch.insert(key.clone(), value.clone());
            }
        }
    }
    for key in previous.keys() {
        if !desired.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }
    Value::Object(patch)
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, object: &ObjectRef) -> Result<Option<ManagedObject>, StoreError> {
        for_kind!(object.kind, T => self.get_typed::<T>(object).await)
    }

    async fn list(&self, kind: Kind) -> Result<Vec<ManagedObject>, StoreError> {
        for_kind!(kind, T => self.list_typed::<T>().await)
    }

    async fn patch_status(
        &self,
        object: &ObjectRef,
        status: &ResourceStatus,
    ) -> Result<(), StoreError> {
        for_kind!(object.kind, T => self.patch_status_typed::<T>(object, status).await)
    }

    async fn ensure_finalizer(&self, object: &ObjectRef) -> Result<(), StoreError> {
        for_kind!(object.kind, T => self.set_finalizer_typed::<T>(object, true).await)
    }

    async fn release(&self, object: &ObjectRef) -> Result<(), StoreError> {
        for_kind!(object.kind, T => self.set_finalizer_typed::<T>(object, false).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldValue;
    use std::collections::BTreeMap;

    /// Server-side merge patch application
    fn apply(target: &Value, patch: &Value) -> Value {
        let Value::Object(patch) = patch else {
            return patch.clone();
        };
        let mut result = match target {
            Value::Object(target) => target.clone(),
            _ => Map::new(),
        };
        for (key, value) in patch {
            if value.is_null() {
                result.remove(key);
            } else {
                let merged = apply(result.get(key).unwrap_or(&Value::Null), value);
                result.insert(key.clone(), merged);
            }
        }
        Value::Object(result)
    }

    fn populated() -> ResourceStatus {
        ResourceStatus {
            id: Some("abc123".into()),
            key: BTreeMap::from([("restApiId".to_string(), "abc123".to_string())]),
            remote: BTreeMap::from([
                ("rootResourceId".to_string(), "root1".to_string()),
                ("createdDate".to_string(), "2024-01-01".to_string()),
            ]),
            phase: Some("Synced".into()),
            observed_generation: Some(2),
            ..Default::default()
        }
    }

    #[test]
    fn test_cleared_status_removes_key_and_remote() {
        let previous = serde_json::to_value(populated()).unwrap();
        let cleared = ResourceStatus {
            phase: Some("Pending".into()),
            observed_generation: Some(2),
            ..Default::default()
        };
        let desired = serde_json::to_value(&cleared).unwrap();

        let patch = merge_patch(&previous, &desired);
        assert_eq!(patch["key"], Value::Null);
        assert_eq!(patch["remote"], Value::Null);
        assert_eq!(patch["id"], Value::Null);
        assert!(patch.get("observedGeneration").is_none());

        let stored: ResourceStatus = serde_json::from_value(apply(&previous, &patch)).unwrap();
        assert_eq!(stored, cleared);
    }

    #[test]
    fn test_shrinking_maps_drop_removed_entries() {
        let mut before = populated();
        before.last_applied = Some(BTreeMap::from([
            ("/description".to_string(), FieldValue::from("old")),
            ("/tags".to_string(), FieldValue::from("x")),
        ]));
        let mut after = before.clone();
        after.remote.remove("createdDate");
        after.last_applied = Some(BTreeMap::from([(
            "/description".to_string(),
            FieldValue::from("new"),
        )]));

        let previous = serde_json::to_value(&before).unwrap();
        let patch = merge_patch(&previous, &serde_json::to_value(&after).unwrap());
        assert_eq!(patch["remote"], json!({ "createdDate": null }));
        assert_eq!(patch["lastApplied"]["/tags"], Value::Null);
        assert!(patch.get("key").is_none());

        let stored: ResourceStatus = serde_json::from_value(apply(&previous, &patch)).unwrap();
        assert_eq!(stored, after);
    }
}
