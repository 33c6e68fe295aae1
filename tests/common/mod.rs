//! Shared fixtures: a reconciler wired to the in-memory store and gateway.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use apigateway_controller::controller::conditions::has_condition;
use apigateway_controller::controller::{
    ConditionStatus, ReconcileOutcome, Reconciler, ReconcilerSettings,
};
use apigateway_controller::crd::{
    GatewayDeploymentSpec, KindSpec, ObjectKey, ObjectRef, ResourceReference, ResourceStatus,
    RestApiSpec, StageSpec,
};
use apigateway_controller::descriptor::DescriptorRegistry;
use apigateway_controller::provider::memory::InMemoryGateway;
use apigateway_controller::provider::{RemoteClient, TagPolicy};
use apigateway_controller::store::{InMemoryStore, ObjectStore};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const NAMESPACE: &str = "default";

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<InMemoryGateway>,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(InMemoryGateway::default(), ReconcilerSettings::default())
    }

    pub fn build(gateway: InMemoryGateway, settings: ReconcilerSettings) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(gateway);
        let store_dyn: Arc<dyn ObjectStore> = Arc::clone(&store) as Arc<dyn ObjectStore>;
        let remote: Arc<dyn RemoteClient> = Arc::clone(&gateway) as Arc<dyn RemoteClient>;
        let reconciler = Reconciler::new(
            DescriptorRegistry::default(),
            store_dyn,
            remote,
            TagPolicy::default(),
            settings,
        );
        Self {
            store,
            gateway,
            reconciler,
        }
    }

    /// Create or update a custom resource
    pub async fn apply(&self, name: &str, spec: KindSpec) -> ObjectRef {
        let kind = spec.kind();
        self.store.apply(ObjectKey::new(NAMESPACE, name), spec).await;
        ObjectRef::new(kind, NAMESPACE, name)
    }

    pub async fn reconcile(&self, object: &ObjectRef) -> ReconcileOutcome {
        self.reconciler
            .reconcile(object)
            .await
            .expect("reconcile should not hit a store error")
    }

    /// Reconcile `objects` in order until each one reports Synced
    pub async fn settle(&self, objects: &[&ObjectRef]) {
        for _ in 0..objects.len() + 1 {
            let mut all_synced = true;
            for object in objects {
                if self.reconcile(object).await != ReconcileOutcome::Synced {
                    all_synced = false;
                }
            }
            if all_synced {
                return;
            }
        }
        panic!("objects did not settle: {objects:?}");
    }

    pub async fn status(&self, object: &ObjectRef) -> ResourceStatus {
        self.store
            .snapshot(object)
            .await
            .expect("object should exist")
            .status
    }

    pub async fn has_condition(
        &self,
        object: &ObjectRef,
        condition_type: &str,
        expected: ConditionStatus,
    ) -> bool {
        has_condition(&self.status(object).await, condition_type, expected)
    }

    pub async fn remote_id(&self, object: &ObjectRef) -> String {
        self.status(object).await.id.expect("object should have a remote id")
    }

    /// Remote `rootResourceId` of a synced RestAPI
    pub async fn root_resource_id(&self, rest_api: &ObjectRef) -> String {
        self.status(rest_api)
            .await
            .remote
            .get("rootResourceId")
            .cloned()
            .expect("rest api should record its root resource id")
    }
}

pub fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn rest_api(name: &str) -> RestApiSpec {
    RestApiSpec {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn deployment(rest_api: &str) -> GatewayDeploymentSpec {
    GatewayDeploymentSpec {
        rest_api_ref: Some(ResourceReference::to(rest_api)),
        description: Some("first deployment".to_string()),
        ..Default::default()
    }
}

pub fn stage(rest_api: &str, deployment: &str, stage_name: &str) -> StageSpec {
    StageSpec {
        rest_api_ref: Some(ResourceReference::to(rest_api)),
        deployment_ref: Some(ResourceReference::to(deployment)),
        stage_name: stage_name.to_string(),
        ..Default::default()
    }
}
