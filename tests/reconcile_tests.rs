//! Reconcile passes against the in-memory store and gateway.

mod common;

use apigateway_controller::constants::{
    CONDITION_REFERENCES_RESOLVED, CONDITION_RESOURCE_SYNCED, CONDITION_TERMINAL,
};
use apigateway_controller::controller::{
    ConditionStatus, ReconcileOutcome, ReconcilerSettings, WaitReason,
};
use apigateway_controller::crd::{
    CanarySettings, GatewayResourceSpec, IntegrationSpec, KindSpec, MethodSpec, ObjectRef,
    ResourceReference, VpcLinkSpec,
};
use apigateway_controller::descriptor::{FieldValue, Kind};
use apigateway_controller::provider::memory::InMemoryGateway;
use apigateway_controller::provider::{CreateRequest, RemoteClient, RemoteError};
use common::{deployment, rest_api, stage, tags, Harness};
use std::time::Duration;

async fn synced_rest_api(harness: &Harness, spec: KindSpec) -> ObjectRef {
    let api = harness.apply("orders", spec).await;
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);
    api
}

#[tokio::test]
async fn test_create_records_identity_and_conditions() {
    let harness = Harness::new();
    let mut spec = rest_api("orders");
    spec.tags = Some(tags(&[("team", "payments")]));
    let api = synced_rest_api(&harness, KindSpec::RestApi(spec)).await;

    let status = harness.status(&api).await;
    assert_eq!(status.phase.as_deref(), Some("Synced"));
    assert_eq!(status.observed_generation, Some(1));
    assert!(status.remote.contains_key("rootResourceId"));
    assert!(status.arn.is_some());
    assert!(harness
        .has_condition(&api, CONDITION_RESOURCE_SYNCED, ConditionStatus::True)
        .await);

    let managed = harness.store.snapshot(&api).await.unwrap();
    assert!(managed.has_finalizer);

    let entity = harness.gateway.get(Kind::RestApi, &status.key).unwrap();
    assert_eq!(entity.key.get("restApiId"), status.id.as_ref());
    assert_eq!(entity.tags.get("team").map(String::as_str), Some("payments"));
    assert_eq!(
        entity
            .tags
            .get("services.k8s.aws/managed-by")
            .map(String::as_str),
        Some("apigateway-controller")
    );
    assert_eq!(
        entity.tags.get("services.k8s.aws/name").map(String::as_str),
        Some("orders")
    );
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let harness = Harness::new();
    let api = synced_rest_api(&harness, KindSpec::RestApi(rest_api("orders"))).await;
    let status = harness.status(&api).await;
    let mutations = harness.gateway.mutation_count();

    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);

    assert_eq!(harness.gateway.mutation_count(), mutations);
    assert_eq!(harness.status(&api).await, status);
}

#[tokio::test]
async fn test_invalid_create_is_terminal_until_spec_changes() {
    let harness = Harness::new();
    let mut spec = rest_api("orders");
    spec.api_key_source = Some("INVALID".to_string());
    let api = harness.apply("orders", KindSpec::RestApi(spec.clone())).await;

    assert!(matches!(
        harness.reconcile(&api).await,
        ReconcileOutcome::Terminal(_)
    ));
    assert!(harness
        .has_condition(&api, CONDITION_TERMINAL, ConditionStatus::True)
        .await);
    assert!(harness
        .has_condition(&api, CONDITION_RESOURCE_SYNCED, ConditionStatus::False)
        .await);
    assert_eq!(harness.status(&api).await.phase.as_deref(), Some("Terminal"));

    // Same generation: nothing is retried
    let terminal = harness.status(&api).await;
    assert!(matches!(
        harness.reconcile(&api).await,
        ReconcileOutcome::Terminal(_)
    ));
    assert_eq!(harness.status(&api).await, terminal);
    assert!(harness.gateway.entities(Kind::RestApi).is_empty());

    spec.api_key_source = Some("AUTHORIZER".to_string());
    harness.apply("orders", KindSpec::RestApi(spec)).await;
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);

    let status = harness.status(&api).await;
    assert!(status.condition(CONDITION_TERMINAL).is_none());
    assert_eq!(status.observed_generation, Some(2));
    let entity = harness.gateway.get(Kind::RestApi, &status.key).unwrap();
    assert_eq!(entity.fields["/apiKeySource"], FieldValue::from("AUTHORIZER"));
}

#[tokio::test]
async fn test_invalid_update_is_terminal_then_recovers() {
    let harness = Harness::new();
    let api = synced_rest_api(&harness, KindSpec::RestApi(rest_api("orders"))).await;

    let mut spec = rest_api("orders");
    spec.api_key_source = Some("INVALID".to_string());
    harness.apply("orders", KindSpec::RestApi(spec.clone())).await;
    let mutations = harness.gateway.mutation_count();

    assert!(matches!(
        harness.reconcile(&api).await,
        ReconcileOutcome::Terminal(_)
    ));
    assert_eq!(harness.gateway.mutation_count(), mutations);
    let status = harness.status(&api).await;
    assert_eq!(status.observed_generation, Some(2));
    let entity = harness.gateway.get(Kind::RestApi, &status.key).unwrap();
    assert_eq!(entity.fields["/apiKeySource"], FieldValue::from("HEADER"));

    spec.api_key_source = Some("AUTHORIZER".to_string());
    harness.apply("orders", KindSpec::RestApi(spec)).await;
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);
    assert!(harness
        .status(&api)
        .await
        .condition(CONDITION_TERMINAL)
        .is_none());
}

#[tokio::test]
async fn test_spec_change_patches_changed_field() {
    let harness = Harness::new();
    let mut spec = rest_api("orders");
    spec.description = Some("v1".to_string());
    let api = synced_rest_api(&harness, KindSpec::RestApi(spec.clone())).await;
    let key = harness.status(&api).await.key;
    let before = harness.gateway.get(Kind::RestApi, &key).unwrap();

    spec.description = Some("v2".to_string());
    harness.apply("orders", KindSpec::RestApi(spec)).await;
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);

    let after = harness.gateway.get(Kind::RestApi, &key).unwrap();
    assert_eq!(after.fields["/description"], FieldValue::from("v2"));
    assert_eq!(after.fields["/apiKeySource"], before.fields["/apiKeySource"]);
    assert_eq!(after.read_only, before.read_only);
    assert_eq!(harness.status(&api).await.observed_generation, Some(2));
}

#[tokio::test]
async fn test_drift_is_corrected() {
    let harness = Harness::new();
    let mut spec = rest_api("orders");
    spec.description = Some("v1".to_string());
    let api = synced_rest_api(&harness, KindSpec::RestApi(spec)).await;
    let key = harness.status(&api).await.key;

    assert!(harness.gateway.modify(Kind::RestApi, &key, |entity| {
        entity
            .fields
            .insert("/description".to_string(), "changed by hand".into());
    }));

    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);
    let entity = harness.gateway.get(Kind::RestApi, &key).unwrap();
    assert_eq!(entity.fields["/description"], FieldValue::from("v1"));
}

#[tokio::test]
async fn test_removed_field_is_cleared() {
    let harness = Harness::new();
    let mut spec = rest_api("orders");
    spec.description = Some("v1".to_string());
    let api = synced_rest_api(&harness, KindSpec::RestApi(spec.clone())).await;
    let key = harness.status(&api).await.key;

    spec.description = None;
    harness.apply("orders", KindSpec::RestApi(spec)).await;
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);

    let entity = harness.gateway.get(Kind::RestApi, &key).unwrap();
    assert!(!entity.fields.contains_key("/description"));
    // Server defaults that were never in the spec stay put
    assert!(entity.fields.contains_key("/apiKeySource"));
}

#[tokio::test]
async fn test_tag_changes_keep_system_tags() {
    let harness = Harness::new();
    let mut spec = rest_api("orders");
    spec.tags = Some(tags(&[("team", "payments"), ("env", "dev")]));
    let api = synced_rest_api(&harness, KindSpec::RestApi(spec.clone())).await;
    let key = harness.status(&api).await.key;

    spec.tags = Some(tags(&[("team", "platform")]));
    harness.apply("orders", KindSpec::RestApi(spec)).await;
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);

    let entity = harness.gateway.get(Kind::RestApi, &key).unwrap();
    assert_eq!(
        entity.tags,
        tags(&[
            ("team", "platform"),
            ("services.k8s.aws/managed-by", "apigateway-controller"),
            ("services.k8s.aws/name", "orders"),
            ("services.k8s.aws/namespace", "default"),
        ])
    );
}

#[tokio::test]
async fn test_immutable_change_replaces_integration() {
    let harness = Harness::new();
    let api = synced_rest_api(&harness, KindSpec::RestApi(rest_api("orders"))).await;
    let root = harness.root_resource_id(&api).await;

    let method = harness
        .apply(
            "get-root",
            KindSpec::Method(MethodSpec {
                rest_api_ref: Some(ResourceReference::to("orders")),
                resource_id: Some(root.clone()),
                http_method: "GET".to_string(),
                authorization_type: "NONE".to_string(),
                ..Default::default()
            }),
        )
        .await;
    assert_eq!(harness.reconcile(&method).await, ReconcileOutcome::Synced);

    let mut spec = IntegrationSpec {
        rest_api_ref: Some(ResourceReference::to("orders")),
        resource_id: Some(root),
        http_method: "GET".to_string(),
        integration_type: "MOCK".to_string(),
        ..Default::default()
    };
    let integration = harness
        .apply("get-root", KindSpec::Integration(spec.clone()))
        .await;
    assert_eq!(harness.reconcile(&integration).await, ReconcileOutcome::Synced);
    let key = harness.status(&integration).await.key;
    let mutations = harness.gateway.mutation_count();

    spec.integration_type = "HTTP".to_string();
    spec.uri = Some("https://orders.internal/".to_string());
    spec.integration_http_method = Some("GET".to_string());
    harness
        .apply("get-root", KindSpec::Integration(spec))
        .await;
    assert_eq!(harness.reconcile(&integration).await, ReconcileOutcome::Synced);

    // delete + create
    assert_eq!(harness.gateway.mutation_count(), mutations + 2);
    assert_eq!(harness.status(&integration).await.key, key);
    let entity = harness.gateway.get(Kind::Integration, &key).unwrap();
    assert_eq!(entity.fields["/type"], FieldValue::from("HTTP"));
    assert_eq!(
        entity.fields["/uri"],
        FieldValue::from("https://orders.internal/")
    );
}

#[tokio::test]
async fn test_dependent_waits_for_references() {
    let harness = Harness::new();
    let prod = harness
        .apply("prod", KindSpec::Stage(stage("orders", "v1", "prod")))
        .await;

    match harness.reconcile(&prod).await {
        ReconcileOutcome::Pending(waiting_on) => {
            assert_eq!(waiting_on.len(), 2);
            assert!(waiting_on.contains(&ObjectRef::new(Kind::RestApi, "default", "orders")));
        }
        other => panic!("expected pending, got {other:?}"),
    }
    assert_eq!(harness.gateway.mutation_count(), 0);
    assert!(harness
        .has_condition(&prod, CONDITION_RESOURCE_SYNCED, ConditionStatus::Unknown)
        .await);
    assert!(harness
        .has_condition(&prod, CONDITION_REFERENCES_RESOLVED, ConditionStatus::False)
        .await);
    assert_eq!(harness.status(&prod).await.phase.as_deref(), Some("Pending"));

    let api = harness
        .apply("orders", KindSpec::RestApi(rest_api("orders")))
        .await;
    let v1 = harness
        .apply("v1", KindSpec::Deployment(deployment("orders")))
        .await;
    harness.settle(&[&api, &v1, &prod]).await;

    assert!(harness
        .has_condition(&prod, CONDITION_REFERENCES_RESOLVED, ConditionStatus::True)
        .await);
    let stage_key = harness.status(&prod).await.key;
    assert_eq!(
        stage_key.get("restApiId"),
        Some(&harness.remote_id(&api).await)
    );
    let entity = harness.gateway.get(Kind::Stage, &stage_key).unwrap();
    assert_eq!(
        entity.fields["/deploymentId"],
        FieldValue::from(harness.remote_id(&v1).await)
    );
}

#[tokio::test]
async fn test_cyclic_parent_references_are_terminal() {
    let harness = Harness::new();
    synced_rest_api(&harness, KindSpec::RestApi(rest_api("orders"))).await;

    let resource = |parent: &str, path: &str| {
        KindSpec::Resource(GatewayResourceSpec {
            rest_api_ref: Some(ResourceReference::to("orders")),
            parent_ref: Some(ResourceReference::to(parent)),
            path_part: path.to_string(),
            ..Default::default()
        })
    };
    let a = harness.apply("a", resource("b", "a")).await;
    harness.apply("b", resource("a", "b")).await;

    match harness.reconcile(&a).await {
        ReconcileOutcome::Terminal(message) => assert!(message.contains(" -> ")),
        other => panic!("expected terminal, got {other:?}"),
    }
    let terminal = harness.status(&a).await;
    assert_eq!(
        terminal
            .condition(CONDITION_TERMINAL)
            .and_then(|c| c.reason.as_deref()),
        Some("CyclicReference")
    );
    // Only the root resource exists remotely
    assert_eq!(harness.gateway.entities(Kind::Resource).len(), 1);
}

#[tokio::test]
async fn test_delete_removes_remote_entity() {
    let harness = Harness::new();
    let api = synced_rest_api(&harness, KindSpec::RestApi(rest_api("orders"))).await;
    let key = harness.status(&api).await.key;

    assert!(harness.store.delete(&api).await);
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Deleted);

    assert!(harness.store.snapshot(&api).await.is_none());
    assert!(matches!(
        harness.gateway.fetch(Kind::RestApi, &key).await,
        Err(RemoteError::NotFound(_))
    ));
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Gone);
}

#[tokio::test]
async fn test_deletion_waits_for_dependents() {
    let harness = Harness::new();
    let api = harness
        .apply("orders", KindSpec::RestApi(rest_api("orders")))
        .await;
    let v1 = harness
        .apply("v1", KindSpec::Deployment(deployment("orders")))
        .await;
    let prod = harness
        .apply("prod", KindSpec::Stage(stage("orders", "v1", "prod")))
        .await;
    harness.settle(&[&api, &v1, &prod]).await;

    harness.store.delete(&api).await;
    assert_eq!(
        harness.reconcile(&api).await,
        ReconcileOutcome::Waiting(WaitReason::Dependents)
    );
    assert_eq!(harness.gateway.entities(Kind::RestApi).len(), 1);

    harness.store.delete(&v1).await;
    assert_eq!(
        harness.reconcile(&v1).await,
        ReconcileOutcome::Waiting(WaitReason::Dependents)
    );

    harness.store.delete(&prod).await;
    assert_eq!(harness.reconcile(&prod).await, ReconcileOutcome::Deleted);
    assert_eq!(harness.reconcile(&v1).await, ReconcileOutcome::Deleted);
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Deleted);

    assert!(harness.gateway.entities(Kind::RestApi).is_empty());
    assert!(harness.gateway.entities(Kind::Stage).is_empty());
    assert!(harness.gateway.entities(Kind::Deployment).is_empty());
    assert!(harness.store.refs().await.is_empty());
}

#[tokio::test]
async fn test_stage_chain_syncs_bottom_up_and_defers_rest_api_deletion() {
    let harness = Harness::new();

    // Dependents are declared before anything they reference exists
    let prod = harness
        .apply("prod", KindSpec::Stage(stage("orders", "v1", "prod")))
        .await;
    let v1 = harness
        .apply("v1", KindSpec::Deployment(deployment("orders")))
        .await;
    let integration = harness
        .apply(
            "get-pets",
            KindSpec::Integration(IntegrationSpec {
                rest_api_ref: Some(ResourceReference::to("orders")),
                resource_ref: Some(ResourceReference::to("pets")),
                http_method: "GET".to_string(),
                integration_type: "MOCK".to_string(),
                ..Default::default()
            }),
        )
        .await;
    let method = harness
        .apply(
            "get-pets",
            KindSpec::Method(MethodSpec {
                rest_api_ref: Some(ResourceReference::to("orders")),
                resource_ref: Some(ResourceReference::to("pets")),
                http_method: "GET".to_string(),
                authorization_type: "NONE".to_string(),
                ..Default::default()
            }),
        )
        .await;
    assert!(matches!(
        harness.reconcile(&prod).await,
        ReconcileOutcome::Pending(_)
    ));
    assert!(matches!(
        harness.reconcile(&integration).await,
        ReconcileOutcome::Pending(_)
    ));

    let api = synced_rest_api(&harness, KindSpec::RestApi(rest_api("orders"))).await;
    let root = harness.root_resource_id(&api).await;
    let pets = harness
        .apply(
            "pets",
            KindSpec::Resource(GatewayResourceSpec {
                rest_api_ref: Some(ResourceReference::to("orders")),
                parent_id: Some(root),
                path_part: "pets".to_string(),
                ..Default::default()
            }),
        )
        .await;
    harness
        .settle(&[&pets, &method, &integration, &v1, &prod])
        .await;
    assert_eq!(harness.gateway.entities(Kind::Stage).len(), 1);
    assert_eq!(harness.gateway.entities(Kind::Integration).len(), 1);

    // The REST API outlives everything built on it
    harness.store.delete(&api).await;
    assert_eq!(
        harness.reconcile(&api).await,
        ReconcileOutcome::Waiting(WaitReason::Dependents)
    );
    assert!(harness
        .has_condition(&api, CONDITION_RESOURCE_SYNCED, ConditionStatus::False)
        .await);
    assert_eq!(harness.gateway.entities(Kind::RestApi).len(), 1);
    assert_eq!(harness.gateway.entities(Kind::Stage).len(), 1);

    for object in [&prod, &v1, &integration, &method, &pets] {
        harness.store.delete(object).await;
        assert_eq!(
            harness.reconcile(object).await,
            ReconcileOutcome::Deleted,
            "{object} should delete once nothing references it"
        );
    }
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Deleted);
    assert!(harness.gateway.entities(Kind::RestApi).is_empty());
    assert!(harness.gateway.entities(Kind::Stage).is_empty());
    assert!(harness.store.refs().await.is_empty());
}

#[tokio::test]
async fn test_canary_settings_update_and_removal() {
    let harness = Harness::new();
    let api = synced_rest_api(&harness, KindSpec::RestApi(rest_api("orders"))).await;
    let v1 = harness
        .apply("v1", KindSpec::Deployment(deployment("orders")))
        .await;
    let mut spec = stage("orders", "v1", "prod");
    let prod = harness.apply("prod", KindSpec::Stage(spec.clone())).await;
    harness.settle(&[&api, &v1, &prod]).await;
    let key = harness.status(&prod).await.key;

    spec.description = Some("Updated description".to_string());
    spec.canary_settings = Some(CanarySettings {
        percent_traffic: Some(10.1),
        stage_variable_overrides: Some(tags(&[("v1", "k1"), ("v2", "k2")])),
        ..Default::default()
    });
    harness.apply("prod", KindSpec::Stage(spec.clone())).await;
    assert_eq!(harness.reconcile(&prod).await, ReconcileOutcome::Synced);

    let entity = harness.gateway.get(Kind::Stage, &key).unwrap();
    assert_eq!(
        entity.fields["/canarySettings/percentTraffic"],
        FieldValue::from("10.1")
    );
    assert_eq!(
        entity.fields["/canarySettings/stageVariableOverrides"],
        FieldValue::Map(tags(&[("v1", "k1"), ("v2", "k2")]))
    );
    assert_eq!(
        entity.fields["/description"],
        FieldValue::from("Updated description")
    );

    let mutations = harness.gateway.mutation_count();
    assert_eq!(harness.reconcile(&prod).await, ReconcileOutcome::Synced);
    assert_eq!(harness.gateway.mutation_count(), mutations);

    spec.canary_settings = None;
    harness.apply("prod", KindSpec::Stage(spec)).await;
    assert_eq!(harness.reconcile(&prod).await, ReconcileOutcome::Synced);
    let entity = harness.gateway.get(Kind::Stage, &key).unwrap();
    assert!(entity
        .fields
        .keys()
        .all(|path| !path.starts_with("/canarySettings/")));
    assert!(entity.fields.contains_key("/description"));
}

#[tokio::test]
async fn test_missing_entity_is_recreated_outside_consistency_window() {
    let harness = Harness::build(
        InMemoryGateway::default(),
        ReconcilerSettings {
            consistency_window: Duration::ZERO,
            max_unknown_retries: 5,
        },
    );
    let api = synced_rest_api(&harness, KindSpec::RestApi(rest_api("orders"))).await;
    let old_id = harness.remote_id(&api).await;
    let old_key = harness.status(&api).await.key;
    harness.gateway.remove(Kind::RestApi, &old_key);

    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);

    let new_id = harness.remote_id(&api).await;
    assert_ne!(new_id, old_id);
    assert_eq!(harness.gateway.entities(Kind::RestApi).len(), 1);
}

#[tokio::test]
async fn test_missing_entity_is_awaited_after_create() {
    let harness = Harness::build(
        InMemoryGateway::default().with_consistency_misses(1),
        ReconcilerSettings::default(),
    );
    let api = synced_rest_api(&harness, KindSpec::RestApi(rest_api("orders"))).await;
    let id = harness.remote_id(&api).await;

    assert_eq!(
        harness.reconcile(&api).await,
        ReconcileOutcome::Waiting(WaitReason::Consistency)
    );
    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);

    assert_eq!(harness.remote_id(&api).await, id);
    assert_eq!(harness.gateway.mutation_count(), 1);
}

#[tokio::test]
async fn test_throttling_is_transient() {
    let harness = Harness::new();
    let api = synced_rest_api(&harness, KindSpec::RestApi(rest_api("orders"))).await;

    harness
        .gateway
        .fail_next(RemoteError::Throttled("rate exceeded".to_string()));
    assert!(matches!(
        harness.reconcile(&api).await,
        ReconcileOutcome::Transient(RemoteError::Throttled(_))
    ));
    let status = harness.status(&api).await;
    let synced = status.condition(CONDITION_RESOURCE_SYNCED).unwrap();
    assert_eq!(synced.status, "False");
    assert_eq!(synced.reason.as_deref(), Some("Throttled"));
    assert!(status.condition(CONDITION_TERMINAL).is_none());

    assert_eq!(harness.reconcile(&api).await, ReconcileOutcome::Synced);
}

#[tokio::test]
async fn test_unknown_errors_become_terminal_after_retries() {
    let harness = Harness::build(
        InMemoryGateway::default(),
        ReconcilerSettings {
            consistency_window: Duration::from_secs(60),
            max_unknown_retries: 2,
        },
    );
    let api = harness
        .apply("orders", KindSpec::RestApi(rest_api("orders")))
        .await;

    for _ in 0..2 {
        harness
            .gateway
            .fail_next(RemoteError::Unknown("internal failure".to_string()));
        assert!(matches!(
            harness.reconcile(&api).await,
            ReconcileOutcome::Transient(RemoteError::Unknown(_))
        ));
    }
    harness
        .gateway
        .fail_next(RemoteError::Unknown("internal failure".to_string()));
    match harness.reconcile(&api).await {
        ReconcileOutcome::Terminal(message) => assert!(message.contains("3 attempts")),
        other => panic!("expected terminal, got {other:?}"),
    }
    assert!(harness.gateway.entities(Kind::RestApi).is_empty());
}

#[tokio::test]
async fn test_busy_vpc_link_defers_modification() {
    let harness = Harness::new();
    let mut spec = VpcLinkSpec {
        name: "orders-link".to_string(),
        target_arns: vec![
            "arn:aws:elasticloadbalancing:us-west-2:123456789012:loadbalancer/net/orders/abc"
                .to_string(),
        ],
        ..Default::default()
    };
    let link = harness
        .apply("orders-link", KindSpec::VpcLink(spec.clone()))
        .await;
    assert_eq!(harness.reconcile(&link).await, ReconcileOutcome::Synced);
    assert_eq!(
        harness.status(&link).await.remote.get("status").map(String::as_str),
        Some("PENDING")
    );

    spec.description = Some("private integration".to_string());
    harness
        .apply("orders-link", KindSpec::VpcLink(spec))
        .await;
    let mutations = harness.gateway.mutation_count();
    assert_eq!(
        harness.reconcile(&link).await,
        ReconcileOutcome::Waiting(WaitReason::Busy)
    );
    assert_eq!(harness.gateway.mutation_count(), mutations);

    assert_eq!(harness.reconcile(&link).await, ReconcileOutcome::Synced);
    let status = harness.status(&link).await;
    assert_eq!(status.remote.get("status").map(String::as_str), Some("AVAILABLE"));
    let entity = harness.gateway.get(Kind::VpcLink, &status.key).unwrap();
    assert_eq!(
        entity.fields["/description"],
        FieldValue::from("private integration")
    );
}

#[tokio::test]
async fn test_existing_stage_is_adopted() {
    let harness = Harness::new();
    let api = harness
        .apply("orders", KindSpec::RestApi(rest_api("orders")))
        .await;
    let v1 = harness
        .apply("v1", KindSpec::Deployment(deployment("orders")))
        .await;
    harness.settle(&[&api, &v1]).await;

    let rest_api_id = harness.remote_id(&api).await;
    let deployment_id = harness.remote_id(&v1).await;
    harness
        .gateway
        .create(
            Kind::Stage,
            CreateRequest {
                identifiers: tags(&[("restApiId", rest_api_id.as_str()), ("stageName", "prod")]),
                fields: [
                    ("/deploymentId".to_string(), FieldValue::from(deployment_id)),
                    ("/description".to_string(), FieldValue::from("made by hand")),
                ]
                .into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let mut spec = stage("orders", "v1", "prod");
    spec.description = Some("managed".to_string());
    let prod = harness.apply("prod", KindSpec::Stage(spec)).await;
    let mutations = harness.gateway.mutation_count();

    assert_eq!(
        harness.reconcile(&prod).await,
        ReconcileOutcome::Waiting(WaitReason::Adopted)
    );
    assert_eq!(harness.gateway.mutation_count(), mutations);
    let status = harness.status(&prod).await;
    assert_eq!(status.id.as_deref(), Some("prod"));
    assert!(status.remote.contains_key("createdDate"));

    assert_eq!(harness.reconcile(&prod).await, ReconcileOutcome::Synced);
    let entity = harness.gateway.get(Kind::Stage, &status.key).unwrap();
    assert_eq!(entity.fields["/description"], FieldValue::from("managed"));
    assert_eq!(harness.gateway.entities(Kind::Stage).len(), 1);
}

#[tokio::test]
async fn test_raw_id_and_reference_together_are_rejected() {
    let harness = Harness::new();
    let mut spec = stage("orders", "v1", "prod");
    spec.rest_api_id = Some("abc123".to_string());
    let prod = harness.apply("prod", KindSpec::Stage(spec)).await;

    match harness.reconcile(&prod).await {
        ReconcileOutcome::Terminal(message) => assert!(message.contains("mutually exclusive")),
        other => panic!("expected terminal, got {other:?}"),
    }
    assert_eq!(
        harness
            .status(&prod)
            .await
            .condition(CONDITION_TERMINAL)
            .and_then(|c| c.reason.as_deref()),
        Some("InvalidInput")
    );
    assert_eq!(harness.gateway.mutation_count(), 0);
}
