//! Event-driven reconciliation through the engine and its workers.

mod common;

use apigateway_controller::config::ControllerConfig;
use apigateway_controller::constants::CONDITION_RESOURCE_SYNCED;
use apigateway_controller::controller::{
    ConditionStatus, ConditionTracker, Engine, EventType, Reconciler, ReconcilerSettings,
};
use apigateway_controller::crd::{KindSpec, ObjectKey, ObjectRef};
use apigateway_controller::descriptor::{DescriptorRegistry, Kind};
use apigateway_controller::provider::memory::InMemoryGateway;
use apigateway_controller::provider::{RemoteClient, TagPolicy};
use apigateway_controller::store::{InMemoryStore, ObjectStore};
use common::{deployment, rest_api, stage, NAMESPACE};
use std::sync::Arc;
use std::time::Duration;

const PERIOD: Duration = Duration::from_millis(50);
const MAX_PERIODS: u32 = 100;

fn fast_config() -> ControllerConfig {
    ControllerConfig {
        worker_count: 2,
        pending_requeue: PERIOD,
        consistency_requeue: PERIOD,
        backoff_initial: Duration::from_millis(10),
        backoff_max: Duration::from_millis(200),
        ..ControllerConfig::default()
    }
}

struct Setup {
    store: Arc<InMemoryStore>,
    gateway: Arc<InMemoryGateway>,
    engine: Arc<Engine>,
    tracker: ConditionTracker,
}

fn setup(gateway: InMemoryGateway) -> Setup {
    let config = fast_config();
    let store = Arc::new(InMemoryStore::new());
    let gateway = Arc::new(gateway);
    let store_dyn: Arc<dyn ObjectStore> = Arc::clone(&store) as Arc<dyn ObjectStore>;
    let reconciler = Reconciler::new(
        DescriptorRegistry::default(),
        Arc::clone(&store_dyn),
        Arc::clone(&gateway) as Arc<dyn RemoteClient>,
        TagPolicy::default(),
        ReconcilerSettings::from(&config),
    );
    Setup {
        store,
        gateway,
        engine: Arc::new(Engine::new(reconciler, &config)),
        tracker: ConditionTracker::new(store_dyn),
    }
}

impl Setup {
    async fn apply(&self, name: &str, spec: KindSpec) -> ObjectRef {
        let kind = spec.kind();
        let generation = self.store.apply(ObjectKey::new(NAMESPACE, name), spec).await;
        self.engine.on_custom_resource_event(
            kind,
            ObjectKey::new(NAMESPACE, name),
            EventType::Applied { generation },
        );
        ObjectRef::new(kind, NAMESPACE, name)
    }

    async fn delete(&self, object: &ObjectRef) {
        self.store.delete(object).await;
        self.engine
            .on_custom_resource_event(object.kind, object.key.clone(), EventType::Deleted);
    }

    async fn synced(&self, object: &ObjectRef) -> bool {
        self.tracker
            .wait_on_condition(
                object,
                CONDITION_RESOURCE_SYNCED,
                ConditionStatus::True,
                MAX_PERIODS,
                PERIOD,
            )
            .await
    }
}

#[tokio::test]
async fn test_out_of_order_events_converge() {
    let setup = setup(InMemoryGateway::default());
    let workers = setup.engine.start(2);

    // Dependents arrive before what they reference
    let prod = setup
        .apply("prod", KindSpec::Stage(stage("orders", "v1", "prod")))
        .await;
    let v1 = setup
        .apply("v1", KindSpec::Deployment(deployment("orders")))
        .await;
    let api = setup
        .apply("orders", KindSpec::RestApi(rest_api("orders")))
        .await;

    assert!(setup.synced(&api).await);
    assert!(setup.synced(&v1).await);
    assert!(setup.synced(&prod).await);
    assert_eq!(setup.gateway.entities(Kind::Stage).len(), 1);

    setup.delete(&api).await;
    setup.delete(&v1).await;
    setup.delete(&prod).await;
    for object in [&prod, &v1, &api] {
        assert!(
            setup
                .tracker
                .wait_until_deleted(object, MAX_PERIODS, PERIOD)
                .await,
            "{object} was not deleted"
        );
    }
    assert!(setup.gateway.entities(Kind::RestApi).is_empty());
    assert!(setup.gateway.entities(Kind::Deployment).is_empty());

    setup.engine.shutdown();
    futures::future::join_all(workers).await;
}

#[tokio::test]
async fn test_consistency_miss_is_retried() {
    let setup = setup(InMemoryGateway::default().with_consistency_misses(1));
    let workers = setup.engine.start(1);

    let mut spec = rest_api("orders");
    spec.description = Some("v1".to_string());
    let api = setup.apply("orders", KindSpec::RestApi(spec.clone())).await;
    assert!(setup.synced(&api).await);

    spec.description = Some("v2".to_string());
    setup.apply("orders", KindSpec::RestApi(spec)).await;

    let mut patched = false;
    for _ in 0..MAX_PERIODS {
        let observed = setup
            .store
            .snapshot(&api)
            .await
            .and_then(|o| o.status.observed_generation);
        if observed == Some(2) {
            patched = true;
            break;
        }
        tokio::time::sleep(PERIOD).await;
    }
    assert!(patched, "spec change was never applied");
    assert!(setup.synced(&api).await);
    assert_eq!(setup.gateway.entities(Kind::RestApi).len(), 1);

    setup.engine.shutdown();
    futures::future::join_all(workers).await;
}

#[tokio::test]
async fn test_resync_enqueues_every_object() {
    let setup = setup(InMemoryGateway::default());
    setup
        .store
        .apply(
            ObjectKey::new(NAMESPACE, "orders"),
            KindSpec::RestApi(rest_api("orders")),
        )
        .await;
    setup
        .store
        .apply(
            ObjectKey::new(NAMESPACE, "v1"),
            KindSpec::Deployment(deployment("orders")),
        )
        .await;

    assert_eq!(setup.engine.resync_all().await.unwrap(), 2);
    assert_eq!(setup.engine.scheduler().active(), 2);
}
