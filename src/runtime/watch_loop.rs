//! # Watch Loop
//!
//! One watcher per custom resource kind feeding the engine, the reconcile
//! workers, and the periodic resync timer. Runs until Ctrl-C.

use crate::crd::{
    ApiKey, Authorizer, GatewayDeployment, GatewayObject, GatewayResource, Integration,
    IntegrationResponse, ManagedObject, Method, MethodResponse, RestAPI, Stage, VpcLink,
};
use crate::controller::{Engine, EventType};
use crate::runtime::error_policy::{handle_watch_stream_error, WatchBackoff};
use crate::runtime::initialization::InitializationResult;
use anyhow::Result;
use futures::pin_mut;
use futures::StreamExt;
use kube::{Api, Client};
use kube_runtime::watcher::{self, Event};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shorter than the client read timeout so the API server closes the watch first
const WATCH_TIMEOUT_SECS: u32 = 25;
const WATCH_BACKOFF_INITIAL_MS: u64 = 1_000;

/// Run the controller until interrupted
pub async fn run_watch_loop(init: InitializationResult) -> Result<()> {
    let InitializationResult {
        client,
        engine,
        server_state,
        config,
    } = init;

    let workers = engine.start(config.worker_count);
    let namespace = config.watch_namespace.as_deref();

    let watchers = vec![
        spawn_watch::<RestAPI>(&client, namespace, &engine),
        spawn_watch::<GatewayResource>(&client, namespace, &engine),
        spawn_watch::<Method>(&client, namespace, &engine),
        spawn_watch::<MethodResponse>(&client, namespace, &engine),
        spawn_watch::<Integration>(&client, namespace, &engine),
        spawn_watch::<IntegrationResponse>(&client, namespace, &engine),
        spawn_watch::<GatewayDeployment>(&client, namespace, &engine),
        spawn_watch::<Stage>(&client, namespace, &engine),
        spawn_watch::<Authorizer>(&client, namespace, &engine),
        spawn_watch::<ApiKey>(&client, namespace, &engine),
        spawn_watch::<VpcLink>(&client, namespace, &engine),
    ];
    let resync = engine.spawn_resync_timer(config.resync_period);

    server_state.set_ready(true);
    info!("Controller ready, watching {} kinds", watchers.len());

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    server_state.set_ready(false);
    resync.abort();
    for watcher in &watchers {
        watcher.abort();
    }
    engine.shutdown();
    futures::future::join_all(workers).await;

    info!("Controller stopped");
    Ok(())
}

fn spawn_watch<T: GatewayObject>(
    client: &Client,
    namespace: Option<&str>,
    engine: &Arc<Engine>,
) -> JoinHandle<()> {
    let api: Api<T> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    tokio::spawn(watch_kind(api, Arc::clone(engine)))
}

async fn watch_kind<T: GatewayObject>(api: Api<T>, engine: Arc<Engine>) {
    let kind = T::KIND.as_str();
    let backoff = WatchBackoff::new(
        WATCH_BACKOFF_INITIAL_MS,
        crate::constants::DEFAULT_WATCH_MAX_BACKOFF_MS,
    );

    let stream = watcher::watcher(api, watcher::Config::default().timeout(WATCH_TIMEOUT_SECS));
    pin_mut!(stream);
    info!(kind, "👀 Watching custom resources");

    while let Some(event) = stream.next().await {
        match event {
            Ok(Event::Apply(object) | Event::InitApply(object)) => {
                backoff.reset(WATCH_BACKOFF_INITIAL_MS);
                dispatch(&engine, &object);
            }
            Ok(Event::Delete(object)) => {
                let managed = object.to_managed();
                debug!(kind, object = %managed.key, "Custom resource removed");
                engine.on_custom_resource_event(T::KIND, managed.key, EventType::Deleted);
            }
            Ok(Event::Init | Event::InitDone) => {}
            Err(e) => handle_watch_stream_error(kind, &e.to_string(), &backoff).await,
        }
    }

    warn!(kind, "Watch stream ended");
}

/// Apply events carry deletion requests as a set deletion timestamp.
///
/// An object whose status already covers its generation only changed in
/// metadata or status, usually our own writes echoing back, so it is a resync.
fn event_for(managed: &ManagedObject) -> EventType {
    if managed.deletion_requested {
        EventType::Deleted
    } else if managed.status.observed_generation == Some(managed.generation) {
        EventType::Resync
    } else {
        EventType::Applied {
            generation: managed.generation,
        }
    }
}

fn dispatch<T: GatewayObject>(engine: &Engine, object: &T) {
    let managed = object.to_managed();
    let event = event_for(&managed);
    debug!(kind = %T::KIND, object = %managed.key, ?event, "Custom resource event");
    engine.on_custom_resource_event(T::KIND, managed.key, event);
}
