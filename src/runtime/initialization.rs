//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes and API Gateway client setup.

use crate::config::ControllerConfig;
use crate::constants::DEFAULT_SERVER_POLL_INTERVAL_MS;
use crate::controller::{Engine, Reconciler, ReconcilerSettings};
use crate::descriptor::{DescriptorRegistry, Kind};
use crate::observability;
use crate::observability::server::{start_server, ServerState};
use crate::provider::aws::ApiGatewayClient;
use crate::provider::TagPolicy;
use crate::store::{KubeStore, ObjectStore};
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client used by the watchers
    pub client: Client,
    pub engine: Arc<Engine>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes and API Gateway client creation
/// - Engine setup
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before any rustls connection is made
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apigateway_controller=info".into()),
        )
        .try_init()
    {
        warn!("Tracing subscriber init returned error: {}", e);
    }

    info!(
        "Starting API Gateway Controller v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = ControllerConfig::from_env();
    info!(
        workers = config.worker_count,
        region = %config.aws_region,
        namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        resync = ?config.resync_period,
        "Loaded controller configuration"
    );

    observability::metrics::register_metrics()?;

    let server_state = ServerState::new();
    let server_handle = {
        let state = Arc::clone(&server_state);
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!("HTTP server error: {}", e);
            }
        })
    };
    wait_for_server_ready(&server_state, &server_handle, config.server_startup_timeout).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let remote = ApiGatewayClient::new(&config.aws_region, config.aws_endpoint_url.as_deref())
        .await
        .context("Failed to create API Gateway client")?;

    let registry = DescriptorRegistry::default();
    let store: Arc<dyn ObjectStore> =
        Arc::new(KubeStore::new(client.clone(), config.watch_namespace.clone()));

    summarize_existing_resources(&registry, store.as_ref()).await;

    let reconciler = Reconciler::new(
        registry,
        store,
        Arc::new(remote),
        TagPolicy::new(&config.system_tag_prefix),
        ReconcilerSettings::from(&config),
    );
    let engine = Arc::new(Engine::new(reconciler, &config));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        engine,
        server_state,
        config,
    })
}

/// Wait for the HTTP server to bind
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    startup_timeout: Duration,
) -> Result<()> {
    let poll_interval = Duration::from_millis(DEFAULT_SERVER_POLL_INTERVAL_MS);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state
            .is_listening
            .load(std::sync::atomic::Ordering::Relaxed)
        {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Log how many objects of each kind exist before the watchers start
///
/// A kind that cannot be listed usually means its CRD is not installed; the
/// watcher for it keeps retrying.
async fn summarize_existing_resources(registry: &DescriptorRegistry, store: &dyn ObjectStore) {
    let mut kinds: Vec<Kind> = registry.kinds().collect();
    kinds.sort();

    info!("API Gateway Controller - Startup Resource Summary");
    for kind in kinds {
        match store.list(kind).await {
            Ok(objects) => {
                let mut names: Vec<String> = objects.iter().map(|o| o.key.to_string()).collect();
                names.sort();
                let shown = if names.len() <= 3 {
                    names.join(", ")
                } else {
                    format!("{}, ... ({} total)", names[..3].join(", "), names.len())
                };
                info!("  {} ({}): {}", kind, names.len(), shown);
            }
            Err(e) => {
                error!("{} is not queryable; {}. Is the CRD installed?", kind, e);
                error!("Installation: crdgen | kubectl apply -f -");
            }
        }
    }
}
