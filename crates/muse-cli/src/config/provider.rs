//! Service wiring: broker, cache, adapters, and worker pool.

use std::sync::Arc;

use anyhow::Context;
use muse_core::job::JobSource;
use muse_nats::{NatsClient, NatsJobBackend};
use muse_rig::default_registry;
use muse_server::service::ServiceState;
use muse_service::ResultCache;
use muse_worker::{JobExecutor, WorkerPool, attach_consumers};

use super::Cli;
use crate::TRACING_TARGET_SERVER_STARTUP;

/// Everything the process runs.
pub struct Services {
    /// State shared by the HTTP handlers.
    pub state: ServiceState,
    /// Worker pool, absent with `--no-worker`.
    pub worker: Option<WorkerPool>,
}

/// Connects to the broker and cache and assembles the services.
///
/// # Errors
///
/// Returns an error if a connection cannot be established or the streams
/// and buckets cannot be provisioned. Missing provider credentials are
/// not an error.
pub async fn create_services(cli: &Cli) -> anyhow::Result<Services> {
    let broker = NatsClient::connect(cli.nats.clone())
        .await
        .context("failed to connect to the job broker")?;

    let cache_client = match &cli.cache_url {
        Some(url) if *url != cli.nats.nats_url => {
            NatsClient::connect(cli.nats.clone().with_url(url))
                .await
                .context("failed to connect to the cache server")?
        }
        _ => broker.clone(),
    };
    let store = cache_client
        .cache_store(cli.service.cache_ttls.longest())
        .await
        .context("failed to open the result cache")?;
    let cache = ResultCache::new(Arc::new(store));

    let mut backend = NatsJobBackend::new(&broker)
        .await
        .context("failed to provision the job queues")?;
    if cli.worker_enabled() {
        backend = attach_consumers(backend, &broker, &cli.worker)
            .await
            .context("failed to attach job consumers")?;
    }
    let backend = Arc::new(backend);

    let registry = default_registry(
        cli.credentials.clone(),
        cli.defaults.clone(),
        &cli.adapters,
    )
    .context("failed to build the adapter registry")?;

    let credentialed = cli.credentials.configured();
    if !credentialed.iter().any(|provider| provider.requires_credential()) {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "No provider credentials configured, only keyless providers are available"
        );
    }

    let state = ServiceState::new(&cli.service, registry, cache, backend.clone());

    let worker = cli.worker_enabled().then(|| {
        let source: Arc<dyn JobSource> = backend;
        let executor = JobExecutor::new(state.llm.clone(), state.multimodal_pipeline.clone());
        WorkerPool::new(
            source,
            state.orchestrator.clone(),
            executor,
            cli.worker.clone(),
        )
    });

    Ok(Services { state, worker })
}
