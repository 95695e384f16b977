#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use muse_server::handler::routes;
use muse_server::middleware::{RecoveryConfig, RouterObservabilityExt, RouterRecoveryExt};
use muse_server::service::ServiceState;
use muse_worker::WorkerPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{Cli, create_services};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "muse_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "muse_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "muse_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = format!("{error:#}"),
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    cli.init_tracing();
    cli.log();
    cli.validate()?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting muse"
    );

    let services = create_services(&cli).await?;
    let router = create_router(services.state, &cli.recovery);

    let cancel = CancellationToken::new();
    let worker = services.worker.map(|pool| start_worker(pool, cancel.clone()));

    let served = server::serve_http(router, &cli.server, cancel.clone()).await;
    cancel.cancel();

    if let Some(worker) = worker {
        drain_worker(worker, cli.server.shutdown_timeout()).await?;
    }

    served.context("HTTP server failed")
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Observability (outermost): request ids and tracing spans
/// 2. Recovery: catches panics, enforces timeouts and body limits
/// 3. Routes (innermost): actual request handlers
fn create_router(state: ServiceState, recovery: &RecoveryConfig) -> Router {
    routes(state)
        .with_recovery(recovery)
        .with_metrics()
        .with_observability()
}

fn start_worker(pool: WorkerPool, cancel: CancellationToken) -> JoinHandle<muse_worker::Result<()>> {
    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        "starting in-process worker pool"
    );
    pool.spawn(cancel)
}

/// Waits for in-flight jobs, giving up after the shutdown timeout.
///
/// Jobs abandoned here are redelivered by the broker once their
/// acknowledgement deadline passes.
async fn drain_worker(
    worker: JoinHandle<muse_worker::Result<()>>,
    shutdown_timeout: Duration,
) -> anyhow::Result<()> {
    match tokio::time::timeout(shutdown_timeout, worker).await {
        Ok(joined) => joined
            .context("worker pool task panicked")?
            .context("worker pool failed")?,
        Err(_) => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                timeout_secs = shutdown_timeout.as_secs(),
                "worker pool did not drain in time, abandoning in-flight jobs"
            );
        }
    }
    Ok(())
}
