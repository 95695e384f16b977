//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig           # Host, port, shutdown
//! ├── recovery: RecoveryConfig       # Request timeout, body limit
//! ├── nats: NatsConfig               # Job broker connection
//! ├── credentials: ProviderCredentials
//! ├── defaults: DefaultProviders     # Default provider per capability
//! ├── adapters: AdapterConfig        # Model names, provider timeout
//! ├── service: ServiceConfig         # Text pipeline provider, cache TTLs
//! └── worker: WorkerConfig           # Concurrency, time limits, retries
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod provider;
mod server;

use std::process;

use anyhow::Context;
use clap::Parser;
use muse_core::registry::{DefaultProviders, ProviderCredentials};
use muse_nats::NatsConfig;
use muse_rig::AdapterConfig;
use muse_server::middleware::RecoveryConfig;
use muse_server::service::ServiceConfig;
use muse_worker::WorkerConfig;
pub use provider::create_services;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "muse")]
#[command(about = "Multi-modal AI assistant server")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Request timeout and body size limit.
    #[clap(flatten)]
    pub recovery: RecoveryConfig,

    /// Job broker connection.
    #[clap(flatten)]
    pub nats: NatsConfig,

    /// Cache server URL; the broker connection is reused when unset.
    #[arg(long, env = "CACHE_URL")]
    #[serde(default)]
    pub cache_url: Option<String>,

    /// Provider credentials.
    #[clap(flatten)]
    pub credentials: ProviderCredentials,

    /// Default provider per capability.
    #[clap(flatten)]
    pub defaults: DefaultProviders,

    /// Concrete adapter settings.
    #[clap(flatten)]
    pub adapters: AdapterConfig,

    /// Service wiring and cache lifetimes.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Background worker pool.
    #[clap(flatten)]
    pub worker: WorkerConfig,

    /// Serves HTTP only, without running queued jobs in this process.
    #[arg(long = "no-worker", env = "DISABLE_WORKER")]
    #[serde(default)]
    pub no_worker: bool,

    /// Emits logs as JSON lines.
    #[arg(long, env = "LOG_JSON")]
    #[serde(default)]
    pub log_json: bool,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded before clap parses arguments, so its values
    /// act as environment fallbacks.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let json = self.log_json.then(|| tracing_subscriber::fmt::layer().json());
        let text = (!self.log_json).then(tracing_subscriber::fmt::layer);

        tracing_subscriber::registry()
            .with(filter)
            .with(json)
            .with(text)
            .init();
    }

    /// Returns whether the worker pool runs in this process.
    pub fn worker_enabled(&self) -> bool {
        !self.no_worker
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.nats
            .validate()
            .context("invalid broker configuration")?;
        if self.worker_enabled() {
            self.worker
                .validate()
                .context("invalid worker configuration")?;
        }
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            broker_url = %self.nats.nats_url,
            separate_cache = self.cache_url.is_some(),
            request_timeout_secs = self.recovery.request_timeout,
            worker_enabled = self.worker_enabled(),
            max_concurrent_jobs = self.worker.max_concurrent_jobs,
            max_attempts = self.worker.max_attempts,
            "Service configuration"
        );

        let configured = self.credentials.configured();
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            providers = ?configured,
            defaults = ?self.defaults,
            text_pipeline_provider = ?self.service.text_pipeline_provider,
            "Provider configuration"
        );
    }

    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
