//! NATS client wrapper and connection management.
//!
//! The `NatsClient` wraps one multiplexed `async-nats` connection. Cloning is
//! an `Arc` clone, so the HTTP server, the worker pool and the stores all
//! share the same TCP connection. Separate clients are only created when the
//! cache lives on a different server than the job queues.

use std::sync::Arc;
use std::time::Duration;

use async_nats::{Client, ConnectOptions, jetstream};
use muse_core::job::JobKind;
use tokio::time::timeout;

use super::nats_config::NatsConfig;
use crate::kv::{JobStatusStore, KvCacheStore};
use crate::queue::{ConsumerSettings, JobConsumer, JobPublisher};
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

/// NATS client wrapper with connection management.
///
/// This wrapper is cheaply cloneable and thread-safe.
#[derive(Debug, Clone)]
pub struct NatsClient {
    inner: Arc<NatsClientInner>,
}

#[derive(Debug)]
struct NatsClientInner {
    client: Client,
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsClient {
    /// Create a new NATS client and connect
    #[tracing::instrument(skip(config), target = TRACING_TARGET_CONNECTION)]
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            servers = ?config.servers(),
            "Connecting to NATS"
        );

        let mut connect_opts = ConnectOptions::new()
            .name(config.name())
            .ping_interval(config.ping_interval())
            .connection_timeout(config.connect_timeout())
            .reconnect_delay_callback(NatsConfig::reconnect_delay);

        if let Some(token) = config.token() {
            connect_opts = connect_opts.token(token.to_owned());
        }
        if let Some(max_reconnects) = config.max_reconnects_option() {
            connect_opts = connect_opts.max_reconnects(max_reconnects);
        }

        let connect_timeout = config.connect_timeout();
        let client = timeout(
            connect_timeout,
            async_nats::connect_with_options(config.nats_url.as_str(), connect_opts),
        )
        .await
        .map_err(|_| Error::timeout(connect_timeout))?
        .map_err(|e| Error::Connection(Box::new(e)))?;

        let jetstream = jetstream::new(client.clone());

        let server_info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            server_host = %server_info.host,
            server_version = %server_info.version,
            server_id = %server_info.server_id,
            max_payload = server_info.max_payload,
            "Successfully connected to NATS"
        );

        Ok(Self {
            inner: Arc::new(NatsClientInner {
                client,
                jetstream,
                config,
            }),
        })
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &NatsConfig {
        &self.inner.config
    }

    /// Get the JetStream context
    #[must_use]
    pub fn jetstream(&self) -> &jetstream::Context {
        &self.inner.jetstream
    }

    /// Test connectivity with a flush round trip
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CONNECTION)]
    pub async fn ping(&self) -> Result<Duration> {
        let start = std::time::Instant::now();
        let limit = Duration::from_secs(10);

        timeout(limit, self.inner.client.flush())
            .await
            .map_err(|_| Error::timeout(limit))?
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let ping_time = start.elapsed();
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            duration_ms = ping_time.as_millis(),
            "NATS ping successful"
        );
        Ok(ping_time)
    }

    /// Check if the client is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(
            self.inner.client.connection_state(),
            async_nats::connection::State::Connected
        )
    }
}

// Store and queue getters
impl NatsClient {
    /// Get or create the result cache bucket.
    ///
    /// `max_age` bounds how long the server keeps any entry and should be
    /// the longest TTL the cache is used with.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn cache_store(&self, max_age: Duration) -> Result<KvCacheStore> {
        KvCacheStore::new(self.jetstream(), max_age).await
    }

    /// Get or create the job status bucket.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn job_status_store(&self) -> Result<JobStatusStore> {
        JobStatusStore::new(self.jetstream()).await
    }

    /// Get or create the job streams and a publisher over them.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn job_publisher(&self) -> Result<JobPublisher> {
        JobPublisher::new(self.jetstream()).await
    }

    /// Get or create the shared pull consumer for one job kind.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn job_consumer(
        &self,
        kind: JobKind,
        settings: ConsumerSettings,
    ) -> Result<JobConsumer> {
        JobConsumer::new(self.jetstream(), kind, settings).await
    }
}
