//! Job backend over JetStream.

use std::collections::HashMap;

use muse_core::job::{
    JobBackend, JobDelivery, JobEnvelope, JobId, JobKind, JobRecord, JobSource, JobState,
};

use crate::client::NatsClient;
use crate::kv::JobStatusStore;
use crate::queue::{ConsumerSettings, JobConsumer, JobPublisher};
use crate::{Result, TRACING_TARGET_QUEUE};

/// [`JobBackend`] storing records in the `job_status` bucket and queueing
/// jobs on per-kind work-queue streams.
///
/// Consumers are only attached on processes that run workers; the HTTP
/// side only needs to publish and read records.
#[derive(Debug, Clone)]
pub struct NatsJobBackend {
    statuses: JobStatusStore,
    publisher: JobPublisher,
    consumers: HashMap<JobKind, JobConsumer>,
}

impl NatsJobBackend {
    /// Provisions the status bucket and the job streams.
    pub async fn new(client: &NatsClient) -> Result<Self> {
        Ok(Self {
            statuses: client.job_status_store().await?,
            publisher: client.job_publisher().await?,
            consumers: HashMap::new(),
        })
    }

    /// Attaches the shared consumer of `kind` for pulling jobs.
    pub async fn with_consumer(
        mut self,
        client: &NatsClient,
        kind: JobKind,
        settings: ConsumerSettings,
    ) -> Result<Self> {
        let consumer = client.job_consumer(kind, settings).await?;
        self.consumers.insert(kind, consumer);
        Ok(self)
    }

    /// Reads the full record of a job.
    pub async fn record(&self, id: &JobId) -> Result<Option<JobRecord>> {
        self.statuses.get(id).await
    }
}

#[async_trait::async_trait]
impl JobBackend for NatsJobBackend {
    async fn enqueue(&self, envelope: JobEnvelope) -> muse_core::Result<()> {
        let record = JobRecord::pending(envelope.id.clone(), envelope.kind());
        self.statuses.insert(&record).await?;
        self.publisher.publish(&envelope).await?;
        Ok(())
    }

    async fn state(&self, id: &JobId) -> muse_core::Result<JobState> {
        let record = self.statuses.get(id).await?;
        Ok(record.map_or(JobState::Pending, |record| record.state))
    }

    async fn finish(&self, id: &JobId, state: JobState) -> muse_core::Result<()> {
        let written = self.statuses.finish(id, state).await?;
        if !written {
            tracing::debug!(
                target: TRACING_TARGET_QUEUE,
                job_id = %id,
                "Duplicate completion ignored"
            );
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobSource for NatsJobBackend {
    async fn next(&self, kind: JobKind) -> muse_core::Result<Option<JobDelivery>> {
        let Some(consumer) = self.consumers.get(&kind) else {
            return Err(muse_core::Error::configuration()
                .with_message(format!("no consumer attached for {kind} jobs")));
        };
        Ok(consumer.next().await?)
    }
}
