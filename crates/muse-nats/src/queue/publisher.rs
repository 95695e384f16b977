//! Job publishing.

use async_nats::HeaderMap;
use async_nats::header::NATS_MESSAGE_ID;
use async_nats::jetstream;
use bytes::Bytes;
use muse_core::job::{JobEnvelope, JobKind};

use super::stream::{self, job_subject};
use crate::{Error, Result, RetryPolicy, TRACING_TARGET_QUEUE};

/// Publishes jobs onto their kind's stream.
///
/// The job id doubles as the JetStream message id, so a publish retried
/// after a lost acknowledgement is deduplicated by the server.
#[derive(Clone)]
pub struct JobPublisher {
    jetstream: jetstream::Context,
    retry: RetryPolicy,
}

impl std::fmt::Debug for JobPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPublisher")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl JobPublisher {
    /// Provisions the streams of every job kind.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_QUEUE)]
    pub(crate) async fn new(jetstream: &jetstream::Context) -> Result<Self> {
        for kind in JobKind::ALL {
            stream::ensure(jetstream, kind).await?;
        }
        Ok(Self {
            jetstream: jetstream.clone(),
            retry: RetryPolicy::default(),
        })
    }

    /// Publishes a job and waits for the stream to persist it.
    #[tracing::instrument(skip_all, fields(job_id = %envelope.id), target = TRACING_TARGET_QUEUE)]
    pub async fn publish(&self, envelope: &JobEnvelope) -> Result<()> {
        let kind = envelope.kind();
        let subject = job_subject(kind, &envelope.id);
        let payload = Bytes::from(serde_json::to_vec(envelope)?);
        let size = payload.len();

        self.retry
            .retry(|| {
                let (subject, payload) = (subject.clone(), payload.clone());
                let mut headers = HeaderMap::new();
                headers.insert(NATS_MESSAGE_ID, envelope.id.as_str());
                async move {
                    self.jetstream
                        .publish_with_headers(subject.clone(), headers, payload)
                        .await
                        .map_err(|e| Error::delivery_failed(&subject, e.to_string()))?
                        .await
                        .map_err(|e| Error::delivery_failed(&subject, e.to_string()))
                }
            })
            .await?;

        tracing::info!(
            target: TRACING_TARGET_QUEUE,
            job_id = %envelope.id,
            kind = %kind,
            subject = %subject,
            payload_size = size,
            "Job published"
        );
        Ok(())
    }
}
