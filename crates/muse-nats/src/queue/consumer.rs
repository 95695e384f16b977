//! Job consumption.

use std::time::Duration;

use async_nats::jetstream::consumer::{self, PullConsumer};
use async_nats::jetstream::{self, AckKind, Message};
use futures::StreamExt;
use muse_core::job::{DeliveryAck, JobDelivery, JobEnvelope, JobKind};

use super::stream::{self, consumer_name};
use crate::{Error, Result, TRACING_TARGET_QUEUE};

/// Delivery settings of a job consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerSettings {
    /// Time a worker holds a job before the server redelivers it.
    ///
    /// Must exceed the job's hard time limit.
    pub ack_wait: Duration,
    /// Deliveries before the server gives up on a job.
    pub max_deliver: u32,
    /// How long one pull waits for a job.
    pub poll_timeout: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            ack_wait: Duration::from_secs(300),
            max_deliver: 3,
            poll_timeout: Duration::from_secs(5),
        }
    }
}

/// Shared durable pull consumer over one kind's stream.
#[derive(Clone)]
pub struct JobConsumer {
    kind: JobKind,
    consumer: PullConsumer,
    poll_timeout: Duration,
}

impl std::fmt::Debug for JobConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobConsumer")
            .field("kind", &self.kind)
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}

impl JobConsumer {
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_QUEUE)]
    pub(crate) async fn new(
        jetstream: &jetstream::Context,
        kind: JobKind,
        settings: ConsumerSettings,
    ) -> Result<Self> {
        let stream = stream::ensure(jetstream, kind).await?;
        let name = consumer_name(kind);

        let config = consumer::pull::Config {
            durable_name: Some(name.clone()),
            description: Some(format!("Workers for {kind} jobs")),
            ack_policy: consumer::AckPolicy::Explicit,
            ack_wait: settings.ack_wait,
            max_deliver: i64::from(settings.max_deliver.max(1)),
            ..Default::default()
        };

        let consumer = stream
            .get_or_create_consumer(&name, config)
            .await
            .map_err(|e| Error::consumer_error(&name, e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_QUEUE,
            consumer = %name,
            kind = %kind,
            ack_wait_secs = settings.ack_wait.as_secs(),
            max_deliver = settings.max_deliver,
            "Job consumer ready"
        );

        Ok(Self {
            kind,
            consumer,
            poll_timeout: settings.poll_timeout,
        })
    }

    /// Job kind this consumer serves.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Pulls one job, waiting at most the poll timeout.
    ///
    /// Undecodable messages are terminated so they are never redelivered.
    pub async fn next(&self) -> Result<Option<JobDelivery>> {
        let mut messages = self
            .consumer
            .batch()
            .max_messages(1)
            .expires(self.poll_timeout)
            .messages()
            .await
            .map_err(|e| Error::consumer_error(consumer_name(self.kind), e.to_string()))?;

        let Some(message) = messages.next().await else {
            return Ok(None);
        };
        let message =
            message.map_err(|e| Error::operation("message_receive", e.to_string()))?;

        let envelope: JobEnvelope = match serde_json::from_slice(&message.payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET_QUEUE,
                    subject = %message.subject,
                    error = %err,
                    "Discarding undecodable job message"
                );
                message
                    .ack_with(AckKind::Term)
                    .await
                    .map_err(|e| Error::operation("message_term", e.to_string()))?;
                return Ok(None);
            }
        };

        let attempt = message
            .info()
            .map(|info| u32::try_from(info.delivered).unwrap_or(1))
            .unwrap_or(1);

        tracing::debug!(
            target: TRACING_TARGET_QUEUE,
            job_id = %envelope.id,
            kind = %self.kind,
            attempt,
            "Received job"
        );

        Ok(Some(JobDelivery::new(envelope, attempt, NatsAck { message })))
    }
}

struct NatsAck {
    message: Message,
}

#[async_trait::async_trait]
impl DeliveryAck for NatsAck {
    async fn ack(&self) -> muse_core::Result<()> {
        self.message
            .ack()
            .await
            .map_err(|e| Error::operation("message_ack", e.to_string()))?;
        Ok(())
    }

    async fn retry(&self, delay: Duration) -> muse_core::Result<()> {
        self.message
            .ack_with(AckKind::Nak(Some(delay)))
            .await
            .map_err(|e| Error::operation("message_nak", e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = ConsumerSettings::default();
        assert_eq!(settings.max_deliver, 3);
        assert!(settings.ack_wait > settings.poll_timeout);
    }
}
