//! Job delivery contract between queues and workers.

use std::fmt;
use std::time::Duration;

use super::{JobEnvelope, JobKind};
use crate::Result;

/// Settles a delivered job with the queue it came from.
#[async_trait::async_trait]
pub trait DeliveryAck: Send + Sync {
    /// Removes the job from the queue for good.
    async fn ack(&self) -> Result<()>;

    /// Hands the job back for another attempt after `delay`.
    async fn retry(&self, delay: Duration) -> Result<()>;
}

/// A job handed to a worker, together with its delivery count.
pub struct JobDelivery {
    /// The queued job.
    pub envelope: JobEnvelope,
    /// Delivery count, starting at 1.
    pub attempt: u32,
    ack: Box<dyn DeliveryAck>,
}

impl JobDelivery {
    pub fn new(envelope: JobEnvelope, attempt: u32, ack: impl DeliveryAck + 'static) -> Self {
        Self {
            envelope,
            attempt: attempt.max(1),
            ack: Box::new(ack),
        }
    }

    /// Acknowledges the job.
    pub async fn ack(&self) -> Result<()> {
        self.ack.ack().await
    }

    /// Requeues the job for redelivery after `delay`.
    pub async fn retry(&self, delay: Duration) -> Result<()> {
        self.ack.retry(delay).await
    }
}

impl fmt::Debug for JobDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDelivery")
            .field("envelope", &self.envelope)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

/// Pull side of the job queues.
#[async_trait::async_trait]
pub trait JobSource: Send + Sync {
    /// Waits a bounded time for the next job of `kind`.
    ///
    /// Returns `None` when nothing arrived in that window, so callers can
    /// check for shutdown between polls.
    async fn next(&self, kind: JobKind) -> Result<Option<JobDelivery>>;
}
