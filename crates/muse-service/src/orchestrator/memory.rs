//! In-process job backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use muse_core::job::{
    DeliveryAck, JobBackend, JobDelivery, JobEnvelope, JobId, JobKind, JobSource, JobState,
};
use tokio::sync::Mutex;

use crate::{Error, Result};

/// How long [`JobSource::next`] waits on an empty queue before giving up.
const IDLE_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
struct Queued {
    envelope: JobEnvelope,
    attempt: u32,
}

#[derive(Debug, Default)]
struct Queue {
    jobs: Mutex<VecDeque<Queued>>,
    retry_delays: Mutex<Vec<Duration>>,
}

/// Job backend held entirely in memory.
///
/// Jobs are queued in submission order and handed out by
/// [`next_job`](Self::next_job) or through [`JobSource`]. Retried jobs are
/// requeued at once; the requested delay is only recorded. Useful for tests
/// and single-process runs.
#[derive(Debug, Default)]
pub struct InMemoryJobBackend {
    states: Mutex<HashMap<JobId, JobState>>,
    queue: Arc<Queue>,
    unavailable: AtomicBool,
}

impl InMemoryJobBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops the oldest queued job.
    pub async fn next_job(&self) -> Option<JobEnvelope> {
        self.queue
            .jobs
            .lock()
            .await
            .pop_front()
            .map(|queued| queued.envelope)
    }

    /// Number of jobs waiting to be picked up.
    pub async fn queued(&self) -> usize {
        self.queue.jobs.lock().await.len()
    }

    /// Delays requested by retried deliveries, oldest first.
    pub async fn retry_delays(&self) -> Vec<Duration> {
        self.queue.retry_delays.lock().await.clone()
    }

    /// Makes every call fail as if the broker were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::queue_transient().with_message("job backend unavailable"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobBackend for InMemoryJobBackend {
    async fn enqueue(&self, envelope: JobEnvelope) -> Result<()> {
        self.check_available()?;
        self.states
            .lock()
            .await
            .insert(envelope.id.clone(), JobState::Pending);
        self.queue.jobs.lock().await.push_back(Queued {
            envelope,
            attempt: 1,
        });
        Ok(())
    }

    async fn state(&self, id: &JobId) -> Result<JobState> {
        self.check_available()?;
        let states = self.states.lock().await;
        Ok(states.get(id).cloned().unwrap_or(JobState::Pending))
    }

    async fn finish(&self, id: &JobId, state: JobState) -> Result<()> {
        self.check_available()?;
        let mut states = self.states.lock().await;
        let current = states.entry(id.clone()).or_insert(JobState::Pending);
        if !current.is_terminal() && state.is_terminal() {
            *current = state;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobSource for InMemoryJobBackend {
    async fn next(&self, kind: JobKind) -> Result<Option<JobDelivery>> {
        self.check_available()?;
        let queued = {
            let mut jobs = self.queue.jobs.lock().await;
            let position = jobs.iter().position(|queued| queued.envelope.kind() == kind);
            position.and_then(|index| jobs.remove(index))
        };

        let Some(queued) = queued else {
            tokio::time::sleep(IDLE_POLL).await;
            return Ok(None);
        };

        let ack = InMemoryAck {
            queue: self.queue.clone(),
            queued: queued.clone(),
        };
        Ok(Some(JobDelivery::new(queued.envelope, queued.attempt, ack)))
    }
}

struct InMemoryAck {
    queue: Arc<Queue>,
    queued: Queued,
}

#[async_trait::async_trait]
impl DeliveryAck for InMemoryAck {
    async fn ack(&self) -> Result<()> {
        Ok(())
    }

    async fn retry(&self, delay: Duration) -> Result<()> {
        self.queue.retry_delays.lock().await.push(delay);
        let mut queued = self.queued.clone();
        queued.attempt += 1;
        self.queue.jobs.lock().await.push_back(queued);
        Ok(())
    }
}
