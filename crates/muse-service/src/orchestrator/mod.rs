//! Background job submission and status lookup.
//!
//! The job backend owns the authoritative state of every job. The result
//! cache holds a copy of successful results only, so a failure is always
//! re-read from the backend and can never be pinned in the cache.

#[cfg(any(test, feature = "test-utils"))]
mod memory;

use std::sync::Arc;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub use memory::InMemoryJobBackend;
use muse_core::cache::result_key;
use muse_core::job::{JobBackend, JobEnvelope, JobId, JobOutput, JobPayload, JobState, JobStatus};
use serde::Serialize;

use crate::cache::{CacheTtls, ResultCache};
use crate::{Error, ErrorKind, Result, TRACING_TARGET_ORCHESTRATOR};

/// Externally visible status of a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusReport {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatusReport {
    fn pending(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            result: None,
            error: None,
        }
    }

    fn success(job_id: JobId, result: JobOutput) -> Self {
        Self {
            job_id,
            status: JobStatus::Success,
            result: Some(result),
            error: None,
        }
    }

    fn failure(job_id: JobId, error: String) -> Self {
        Self {
            job_id,
            status: JobStatus::Failure,
            result: None,
            error: Some(error),
        }
    }
}

/// Submits jobs and reports their status.
#[derive(Clone)]
pub struct TaskOrchestrator {
    backend: Arc<dyn JobBackend>,
    cache: ResultCache,
    ttls: CacheTtls,
}

impl TaskOrchestrator {
    pub fn new(backend: Arc<dyn JobBackend>, cache: ResultCache, ttls: CacheTtls) -> Self {
        Self {
            backend,
            cache,
            ttls,
        }
    }

    /// Enqueues a job and returns its id without waiting for execution.
    #[tracing::instrument(skip_all, fields(kind = %payload.kind()))]
    pub async fn submit(&self, payload: JobPayload) -> Result<JobId> {
        let id = JobId::new();
        let envelope = JobEnvelope::new(id.clone(), payload);
        self.backend.enqueue(envelope).await.map_err(transient)?;

        tracing::info!(target: TRACING_TARGET_ORCHESTRATOR, job_id = %id, "Job submitted");
        Ok(id)
    }

    /// Looks up the status of a job, cache first.
    ///
    /// A successful result read from the backend is written back to the
    /// cache and reported in the shape a cache read yields, so repeated calls
    /// for a finished job return the same report.
    pub async fn status(&self, id: &JobId) -> Result<JobStatusReport> {
        let key = result_key(id);
        if let Some(result) = self.cache.get(&key).await {
            tracing::debug!(target: TRACING_TARGET_ORCHESTRATOR, job_id = %id, "Result served from cache");
            return Ok(JobStatusReport::success(id.clone(), result));
        }

        let state = self.backend.state(id).await.map_err(transient)?;
        Ok(match state {
            JobState::Pending => JobStatusReport::pending(id.clone()),
            JobState::Succeeded(result) => {
                let result = ResultCache::normalize(result)?;
                self.cache
                    .set(&key, &result, self.ttls.for_result(&result))
                    .await;
                JobStatusReport::success(id.clone(), result)
            }
            JobState::Failed(summary) => JobStatusReport::failure(id.clone(), summary),
        })
    }

    /// Records the outcome of a job execution.
    ///
    /// The backend keeps the first terminal state it receives. Only the
    /// success it ends up holding is copied into the cache.
    #[tracing::instrument(skip_all, fields(job_id = %id))]
    pub async fn complete(&self, id: &JobId, outcome: Result<JobOutput>) -> Result<()> {
        let state = match outcome {
            Ok(output) => JobState::Succeeded(output),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_ORCHESTRATOR,
                    error = %error,
                    "Job failed"
                );
                JobState::Failed(error.summary())
            }
        };
        let succeeded = matches!(state, JobState::Succeeded(_));
        self.backend.finish(id, state).await.map_err(transient)?;

        if succeeded
            && let JobState::Succeeded(result) = self.backend.state(id).await.map_err(transient)?
        {
            self.cache
                .set(&result_key(id), &result, self.ttls.for_result(&result))
                .await;
        }

        tracing::info!(target: TRACING_TARGET_ORCHESTRATOR, succeeded, "Job completed");
        Ok(())
    }
}

impl std::fmt::Debug for TaskOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskOrchestrator")
            .field("cache", &self.cache)
            .field("ttls", &self.ttls)
            .finish_non_exhaustive()
    }
}

fn transient(error: Error) -> Error {
    if error.kind() == ErrorKind::QueueTransient {
        return error;
    }
    let message = error.to_string();
    Error::queue_transient()
        .with_message(message)
        .with_source(error)
}
