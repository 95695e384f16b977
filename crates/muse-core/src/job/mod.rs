//! Background job types and the job backend contract.
//!
//! A job is created `PENDING` at submission and transitions exactly once to
//! a terminal state. The backend owns the authoritative record; the result
//! cache only holds a time-bounded copy of successful results.

mod delivery;
mod id;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

pub use delivery::{DeliveryAck, JobDelivery, JobSource};
pub use id::JobId;

use crate::Result;

/// Kind of background job, one queue per kind.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    IntoStaticStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    /// Single text generation call.
    LlmGenerate,
    /// Vision, generation and speech pipeline over one image.
    MultimodalPipeline,
}

impl JobKind {
    /// All job kinds.
    pub const ALL: [JobKind; 2] = [Self::LlmGenerate, Self::MultimodalPipeline];
}

/// Capability-specific job input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    LlmGenerate { prompt: String },
    MultimodalPipeline { image_base64: String },
}

impl JobPayload {
    /// Kind of job this payload belongs to.
    pub fn kind(&self) -> JobKind {
        match self {
            Self::LlmGenerate { .. } => JobKind::LlmGenerate,
            Self::MultimodalPipeline { .. } => JobKind::MultimodalPipeline,
        }
    }
}

/// Result of a successful job: plain text or a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    Text(String),
    Structured(serde_json::Value),
}

impl JobOutput {
    /// Returns whether the output is a structured record.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Encodes a structured record.
    pub fn structured<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Structured(serde_json::to_value(value)?))
    }
}

/// Externally visible job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Success,
    Failure,
}

/// Backend view of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum JobState {
    /// Not finished, or unknown to the backend.
    Pending,
    /// Finished successfully with a result.
    Succeeded(JobOutput),
    /// Finished with a failure summary.
    Failed(String),
}

impl JobState {
    /// Returns the externally visible status.
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Pending => JobStatus::Pending,
            Self::Succeeded(_) => JobStatus::Success,
            Self::Failed(_) => JobStatus::Failure,
        }
    }

    /// Returns whether the state is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Message carried on a job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    /// Job identifier.
    pub id: JobId,
    /// Job input.
    pub payload: JobPayload,
    /// Submission time.
    pub submitted_at: Timestamp,
}

impl JobEnvelope {
    /// Wraps a payload submitted now.
    pub fn new(id: JobId, payload: JobPayload) -> Self {
        Self {
            id,
            payload,
            submitted_at: Timestamp::now(),
        }
    }

    /// Kind of the wrapped payload.
    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }
}

/// Authoritative job record held by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    pub state: JobState,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl JobRecord {
    /// Creates a pending record.
    pub fn pending(id: JobId, kind: JobKind) -> Self {
        Self {
            id,
            kind,
            state: JobState::Pending,
            created_at: Timestamp::now(),
            finished_at: None,
        }
    }

    /// Moves the record to a terminal state.
    ///
    /// Returns `false` without changes when the record is already terminal.
    pub fn finish(&mut self, state: JobState) -> bool {
        if self.state.is_terminal() || !state.is_terminal() {
            return false;
        }
        self.state = state;
        self.finished_at = Some(Timestamp::now());
        true
    }
}

/// Queue plus status store backing the task orchestrator.
///
/// Implementations must deliver each enqueued job at least once to a worker
/// and keep the terminal state of a job immutable once written.
#[async_trait::async_trait]
pub trait JobBackend: Send + Sync {
    /// Records the job as pending and enqueues it for execution.
    async fn enqueue(&self, envelope: JobEnvelope) -> Result<()>;

    /// Returns the current state; unknown ids are reported as pending.
    async fn state(&self, id: &JobId) -> Result<JobState>;

    /// Writes the terminal state; later writes for the same job are ignored.
    async fn finish(&self, id: &JobId, state: JobState) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_kind_and_wire_format() {
        let payload = JobPayload::LlmGenerate {
            prompt: "hello".into(),
        };
        assert_eq!(payload.kind(), JobKind::LlmGenerate);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({"kind": "llm_generate", "prompt": "hello"})
        );
        assert_eq!(JobKind::MultimodalPipeline.as_ref(), "multimodal_pipeline");
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(JobStatus::Failure.to_string(), "FAILURE");
    }

    #[test]
    fn record_finishes_once() {
        let mut record = JobRecord::pending(JobId::new(), JobKind::LlmGenerate);
        assert!(!record.finish(JobState::Pending));
        assert!(record.finish(JobState::Succeeded(JobOutput::Text("first".into()))));
        assert!(!record.finish(JobState::Failed("late".into())));
        assert_eq!(
            record.state,
            JobState::Succeeded(JobOutput::Text("first".into()))
        );
        assert!(record.finished_at.is_some());
    }

    #[test]
    fn state_round_trips() {
        let state = JobState::Succeeded(JobOutput::Structured(serde_json::json!({"a": 1})));
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(serde_json::from_str::<JobState>(&json).unwrap(), state);
    }
}
