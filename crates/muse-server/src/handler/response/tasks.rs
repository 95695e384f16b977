use muse_core::job::{JobId, JobOutput, JobStatus};
use muse_service::JobStatusReport;
use serde::{Deserialize, Serialize};

/// Acknowledgement of an accepted background job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSubmission {
    pub job_id: JobId,
    pub status: JobStatus,
}

impl TaskSubmission {
    pub fn pending(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
        }
    }
}

/// Status of a background job.
///
/// `result` holds the output on success and the error summary on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutput>,
}

impl From<JobStatusReport> for TaskStatus {
    fn from(report: JobStatusReport) -> Self {
        let result = match report.status {
            JobStatus::Failure => report.error.map(JobOutput::Text),
            _ => report.result,
        };
        Self {
            job_id: report.job_id,
            status: report.status,
            result,
        }
    }
}
