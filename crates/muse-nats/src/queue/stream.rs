//! Stream naming and provisioning.

use async_nats::jetstream::{self, stream};
use muse_core::job::{JobId, JobKind};

use crate::{Error, Result, TRACING_TARGET_QUEUE};

/// Stream holding the queue of one job kind, e.g. `JOBS_LLM_GENERATE`.
pub fn stream_name(kind: JobKind) -> String {
    format!("JOBS_{}", kind.as_ref().to_uppercase())
}

/// Subject a job is published on: `jobs.<kind>.<job_id>`.
pub fn job_subject(kind: JobKind, id: &JobId) -> String {
    format!("jobs.{kind}.{id}")
}

/// Durable consumer shared by all workers of one kind.
pub fn consumer_name(kind: JobKind) -> String {
    format!("workers_{kind}")
}

/// Gets the stream for `kind`, creating it on first use.
pub(crate) async fn ensure(
    jetstream: &jetstream::Context,
    kind: JobKind,
) -> Result<stream::Stream> {
    let name = stream_name(kind);

    if let Ok(stream) = jetstream.get_stream(&name).await {
        tracing::debug!(
            target: TRACING_TARGET_QUEUE,
            stream = %name,
            "Using existing job stream"
        );
        return Ok(stream);
    }

    tracing::debug!(
        target: TRACING_TARGET_QUEUE,
        stream = %name,
        kind = %kind,
        "Creating new job stream"
    );
    let config = stream::Config {
        name: name.clone(),
        description: Some(format!("Job queue: {kind}")),
        subjects: vec![format!("jobs.{kind}.>")],
        retention: stream::RetentionPolicy::WorkQueue,
        ..Default::default()
    };
    jetstream
        .create_stream(config)
        .await
        .map_err(|e| Error::stream_error(&name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_kind() {
        assert_eq!(stream_name(JobKind::LlmGenerate), "JOBS_LLM_GENERATE");
        assert_eq!(
            stream_name(JobKind::MultimodalPipeline),
            "JOBS_MULTIMODAL_PIPELINE"
        );
        assert_eq!(
            consumer_name(JobKind::MultimodalPipeline),
            "workers_multimodal_pipeline"
        );
    }

    #[test]
    fn subjects_stay_inside_stream() {
        let id: JobId = "abc-123".parse().unwrap();
        assert_eq!(
            job_subject(JobKind::LlmGenerate, &id),
            "jobs.llm_generate.abc-123"
        );
    }
}
