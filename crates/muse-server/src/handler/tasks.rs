//! Background job submission and status polling.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use muse_core::job::{JobId, JobPayload};
use muse_service::TaskOrchestrator;

use crate::extract::Json;
use crate::handler::request::{ImageInput, TextInput};
use crate::handler::response::{TaskStatus, TaskSubmission};
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for task operations.
const TRACING_TARGET: &str = "muse_server::handler::tasks";

async fn submit(
    orchestrator: &TaskOrchestrator,
    payload: JobPayload,
) -> Result<(StatusCode, Json<TaskSubmission>)> {
    let kind = payload.kind();
    let job_id = orchestrator.submit(payload).await?;

    tracing::info!(
        target: TRACING_TARGET,
        job_id = %job_id,
        kind = %kind,
        "Background job accepted"
    );
    Ok((StatusCode::ACCEPTED, Json(TaskSubmission::pending(job_id))))
}

#[tracing::instrument(skip_all)]
async fn generate_text(
    State(orchestrator): State<TaskOrchestrator>,
    Json(request): Json<TextInput>,
) -> Result<(StatusCode, Json<TaskSubmission>)> {
    let prompt = request.validated()?.to_owned();
    submit(&orchestrator, JobPayload::LlmGenerate { prompt }).await
}

#[tracing::instrument(skip_all)]
async fn multimodal(
    State(orchestrator): State<TaskOrchestrator>,
    Json(request): Json<ImageInput>,
) -> Result<(StatusCode, Json<TaskSubmission>)> {
    // Rejects undecodable images before they reach a worker.
    request.decode()?;
    let image_base64 = request.image_base64.trim().to_owned();
    submit(&orchestrator, JobPayload::MultimodalPipeline { image_base64 }).await
}

#[tracing::instrument(skip_all)]
async fn task_status(
    State(orchestrator): State<TaskOrchestrator>,
    Path(job_id): Path<String>,
) -> Result<Json<TaskStatus>> {
    let job_id: JobId = job_id.parse()?;

    let report = orchestrator.status(&job_id).await?;
    tracing::debug!(
        target: TRACING_TARGET,
        job_id = %job_id,
        status = %report.status,
        "Job status read"
    );
    Ok(Json(report.into()))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/background/generate_text", post(generate_text))
        .route("/background/multimodal", post(multimodal))
        .route("/background/tasks/{job_id}", get(task_status))
        .route("/tasks/{job_id}", get(task_status))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use muse_core::Error;
    use muse_core::job::{JobId, JobOutput, JobPayload};
    use serde_json::{Value, json};

    use crate::handler::test::{create_test_harness, create_test_server};

    #[tokio::test]
    async fn generate_text_is_accepted_as_pending() -> anyhow::Result<()> {
        let harness = create_test_harness().await?;

        let response = harness
            .server
            .post("/api/v1/background/generate_text")
            .json(&json!({ "text": "write a haiku" }))
            .await;
        response.assert_status(StatusCode::ACCEPTED);

        let body: Value = response.json();
        assert_eq!(body["status"], "PENDING");
        assert!(body["job_id"].as_str().is_some_and(|id| !id.is_empty()));

        let envelope = harness.backend.next_job().await.expect("job queued");
        assert_eq!(envelope.id.as_str(), body["job_id"]);
        assert_eq!(
            envelope.payload,
            JobPayload::LlmGenerate {
                prompt: "write a haiku".into()
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn multimodal_rejects_invalid_image() -> anyhow::Result<()> {
        let harness = create_test_harness().await?;

        let response = harness
            .server
            .post("/api/v1/background/multimodal")
            .json(&json!({ "image_base64": "not base64!" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(harness.backend.queued().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn multimodal_is_accepted() -> anyhow::Result<()> {
        let harness = create_test_harness().await?;

        let response = harness
            .server
            .post("/api/v1/background/multimodal")
            .json(&json!({ "image_base64": STANDARD.encode(b"\x89PNG") }))
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        assert_eq!(harness.backend.queued().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn submit_with_backend_down_is_unavailable() -> anyhow::Result<()> {
        let harness = create_test_harness().await?;
        harness.backend.set_unavailable(true);

        let response = harness
            .server
            .post("/api/v1/background/generate_text")
            .json(&json!({ "text": "hello" }))
            .await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_job_reports_pending() -> anyhow::Result<()> {
        let server = create_test_server().await?;
        let job_id = JobId::new();

        let response = server
            .get(&format!("/api/v1/background/tasks/{job_id}"))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["job_id"], job_id.as_str());
        assert_eq!(body["status"], "PENDING");
        assert!(body.get("result").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn completed_job_reports_result() -> anyhow::Result<()> {
        let harness = create_test_harness().await?;
        let orchestrator = &harness.state.orchestrator;
        let job_id = orchestrator
            .submit(JobPayload::LlmGenerate {
                prompt: "hi".into(),
            })
            .await?;
        orchestrator
            .complete(&job_id, Ok(JobOutput::Text("hello back".into())))
            .await?;

        let response = harness
            .server
            .get(&format!("/api/v1/tasks/{job_id}"))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "SUCCESS");
        assert_eq!(body["result"], "hello back");
        Ok(())
    }

    #[tokio::test]
    async fn failed_job_reports_error_summary() -> anyhow::Result<()> {
        let harness = create_test_harness().await?;
        let orchestrator = &harness.state.orchestrator;
        let job_id = orchestrator
            .submit(JobPayload::LlmGenerate {
                prompt: "hi".into(),
            })
            .await?;
        let failure = Error::pipeline().with_message("generation produced no text");
        orchestrator.complete(&job_id, Err(failure)).await?;

        let response = harness
            .server
            .get(&format!("/api/v1/tasks/{job_id}"))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "FAILURE");
        assert_eq!(body["result"], "generation produced no text");
        Ok(())
    }

    #[tokio::test]
    async fn malformed_job_id_is_bad_request() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server.get("/api/v1/tasks/not%20an%20id").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        Ok(())
    }
}
