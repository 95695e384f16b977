//! Synchronous capability endpoints.
//!
//! Each request runs its capability chain inline and answers with the
//! generated text, recommendations, and narrated audio. Narration is
//! best-effort: a speech failure only drops `audio_base64`.

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use bytes::Bytes;
use muse_service::{
    MultimodalPipeline, PipelineResult, SttService, TextPipeline, TtsService, VisionService,
};

use crate::extract::Json;
use crate::handler::request::{AudioInput, ImageInput, TextInput};
use crate::handler::response::AssistantResponse;
use crate::handler::{ErrorKind, Result};
use crate::service::ServiceState;

/// Tracing target for processing operations.
const TRACING_TARGET: &str = "muse_server::handler::processing";

/// Runs the text pipeline and narrates its answer.
async fn respond(
    text_pipeline: &TextPipeline,
    tts: &TtsService,
    text: &str,
) -> Result<AssistantResponse> {
    let response = text_pipeline.run(text).await?;
    let Some(response_text) = response.response_text else {
        return Err(ErrorKind::BadGateway.with_message("Failed to generate a response"));
    };

    let audio = narrate(tts, &response_text).await;
    Ok(AssistantResponse::new(
        response_text,
        response.recommendations,
        audio,
    ))
}

async fn narrate(tts: &TtsService, text: &str) -> Option<Bytes> {
    match tts.speak(text).await {
        Ok(audio) => audio,
        Err(error) => {
            tracing::warn!(
                target: TRACING_TARGET,
                error = %error,
                "Speech synthesis failed, answering without audio"
            );
            None
        }
    }
}

#[tracing::instrument(skip_all)]
async fn process_text(
    State(text_pipeline): State<TextPipeline>,
    State(tts): State<TtsService>,
    Json(request): Json<TextInput>,
) -> Result<Json<AssistantResponse>> {
    let text = request.validated()?;
    tracing::debug!(target: TRACING_TARGET, text_len = text.len(), "Processing text");

    let response = respond(&text_pipeline, &tts, text).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
async fn process_audio(
    State(stt): State<SttService>,
    State(text_pipeline): State<TextPipeline>,
    State(tts): State<TtsService>,
    Json(request): Json<AudioInput>,
) -> Result<Json<AssistantResponse>> {
    let audio = request.decode()?;
    tracing::debug!(target: TRACING_TARGET, audio_len = audio.len(), "Processing audio");

    let Some(transcript) = stt.transcribe(&audio).await? else {
        return Err(ErrorKind::BadRequest.with_message("Could not convert audio to text"));
    };

    let response = respond(&text_pipeline, &tts, &transcript).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
async fn process_image(
    State(vision): State<VisionService>,
    State(text_pipeline): State<TextPipeline>,
    State(tts): State<TtsService>,
    Json(request): Json<ImageInput>,
) -> Result<Json<AssistantResponse>> {
    let image = request.decode()?;
    tracing::debug!(target: TRACING_TARGET, image_len = image.len(), "Processing image");

    let Some(description) = vision.describe(&image).await? else {
        return Err(ErrorKind::BadRequest.with_message("Could not understand image"));
    };

    let prompt = format!("Analyze this image: {description}");
    let response = respond(&text_pipeline, &tts, &prompt).await?;
    Ok(Json(response))
}

#[tracing::instrument(skip_all)]
async fn process_multimodal(
    State(pipeline): State<MultimodalPipeline>,
    Json(request): Json<ImageInput>,
) -> Result<Json<PipelineResult>> {
    let image = request.decode()?;
    tracing::debug!(target: TRACING_TARGET, image_len = image.len(), "Running multimodal pipeline");

    let result = pipeline.run(&image).await?;
    Ok(Json(result))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/process_text", post(process_text))
        .route("/process_audio", post(process_audio))
        .route("/process_image", post(process_image))
        .route("/process_multimodal", post(process_multimodal))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use muse_core::Provider;
    use muse_core::mock::{MockAdapters, MockLlm, MockStt, MockTts, MockVision};
    use serde_json::{Value, json};

    use crate::handler::test::{create_test_server, create_test_server_with_adapters};

    #[tokio::test]
    async fn process_text_answers_with_audio() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server
            .post("/api/v1/process_text")
            .json(&json!({ "text": "I need a new laptop for work" }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["response_text"], "mock response");
        assert_eq!(body["recommendations"][0], "Laptop");
        assert_eq!(body["audio_base64"], STANDARD.encode(b"ID3mock"));
        Ok(())
    }

    #[tokio::test]
    async fn process_text_rejects_blank_text() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server
            .post("/api/v1/process_text")
            .json(&json!({ "text": "   " }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn process_text_rejects_malformed_json() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server
            .post("/api/v1/process_text")
            .content_type("application/json")
            .text("{\"text\":")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn process_text_without_generation_is_bad_gateway() -> anyhow::Result<()> {
        let adapters = MockAdapters::default().with_llm(MockLlm::replying(Provider::OpenAi, ""));
        let server = create_test_server_with_adapters(adapters).await?;

        let response = server
            .post("/api/v1/process_text")
            .json(&json!({ "text": "hello" }))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        Ok(())
    }

    #[tokio::test]
    async fn speech_failure_only_drops_audio() -> anyhow::Result<()> {
        let adapters = MockAdapters::default().with_tts(MockTts::failing(Provider::OpenAi));
        let server = create_test_server_with_adapters(adapters).await?;

        let response = server
            .post("/api/v1/process_text")
            .json(&json!({ "text": "hello" }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["response_text"], "mock response");
        assert!(body.get("audio_base64").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn process_audio_transcribes_then_answers() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server
            .post("/api/v1/process_audio")
            .json(&json!({ "audio_base64": STANDARD.encode(b"RIFF....WAVE") }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["response_text"], "mock response");
        Ok(())
    }

    #[tokio::test]
    async fn process_audio_without_transcript_is_bad_request() -> anyhow::Result<()> {
        let adapters = MockAdapters::default().with_stt(MockStt::replying(Provider::OpenAi, ""));
        let server = create_test_server_with_adapters(adapters).await?;

        let response = server
            .post("/api/v1/process_audio")
            .json(&json!({ "audio_base64": STANDARD.encode(b"noise") }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["message"], "Could not convert audio to text");
        Ok(())
    }

    #[tokio::test]
    async fn process_audio_rejects_invalid_base64() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server
            .post("/api/v1/process_audio")
            .json(&json!({ "audio_base64": "%%%" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn process_image_describes_then_answers() -> anyhow::Result<()> {
        let adapters = MockAdapters::default();
        let server = create_test_server_with_adapters(adapters.clone()).await?;

        let response = server
            .post("/api/v1/process_image")
            .json(&json!({ "image_base64": STANDARD.encode(b"\x89PNG") }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["response_text"], "mock response");
        assert_eq!(adapters.vision.calls(), 1);
        assert_eq!(adapters.llm.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn process_image_without_description_is_bad_request() -> anyhow::Result<()> {
        let adapters = MockAdapters::default().with_vision(MockVision::failing(Provider::OpenAi));
        let server = create_test_server_with_adapters(adapters).await?;

        let response = server
            .post("/api/v1/process_image")
            .json(&json!({ "image_base64": STANDARD.encode(b"\x89PNG") }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["message"], "Could not understand image");
        Ok(())
    }

    #[tokio::test]
    async fn process_multimodal_returns_pipeline_result() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server
            .post("/api/v1/process_multimodal")
            .json(&json!({ "image_base64": STANDARD.encode(b"\x89PNG") }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["source_description"], "a cat on a sofa");
        assert_eq!(body["generated_text"], "mock response");
        assert_eq!(body["audio_base64"], STANDARD.encode(b"ID3mock"));
        Ok(())
    }

    #[tokio::test]
    async fn process_multimodal_vision_failure_is_bad_gateway() -> anyhow::Result<()> {
        let adapters = MockAdapters::default().with_vision(MockVision::failing(Provider::OpenAi));
        let server = create_test_server_with_adapters(adapters).await?;

        let response = server
            .post("/api/v1/process_multimodal")
            .json(&json!({ "image_base64": STANDARD.encode(b"\x89PNG") }))
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        Ok(())
    }
}
