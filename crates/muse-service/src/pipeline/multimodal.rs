use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::TextPipeline;
use crate::service::{TtsService, VisionService};
use crate::{Error, Result, TRACING_TARGET_PIPELINE};

/// Output of the image-to-poem-to-speech pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Caption of the source image.
    pub source_description: String,
    /// Text generated from the caption.
    pub generated_text: String,
    /// Narrated audio; empty when speech synthesis failed.
    #[serde(rename = "audio_base64", default, with = "audio_base64")]
    pub audio: Bytes,
    /// Products related to the generation prompt.
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl PipelineResult {
    /// Returns whether narrated audio is present.
    pub fn has_audio(&self) -> bool {
        !self.audio.is_empty()
    }
}

/// Image → description → generated text → speech.
///
/// Description and generation are essential: an empty result from either
/// aborts the run with a pipeline error and the later stages never execute.
/// Speech is best-effort and only leaves `audio` empty when it fails.
#[derive(Debug, Clone)]
pub struct MultimodalPipeline {
    vision: VisionService,
    text: TextPipeline,
    tts: TtsService,
}

impl MultimodalPipeline {
    pub fn new(vision: VisionService, text: TextPipeline, tts: TtsService) -> Self {
        Self { vision, text, tts }
    }

    /// Builds the generation prompt for an image description.
    pub fn poem_prompt(description: &str) -> String {
        format!(
            "Based on the following description of an image, write a short, evocative poem: '{description}'"
        )
    }

    /// Runs the pipeline to completion.
    pub async fn run(&self, image: &[u8]) -> Result<PipelineResult> {
        self.run_with_cancel(image, &CancellationToken::new()).await
    }

    /// Runs the pipeline, checking `cancel` before every stage.
    #[tracing::instrument(skip_all, fields(image_len = image.len()))]
    pub async fn run_with_cancel(
        &self,
        image: &[u8],
        cancel: &CancellationToken,
    ) -> Result<PipelineResult> {
        tracing::info!(target: TRACING_TARGET_PIPELINE, "Starting multimodal pipeline");

        checkpoint(cancel, "describe")?;
        let Some(source_description) = self.vision.describe(image).await? else {
            tracing::warn!(target: TRACING_TARGET_PIPELINE, "Vision stage returned no description");
            return Err(Error::pipeline().with_message("vision stage failed"));
        };

        checkpoint(cancel, "generate")?;
        let prompt = Self::poem_prompt(&source_description);
        let response = self.text.run(&prompt).await?;
        let Some(generated_text) = response.response_text else {
            tracing::warn!(target: TRACING_TARGET_PIPELINE, "Generation stage returned no text");
            return Err(Error::pipeline().with_message("generation stage failed"));
        };

        checkpoint(cancel, "speak")?;
        let audio = match self.tts.speak(&generated_text).await {
            Ok(Some(audio)) => audio,
            Ok(None) => Bytes::new(),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_PIPELINE,
                    error = %error,
                    "Speech stage unavailable, returning result without audio"
                );
                Bytes::new()
            }
        };

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            has_audio = !audio.is_empty(),
            "Multimodal pipeline finished"
        );

        Ok(PipelineResult {
            source_description,
            generated_text,
            audio,
            recommendations: response.recommendations,
        })
    }
}

fn checkpoint(cancel: &CancellationToken, stage: &'static str) -> Result<()> {
    if cancel.is_cancelled() {
        tracing::warn!(target: TRACING_TARGET_PIPELINE, stage, "Soft time limit reached");
        return Err(Error::timeout().with_message("soft time limit exceeded"));
    }
    Ok(())
}

mod audio_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(audio: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        if audio.is_empty() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(&STANDARD.encode(audio))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded)
                .map(Bytes::from)
                .map_err(D::Error::custom),
            None => Ok(Bytes::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use muse_core::cache::MemoryCacheStore;
    use muse_core::mock::{MockAdapters, MockLlm, MockTts, MockVision};
    use muse_core::{ErrorKind, Provider};

    use super::*;
    use crate::cache::{CacheTtls, ResultCache};
    use crate::recommendation::RecommendationService;
    use crate::service::LlmService;

    fn pipeline(mocks: &MockAdapters) -> MultimodalPipeline {
        let registry = mocks.registry();
        let cache = ResultCache::new(Arc::new(MemoryCacheStore::new()));
        MultimodalPipeline::new(
            VisionService::new(registry.clone(), None, cache, CacheTtls::default()),
            TextPipeline::new(
                LlmService::new(registry.clone(), None),
                RecommendationService::new(),
            ),
            TtsService::new(registry, None),
        )
    }

    #[tokio::test]
    async fn all_stages_succeed() {
        let mocks = MockAdapters::default()
            .with_vision(MockVision::replying(Provider::OpenAi, "a red fox in snow"))
            .with_llm(MockLlm::replying(Provider::OpenAi, "Ember on white hush"));
        let result = pipeline(&mocks).run(b"img").await.unwrap();

        assert_eq!(result.source_description, "a red fox in snow");
        assert_eq!(result.generated_text, "Ember on white hush");
        assert!(result.has_audio());
        assert_eq!(result.recommendations.len(), 3);
    }

    #[tokio::test]
    async fn speech_failure_only_drops_audio() {
        let mocks = MockAdapters::default().with_tts(MockTts::failing(Provider::Gtts));
        let result = pipeline(&mocks).run(b"img").await.unwrap();

        assert_eq!(result.source_description, "a cat on a sofa");
        assert_eq!(result.generated_text, "mock response");
        assert!(!result.has_audio());
        assert_eq!(mocks.tts.calls(), 1);
    }

    #[tokio::test]
    async fn empty_description_aborts_before_generation() {
        let mocks = MockAdapters::default().with_vision(MockVision::replying(Provider::OpenAi, ""));
        let error = pipeline(&mocks).run(b"img").await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Pipeline);
        assert_eq!(error.summary(), "vision stage failed");
        assert_eq!(mocks.llm.calls(), 0);
        assert_eq!(mocks.tts.calls(), 0);
    }

    #[tokio::test]
    async fn empty_generation_aborts_before_speech() {
        let mocks = MockAdapters::default().with_llm(MockLlm::failing(Provider::OpenAi));
        let error = pipeline(&mocks).run(b"img").await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Pipeline);
        assert_eq!(error.summary(), "generation stage failed");
        assert_eq!(mocks.tts.calls(), 0);
    }

    #[tokio::test]
    async fn cancelled_run_times_out() {
        let mocks = MockAdapters::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let error = pipeline(&mocks)
            .run_with_cancel(b"img", &cancel)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Timeout);
        assert_eq!(mocks.vision.calls(), 0);
    }

    #[test]
    fn audio_is_base64_on_the_wire() {
        let result = PipelineResult {
            source_description: "d".into(),
            generated_text: "g".into(),
            audio: Bytes::from_static(b"abc"),
            recommendations: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["audio_base64"], "YWJj");

        let silent = PipelineResult::default();
        let json = serde_json::to_value(&silent).unwrap();
        assert!(json["audio_base64"].is_null());
    }

    #[test]
    fn prompt_quotes_the_description() {
        assert_eq!(
            MultimodalPipeline::poem_prompt("a fox"),
            "Based on the following description of an image, write a short, evocative poem: 'a fox'"
        );
    }
}
