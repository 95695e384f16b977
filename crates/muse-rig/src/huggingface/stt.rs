use muse_core::Provider;
use muse_core::adapter::SttAdapter;
use serde::Deserialize;

use super::HuggingFaceClient;
use crate::TRACING_TARGET;

/// Speech recognition through the Inference API.
#[derive(Debug, Clone)]
pub struct HuggingFaceStt {
    client: HuggingFaceClient,
    model: String,
}

impl HuggingFaceStt {
    pub fn new(client: HuggingFaceClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Recognition {
    text: String,
}

#[async_trait::async_trait]
impl SttAdapter for HuggingFaceStt {
    fn provider(&self) -> Provider {
        Provider::HuggingFace
    }

    async fn transcribe(&self, audio: &[u8]) -> muse_core::Result<String> {
        tracing::debug!(
            target: TRACING_TARGET,
            model = %self.model,
            audio_len = audio.len(),
            "Sending HuggingFace speech recognition request"
        );

        let recognition: Recognition = self.client.infer_bytes(&self.model, audio).await?;
        Ok(recognition.text.trim().to_owned())
    }
}
