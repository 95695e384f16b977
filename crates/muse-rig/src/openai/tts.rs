use bytes::Bytes;
use muse_core::Provider;
use muse_core::adapter::TtsAdapter;
use serde_json::json;

use super::OpenAiClient;
use crate::TRACING_TARGET;
use crate::error::Error;

/// Speech synthesis through the OpenAI audio speech endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiTts {
    client: OpenAiClient,
    model: String,
    voice: String,
}

impl OpenAiTts {
    pub fn new(client: OpenAiClient, model: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            voice: voice.into(),
        }
    }
}

#[async_trait::async_trait]
impl TtsAdapter for OpenAiTts {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn speak(&self, text: &str) -> muse_core::Result<Bytes> {
        let body = json!({
            "model": self.model,
            "voice": self.voice,
            "input": text,
        });

        tracing::debug!(
            target: TRACING_TARGET,
            model = %self.model,
            voice = %self.voice,
            text_len = text.len(),
            "Sending OpenAI speech request"
        );

        let request = self.client.post("audio/speech").json(&body);
        let audio = self
            .client
            .send(request)
            .await?
            .bytes()
            .await
            .map_err(Error::from)?;

        Ok(audio)
    }
}
