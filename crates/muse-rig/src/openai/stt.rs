use muse_core::Provider;
use muse_core::adapter::SttAdapter;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::OpenAiClient;
use crate::TRACING_TARGET;
use crate::error::Error;

const FILE_NAME: &str = "input.wav";

/// Transcription through the OpenAI audio transcriptions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiStt {
    client: OpenAiClient,
    model: String,
}

impl OpenAiStt {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Transcription {
    text: String,
}

#[async_trait::async_trait]
impl SttAdapter for OpenAiStt {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn transcribe(&self, audio: &[u8]) -> muse_core::Result<String> {
        let file = Part::bytes(audio.to_vec())
            .file_name(FILE_NAME)
            .mime_str("audio/wav")
            .map_err(Error::from)?;
        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", file);

        tracing::debug!(
            target: TRACING_TARGET,
            model = %self.model,
            audio_len = audio.len(),
            "Sending OpenAI transcription request"
        );

        let request = self.client.post("audio/transcriptions").multipart(form);
        let transcription: Transcription = self
            .client
            .send(request)
            .await?
            .json()
            .await
            .map_err(Error::from)?;

        Ok(transcription.text.trim().to_owned())
    }
}
