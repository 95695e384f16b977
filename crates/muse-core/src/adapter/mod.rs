//! Capability adapter contracts.
//!
//! Each capability defines a single required operation plus a batch variant.
//! The batch variant defaults to sequential calls; adapters backed by a real
//! batch API override it and report so through `supports_batch`. Callers must
//! not assume a batch call is faster unless the adapter advertises it.

use std::sync::Arc;

use bytes::Bytes;

use crate::{Capability, Provider, Result};

/// Text generation from a prompt.
#[async_trait::async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Provider backing this adapter.
    fn provider(&self) -> Provider;

    /// Generates a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Whether `generate_batch` uses a native batch API.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Generates completions for several prompts.
    async fn generate_batch(&self, prompts: &[String]) -> Result<Vec<String>> {
        let mut outputs = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            outputs.push(self.generate(prompt).await?);
        }
        Ok(outputs)
    }
}

/// Image captioning.
#[async_trait::async_trait]
pub trait VisionAdapter: Send + Sync {
    /// Provider backing this adapter.
    fn provider(&self) -> Provider;

    /// Describes the raw image bytes.
    async fn describe(&self, image: &[u8]) -> Result<String>;

    /// Whether `describe_batch` uses a native batch API.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Describes several images.
    async fn describe_batch(&self, images: &[Bytes]) -> Result<Vec<String>> {
        let mut outputs = Vec::with_capacity(images.len());
        for image in images {
            outputs.push(self.describe(image).await?);
        }
        Ok(outputs)
    }
}

/// Speech-to-text transcription.
#[async_trait::async_trait]
pub trait SttAdapter: Send + Sync {
    /// Provider backing this adapter.
    fn provider(&self) -> Provider;

    /// Transcribes the raw audio bytes.
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;

    /// Whether `transcribe_batch` uses a native batch API.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Transcribes several audio clips.
    async fn transcribe_batch(&self, clips: &[Bytes]) -> Result<Vec<String>> {
        let mut outputs = Vec::with_capacity(clips.len());
        for clip in clips {
            outputs.push(self.transcribe(clip).await?);
        }
        Ok(outputs)
    }
}

/// Text-to-speech synthesis.
#[async_trait::async_trait]
pub trait TtsAdapter: Send + Sync {
    /// Provider backing this adapter.
    fn provider(&self) -> Provider;

    /// Synthesizes speech for the given text, returning encoded audio.
    async fn speak(&self, text: &str) -> Result<Bytes>;

    /// Whether `speak_batch` uses a native batch API.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Synthesizes speech for several texts.
    async fn speak_batch(&self, texts: &[String]) -> Result<Vec<Bytes>> {
        let mut outputs = Vec::with_capacity(texts.len());
        for text in texts {
            outputs.push(self.speak(text).await?);
        }
        Ok(outputs)
    }
}

/// A resolved adapter tagged with the capability it serves.
#[derive(Clone)]
pub enum AdapterHandle {
    Llm(Arc<dyn LlmAdapter>),
    Vision(Arc<dyn VisionAdapter>),
    Stt(Arc<dyn SttAdapter>),
    Tts(Arc<dyn TtsAdapter>),
}

impl AdapterHandle {
    /// Capability served by the wrapped adapter.
    pub fn capability(&self) -> Capability {
        match self {
            Self::Llm(_) => Capability::Llm,
            Self::Vision(_) => Capability::Vision,
            Self::Stt(_) => Capability::Stt,
            Self::Tts(_) => Capability::Tts,
        }
    }

    /// Provider backing the wrapped adapter.
    pub fn provider(&self) -> Provider {
        match self {
            Self::Llm(a) => a.provider(),
            Self::Vision(a) => a.provider(),
            Self::Stt(a) => a.provider(),
            Self::Tts(a) => a.provider(),
        }
    }

    pub fn into_llm(self) -> Option<Arc<dyn LlmAdapter>> {
        match self {
            Self::Llm(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_vision(self) -> Option<Arc<dyn VisionAdapter>> {
        match self {
            Self::Vision(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_stt(self) -> Option<Arc<dyn SttAdapter>> {
        match self {
            Self::Stt(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_tts(self) -> Option<Arc<dyn TtsAdapter>> {
        match self {
            Self::Tts(a) => Some(a),
            _ => None,
        }
    }
}

impl std::fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("capability", &self.capability())
            .field("provider", &self.provider())
            .finish()
    }
}
