//! Text-to-speech service.

use std::sync::Arc;

use bytes::Bytes;
use jiff::Timestamp;
use muse_core::adapter::TtsAdapter;
use muse_core::registry::AdapterRegistry;
use muse_core::{Capability, Provider, Result};

use super::{LazyAdapter, settle};

/// Text-to-speech façade.
#[derive(Clone)]
pub struct TtsService {
    adapter: Arc<LazyAdapter<dyn TtsAdapter>>,
}

impl TtsService {
    /// Creates the service, optionally pinned to a provider.
    pub fn new(registry: AdapterRegistry, provider: Option<Provider>) -> Self {
        Self {
            adapter: Arc::new(LazyAdapter::new(
                registry,
                provider,
                AdapterRegistry::resolve_tts,
            )),
        }
    }

    /// Synthesizes speech for the text.
    ///
    /// Returns `Ok(None)` when the provider failed or produced no audio.
    #[tracing::instrument(skip_all, fields(text_len = text.len()))]
    pub async fn speak(&self, text: &str) -> Result<Option<Bytes>> {
        let adapter = self.adapter.get().await?;
        let started_at = Timestamp::now();
        let result = adapter.speak(text).await;
        Ok(settle(
            Capability::Tts,
            adapter.provider(),
            started_at,
            result,
            Bytes::is_empty,
        ))
    }
}

impl std::fmt::Debug for TtsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsService")
            .field("provider", &self.adapter.provider)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use muse_core::mock::{MockAdapters, MockTts};

    use super::*;

    #[tokio::test]
    async fn returns_audio() {
        let mocks = MockAdapters::default();
        let service = TtsService::new(mocks.registry(), None);
        let audio = service.speak("hello").await.unwrap().unwrap();
        assert_eq!(&audio[..], b"ID3mock");
    }

    #[tokio::test]
    async fn empty_audio_becomes_none() {
        let mocks = MockAdapters::default().with_tts(MockTts::replying(Provider::OpenAi, Bytes::new()));
        let service = TtsService::new(mocks.registry(), None);
        assert_eq!(service.speak("hello").await.unwrap(), None);
    }
}
