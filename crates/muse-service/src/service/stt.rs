//! Speech-to-text service.

use std::sync::Arc;

use jiff::Timestamp;
use muse_core::adapter::SttAdapter;
use muse_core::registry::AdapterRegistry;
use muse_core::{Capability, Provider, Result};

use super::{LazyAdapter, settle};

/// Speech-to-text façade.
#[derive(Clone)]
pub struct SttService {
    adapter: Arc<LazyAdapter<dyn SttAdapter>>,
}

impl SttService {
    /// Creates the service, optionally pinned to a provider.
    pub fn new(registry: AdapterRegistry, provider: Option<Provider>) -> Self {
        Self {
            adapter: Arc::new(LazyAdapter::new(
                registry,
                provider,
                AdapterRegistry::resolve_stt,
            )),
        }
    }

    /// Transcribes the audio clip.
    ///
    /// Returns `Ok(None)` when the provider failed or produced nothing.
    #[tracing::instrument(skip_all, fields(audio_len = audio.len()))]
    pub async fn transcribe(&self, audio: &[u8]) -> Result<Option<String>> {
        let adapter = self.adapter.get().await?;
        let started_at = Timestamp::now();
        let result = adapter
            .transcribe(audio)
            .await
            .map(|text| text.trim().to_owned());
        Ok(settle(
            Capability::Stt,
            adapter.provider(),
            started_at,
            result,
            String::is_empty,
        ))
    }
}

impl std::fmt::Debug for SttService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SttService")
            .field("provider", &self.adapter.provider)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use muse_core::mock::{MockAdapters, MockStt};

    use super::*;

    #[tokio::test]
    async fn transcribes_audio() {
        let mocks = MockAdapters::default();
        let service = SttService::new(mocks.registry(), None);
        assert_eq!(
            service.transcribe(b"RIFF").await.unwrap().as_deref(),
            Some("hello there")
        );
    }

    #[tokio::test]
    async fn provider_override_is_honoured() {
        let mocks = MockAdapters::default().with_stt(MockStt::replying(Provider::HuggingFace, "hf"));
        let service = SttService::new(mocks.registry(), Some(Provider::HuggingFace));
        assert_eq!(service.transcribe(b"RIFF").await.unwrap().as_deref(), Some("hf"));
    }

    #[tokio::test]
    async fn failure_becomes_none() {
        let mocks = MockAdapters::default().with_stt(MockStt::failing(Provider::OpenAi));
        let service = SttService::new(mocks.registry(), None);
        assert_eq!(service.transcribe(b"RIFF").await.unwrap(), None);
    }
}
