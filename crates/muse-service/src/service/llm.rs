//! Text generation service.

use std::sync::Arc;

use jiff::Timestamp;
use muse_core::adapter::LlmAdapter;
use muse_core::registry::AdapterRegistry;
use muse_core::{Capability, Provider, Result};

use super::{LazyAdapter, settle};

/// Text generation façade.
#[derive(Clone)]
pub struct LlmService {
    adapter: Arc<LazyAdapter<dyn LlmAdapter>>,
}

impl LlmService {
    /// Creates the service, optionally pinned to a provider.
    pub fn new(registry: AdapterRegistry, provider: Option<Provider>) -> Self {
        Self {
            adapter: Arc::new(LazyAdapter::new(
                registry,
                provider,
                AdapterRegistry::resolve_llm,
            )),
        }
    }

    /// Provider override, if any.
    pub fn provider(&self) -> Option<Provider> {
        self.adapter.provider
    }

    /// Generates text for the prompt.
    ///
    /// Returns `Ok(None)` when the provider failed or produced nothing.
    #[tracing::instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str) -> Result<Option<String>> {
        let adapter = self.adapter.get().await?;
        let started_at = Timestamp::now();
        let result = adapter
            .generate(prompt)
            .await
            .map(|text| text.trim().to_owned());
        Ok(settle(
            Capability::Llm,
            adapter.provider(),
            started_at,
            result,
            String::is_empty,
        ))
    }

    /// Generates text for several prompts through the adapter's batch API.
    ///
    /// The whole batch is reported as unavailable when any prompt fails.
    pub async fn generate_batch(&self, prompts: &[String]) -> Result<Option<Vec<String>>> {
        let adapter = self.adapter.get().await?;
        let started_at = Timestamp::now();
        let result = adapter.generate_batch(prompts).await;
        Ok(settle(
            Capability::Llm,
            adapter.provider(),
            started_at,
            result,
            |outputs| outputs.len() != prompts.len(),
        ))
    }
}

impl std::fmt::Debug for LlmService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmService")
            .field("provider", &self.adapter.provider)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use muse_core::ErrorKind;
    use muse_core::mock::{MockAdapters, MockLlm};
    use muse_core::registry::ProviderCredentials;

    use super::*;

    #[tokio::test]
    async fn returns_trimmed_text() {
        let mocks = MockAdapters::default()
            .with_llm(MockLlm::replying(Provider::OpenAi, "  Test response  "));
        let service = LlmService::new(mocks.registry(), None);
        assert_eq!(
            service.generate("Test prompt").await.unwrap().as_deref(),
            Some("Test response")
        );
    }

    #[tokio::test]
    async fn adapter_failure_becomes_none() {
        let mocks = MockAdapters::default().with_llm(MockLlm::failing(Provider::OpenAi));
        let service = LlmService::new(mocks.registry(), None);
        assert_eq!(service.generate("hi").await.unwrap(), None);
        assert_eq!(mocks.llm.calls(), 1);
    }

    #[tokio::test]
    async fn blank_output_becomes_none() {
        let mocks = MockAdapters::default().with_llm(MockLlm::replying(Provider::OpenAi, "   "));
        let service = LlmService::new(mocks.registry(), None);
        assert_eq!(service.generate("hi").await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_configuration_is_an_error() {
        let registry = AdapterRegistry::builder(ProviderCredentials::new()).build();
        let service = LlmService::new(registry, None);
        let error = service.generate("hi").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn batch_defaults_to_sequential_calls() {
        let mocks = MockAdapters::default();
        let service = LlmService::new(mocks.registry(), None);
        let prompts = vec!["a".to_owned(), "b".to_owned(), "c".to_owned()];
        let outputs = service.generate_batch(&prompts).await.unwrap().unwrap();
        assert_eq!(outputs.len(), 3);
        assert_eq!(mocks.llm.calls(), 3);
    }
}
