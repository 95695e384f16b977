use muse_core::Provider;
use muse_core::adapter::LlmAdapter;
use rig::completion::{AssistantContent, CompletionError, CompletionModel as RigCompletionModel};
use rig::one_or_many::OneOrMany;
use rig::prelude::CompletionClient;
use rig::providers::openai;

use crate::TRACING_TARGET;
use crate::error::{Error, Result};

/// Maximum tokens requested per completion.
const MAX_TOKENS: u64 = 150;

/// OpenAI chat completions through `rig`.
pub struct OpenAiLlm {
    model: openai::CompletionModel,
    model_name: String,
}

impl OpenAiLlm {
    /// Creates the adapter for the given model.
    pub fn new(api_key: &str, model_name: impl Into<String>) -> Result<Self> {
        let model_name = model_name.into();
        let client = openai::Client::new(api_key)
            .map_err(|e| Error::config(Provider::OpenAi, e.to_string()))?
            .completions_api();

        Ok(Self {
            model: client.completion_model(model_name.as_str()),
            model_name,
        })
    }

    /// Returns the model name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait::async_trait]
impl LlmAdapter for OpenAiLlm {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn generate(&self, prompt: &str) -> muse_core::Result<String> {
        tracing::debug!(
            target: TRACING_TARGET,
            model = %self.model_name,
            prompt_len = prompt.len(),
            "Sending OpenAI completion"
        );

        let map_err = |e: CompletionError| Error::Completion {
            provider: Provider::OpenAi,
            message: e.to_string(),
        };

        let response = self
            .model
            .completion_request(prompt)
            .max_tokens(MAX_TOKENS)
            .send()
            .await
            .map_err(map_err)?;

        Ok(extract_text_content(&response.choice).trim().to_owned())
    }
}

impl std::fmt::Debug for OpenAiLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiLlm")
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

/// Concatenates the text parts of an assistant reply.
fn extract_text_content(choice: &OneOrMany<AssistantContent>) -> String {
    choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(text) => Some(text.text()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}
