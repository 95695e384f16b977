use muse_core::Provider;
use muse_core::adapter::LlmAdapter;
use serde_json::json;

use super::{GeneratedText, HuggingFaceClient, first_generated};
use crate::TRACING_TARGET;

const MAX_NEW_TOKENS: u32 = 150;

/// Text generation through the Inference API.
#[derive(Debug, Clone)]
pub struct HuggingFaceLlm {
    client: HuggingFaceClient,
    model: String,
}

impl HuggingFaceLlm {
    pub fn new(client: HuggingFaceClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl LlmAdapter for HuggingFaceLlm {
    fn provider(&self) -> Provider {
        Provider::HuggingFace
    }

    async fn generate(&self, prompt: &str) -> muse_core::Result<String> {
        tracing::debug!(
            target: TRACING_TARGET,
            model = %self.model,
            prompt_len = prompt.len(),
            "Sending HuggingFace text generation request"
        );

        let body = json!({
            "inputs": prompt,
            "parameters": { "max_new_tokens": MAX_NEW_TOKENS },
        });
        let items: Vec<GeneratedText> = self.client.infer_json(&self.model, &body).await?;
        Ok(first_generated(items)?)
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    use super::*;
    use crate::huggingface::tests::client;

    #[tokio::test]
    async fn reads_generated_text() {
        let router = Router::new().route(
            "/gpt2",
            post(|Json(body): Json<Value>| async move {
                let text = if body["parameters"]["max_new_tokens"] == 150 {
                    "Test response"
                } else {
                    "unexpected request"
                };
                Json(json!([{ "generated_text": text }]))
            }),
        );

        let llm = HuggingFaceLlm::new(client(router).await, "gpt2");
        assert_eq!(llm.generate("Test prompt").await.unwrap(), "Test response");
    }
}
