use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use muse_core::Provider;
use muse_core::adapter::VisionAdapter;
use serde::Deserialize;
use serde_json::json;

use super::OpenAiClient;
use crate::TRACING_TARGET;
use crate::error::Error;

const PROMPT: &str = "What's in this image?";
const MAX_TOKENS: u32 = 100;

/// Image captioning through OpenAI chat completions with an inline image.
#[derive(Debug, Clone)]
pub struct OpenAiVision {
    client: OpenAiClient,
    model: String,
}

impl OpenAiVision {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait::async_trait]
impl VisionAdapter for OpenAiVision {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn describe(&self, image: &[u8]) -> muse_core::Result<String> {
        let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(image));
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ],
            }],
            "max_tokens": MAX_TOKENS,
        });

        tracing::debug!(
            target: TRACING_TARGET,
            model = %self.model,
            image_len = image.len(),
            "Sending OpenAI vision request"
        );

        let request = self.client.post("chat/completions").json(&body);
        let completion: ChatCompletion = self
            .client
            .send(request)
            .await?
            .json()
            .await
            .map_err(Error::from)?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::malformed(Provider::OpenAi, "completion has no content"))?;

        Ok(content.trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    use super::*;
    use crate::config::AdapterConfig;
    use crate::http::{HttpClient, test_server};

    async fn client(router: Router) -> OpenAiClient {
        let base_url = test_server::serve(router).await;
        let http = HttpClient::new(&AdapterConfig::default()).unwrap();
        OpenAiClient::new(http, "sk-test")
            .unwrap()
            .with_base_url(base_url)
    }

    #[tokio::test]
    async fn sends_inline_image_and_reads_caption() {
        let router = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<Value>| async move {
                let url = body["messages"][0]["content"][1]["image_url"]["url"]
                    .as_str()
                    .unwrap_or_default()
                    .to_owned();
                let caption = if url == "data:image/jpeg;base64,aW1n" && body["max_tokens"] == 100 {
                    " a cat on a sofa "
                } else {
                    "unexpected request"
                };
                Json(json!({ "choices": [{ "message": { "content": caption } }] }))
            }),
        );

        let vision = OpenAiVision::new(client(router).await, "gpt-4o");
        assert_eq!(vision.describe(b"img").await.unwrap(), "a cat on a sofa");
    }

    #[tokio::test]
    async fn upstream_error_is_adapter_error() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad key") }),
        );

        let vision = OpenAiVision::new(client(router).await, "gpt-4o");
        let error = vision.describe(b"img").await.err().unwrap();
        assert_eq!(error.kind(), muse_core::ErrorKind::Adapter);
        assert!(error.summary().contains("401"));
    }
}
