//! HuggingFace Inference API adapters.
//!
//! Every task posts to `<base>/<model>`: JSON for text generation and raw
//! bytes for image captioning and speech recognition.

mod llm;
mod stt;
mod vision;

pub use llm::HuggingFaceLlm;
use muse_core::Provider;
use serde::de::DeserializeOwned;
pub use stt::HuggingFaceStt;
pub use vision::HuggingFaceVision;

use crate::error::{Error, Result};
use crate::http::{HttpClient, ensure_success};

/// Default base URL of the hosted Inference API.
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// Authenticated access to the HuggingFace Inference API.
#[derive(Clone)]
pub struct HuggingFaceClient {
    http: HttpClient,
    token: String,
    base_url: String,
}

impl HuggingFaceClient {
    /// Creates a client; a blank token is a configuration error.
    pub fn new(http: HttpClient, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::config(Provider::HuggingFace, "API token is empty"));
        }

        Ok(Self {
            http,
            token,
            base_url: DEFAULT_BASE_URL.to_owned(),
        })
    }

    /// Overrides the base URL (self-hosted endpoints, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{model}", self.base_url)
    }

    /// Posts a JSON body to a model and decodes the reply.
    async fn infer_json<B, T>(&self, model: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .http
            .client()
            .post(self.model_url(model))
            .bearer_auth(&self.token)
            .json(body);
        let response = ensure_success(Provider::HuggingFace, request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Posts raw bytes to a model and decodes the reply.
    async fn infer_bytes<T: DeserializeOwned>(&self, model: &str, payload: &[u8]) -> Result<T> {
        let request = self
            .http
            .client()
            .post(self.model_url(model))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload.to_vec());
        let response = ensure_success(Provider::HuggingFace, request.send().await?).await?;
        Ok(response.json().await?)
    }
}

impl std::fmt::Debug for HuggingFaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// `[{"generated_text": ...}]`, shared by text generation and captioning.
#[derive(Debug, serde::Deserialize)]
struct GeneratedText {
    generated_text: String,
}

fn first_generated(items: Vec<GeneratedText>) -> Result<String> {
    items
        .into_iter()
        .next()
        .map(|item| item.generated_text.trim().to_owned())
        .ok_or_else(|| Error::malformed(Provider::HuggingFace, "empty inference result"))
}
