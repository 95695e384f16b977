//! OpenAI adapters.
//!
//! Text generation goes through `rig`'s chat completions client. Vision,
//! transcription and speech use the REST endpoints directly.

mod llm;
mod stt;
mod tts;
mod vision;

pub use llm::OpenAiLlm;
use muse_core::Provider;
use reqwest::RequestBuilder;
pub use stt::OpenAiStt;
pub use tts::OpenAiTts;
pub use vision::OpenAiVision;

use crate::error::{Error, Result};
use crate::http::{HttpClient, ensure_success};

/// Default base URL of the OpenAI REST API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Authenticated access to the OpenAI REST API.
#[derive(Clone)]
pub struct OpenAiClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Creates a client; a blank key is a configuration error.
    pub fn new(http: HttpClient, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config(Provider::OpenAi, "API key is empty"));
        }

        Ok(Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_owned(),
        })
    }

    /// Overrides the base URL (proxies, compatible servers, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .client()
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        ensure_success(Provider::OpenAi, response).await
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;

    #[test]
    fn blank_key_is_rejected() {
        let http = HttpClient::new(&AdapterConfig::default()).unwrap();
        assert!(OpenAiClient::new(http, "  ").is_err());
    }

    #[test]
    fn debug_hides_api_key() {
        let http = HttpClient::new(&AdapterConfig::default()).unwrap();
        let client = OpenAiClient::new(http, "sk-secret").unwrap();
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}
