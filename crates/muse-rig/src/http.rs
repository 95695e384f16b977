//! Shared reqwest client.

use std::sync::Arc;

use muse_core::Provider;
use reqwest::{Client, Response};

use crate::config::AdapterConfig;
use crate::error::{Error, Result};

/// Longest upstream error body kept in error messages.
const MAX_ERROR_BODY: usize = 512;

/// Cheaply cloneable HTTP client shared by every reqwest-backed adapter.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Arc<Client>,
}

impl HttpClient {
    /// Builds a client with the configured timeout and user agent.
    pub fn new(config: &AdapterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            inner: Arc::new(client),
        })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.inner
    }
}

/// Turns a non-success response into [`Error::Status`].
pub(crate) async fn ensure_success(provider: Provider, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY)
        .collect();

    Err(Error::Status {
        provider,
        status: status.as_u16(),
        body,
    })
}
