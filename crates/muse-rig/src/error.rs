//! Internal error types for muse-rig.

use muse_core::Provider;
use thiserror::Error;

/// Result type alias for muse-rig operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Internal error type for provider calls.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Response body could not be decoded.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Completion request failed inside rig.
    #[error("{provider} completion failed: {message}")]
    Completion { provider: Provider, message: String },
    /// Upstream answered with a non-success status.
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: Provider,
        status: u16,
        body: String,
    },
    /// Upstream answered successfully but the payload had no usable content.
    #[error("{provider} returned an unexpected response: {message}")]
    Malformed { provider: Provider, message: String },
    /// Client could not be constructed.
    #[error("{provider} client configuration error: {message}")]
    Config { provider: Provider, message: String },
}

impl Error {
    pub(crate) fn malformed(provider: Provider, message: impl Into<String>) -> Self {
        Self::Malformed {
            provider,
            message: message.into(),
        }
    }

    pub(crate) fn config(provider: Provider, message: impl Into<String>) -> Self {
        Self::Config {
            provider,
            message: message.into(),
        }
    }
}

impl From<Error> for muse_core::Error {
    fn from(err: Error) -> Self {
        let message = match &err {
            Error::Reqwest(e) if e.is_timeout() => "request timed out".to_owned(),
            Error::Reqwest(e) if e.is_connect() => "connection failed".to_owned(),
            _ => err.to_string(),
        };

        let base = match err {
            Error::Config { .. } => muse_core::Error::configuration(),
            _ => muse_core::Error::adapter(),
        };
        base.with_message(message).with_source(err)
    }
}
