//! Error types and utilities for NATS operations.

use std::time::Duration;

/// Result type for all NATS operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for NATS operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// NATS client/connection errors
    #[error("NATS connection error: {0}")]
    Connection(#[from] async_nats::Error),

    /// Serialization errors when sending or receiving messages
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timeout
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Message delivery failed
    #[error("Message delivery failed to subject '{subject}': {reason}")]
    DeliveryFailed { subject: String, reason: String },

    /// Stream operation failed
    #[error("Stream operation failed on '{stream}': {error}")]
    StreamError { stream: String, error: String },

    /// Consumer operation failed
    #[error("Consumer '{consumer}' error: {reason}")]
    ConsumerError { consumer: String, reason: String },

    /// KV key not found
    #[error("Key '{key}' not found in bucket '{bucket}'")]
    KvKeyNotFound { bucket: String, key: String },

    /// KV revision mismatch (optimistic concurrency failure)
    #[error("Revision mismatch for key '{key}' at revision {expected}")]
    KvRevisionMismatch { key: String, expected: u64 },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Generic operation error with context
    #[error("NATS operation failed: {operation} - {details}")]
    Operation { operation: String, details: String },
}

impl Error {
    /// Create a delivery failed error
    pub fn delivery_failed(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeliveryFailed {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Create a stream error
    pub fn stream_error(stream: impl Into<String>, error: impl Into<String>) -> Self {
        Self::StreamError {
            stream: stream.into(),
            error: error.into(),
        }
    }

    /// Create a consumer error
    pub fn consumer_error(consumer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConsumerError {
            consumer: consumer.into(),
            reason: reason.into(),
        }
    }

    /// Create an operation error with context
    pub fn operation(op: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Operation {
            operation: op.into(),
            details: details.into(),
        }
    }

    /// Create a KV key not found error
    pub fn kv_key_not_found(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::KvKeyNotFound {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a timeout error with the given duration
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { timeout: duration }
    }

    /// Returns whether retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Connection(_)
                | Error::Timeout { .. }
                | Error::DeliveryFailed { .. }
                | Error::KvRevisionMismatch { .. }
                | Error::Operation { .. }
        )
    }

    /// Converts into a cache outage for the fail-soft result cache.
    pub fn into_cache_error(self) -> muse_core::Error {
        muse_core::Error::cache_unavailable()
            .with_message(self.to_string())
            .with_source(self)
    }
}

impl From<Error> for muse_core::Error {
    fn from(error: Error) -> Self {
        let base = match &error {
            Error::KvKeyNotFound { .. } => muse_core::Error::not_found(),
            Error::InvalidConfig { .. } => muse_core::Error::configuration(),
            Error::Serialization(_) => muse_core::Error::serialization(),
            _ => muse_core::Error::queue_transient(),
        };
        base.with_message(error.to_string()).with_source(error)
    }
}
