//! Worker error types.

use std::borrow::Cow;

/// Result type alias for worker operations.
pub type Result<T, E = WorkerError> = std::result::Result<T, E>;

/// Worker error type.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Failed to attach to a job queue.
    #[error("subscription failed: {0}")]
    Subscription(#[from] muse_nats::Error),

    /// Worker configuration is inconsistent.
    #[error("invalid worker configuration: {reason}")]
    InvalidConfig { reason: Cow<'static, str> },

    /// A worker loop stopped abnormally.
    #[error("worker failed: {message}")]
    Processing {
        message: Cow<'static, str>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl WorkerError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Creates a processing error with a message.
    pub fn processing(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Processing {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a processing error with a message and source.
    pub fn processing_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<WorkerError> for muse_core::Error {
    fn from(error: WorkerError) -> Self {
        match error {
            WorkerError::Subscription(error) => error.into(),
            WorkerError::InvalidConfig { reason } => {
                muse_core::Error::configuration().with_message(reason)
            }
            error @ WorkerError::Processing { .. } => muse_core::Error::internal()
                .with_message(error.to_string())
                .with_source(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use muse_core::ErrorKind;

    use super::*;

    #[test]
    fn invalid_config_is_a_configuration_error() {
        let error: muse_core::Error = WorkerError::invalid_config("soft limit above hard").into();
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert!(!error.is_retryable());
    }

    #[test]
    fn processing_keeps_message() {
        let error = WorkerError::processing("consumer loop panicked");
        assert_eq!(error.to_string(), "worker failed: consumer loop panicked");
        assert_eq!(muse_core::Error::from(error).kind(), ErrorKind::Internal);
    }
}
