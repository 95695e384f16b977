//! Common error type definitions.

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur across muse components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// No adapter could be resolved for a capability.
    Configuration,
    /// An upstream provider call failed.
    Adapter,
    /// An essential pipeline stage produced no output.
    Pipeline,
    /// The cache backing store could not be reached.
    CacheUnavailable,
    /// The job queue or status backend failed in a way that may recover.
    QueueTransient,
    /// A job exceeded its time limit.
    Timeout,
    /// Serialization/deserialization error.
    Serialization,
    /// Input validation failed.
    InvalidInput,
    /// Resource not found.
    NotFound,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// Returns whether a job failing with this kind should be retried.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::QueueTransient | Self::Timeout | Self::Pipeline | Self::Adapter
        )
    }
}

/// A structured error type for muse operations.
#[derive(Debug, Error)]
#[error("{kind:?}{}", message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new adapter error.
    pub fn adapter() -> Self {
        Self::new(ErrorKind::Adapter)
    }

    /// Creates a new pipeline error.
    pub fn pipeline() -> Self {
        Self::new(ErrorKind::Pipeline)
    }

    /// Creates a new cache unavailable error.
    pub fn cache_unavailable() -> Self {
        Self::new(ErrorKind::CacheUnavailable)
    }

    /// Creates a new transient queue error.
    pub fn queue_transient() -> Self {
        Self::new(ErrorKind::QueueTransient)
    }

    /// Creates a new timeout error.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    /// Creates a new serialization error.
    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new not found error.
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates a new internal error.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns whether the failed operation may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns a short summary suitable for job failure records.
    pub fn summary(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => self.kind_str().to_owned(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization()
            .with_message(error.to_string())
            .with_source(error)
    }
}
