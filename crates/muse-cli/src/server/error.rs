//! Server error types.

use std::io;

use thiserror::Error;

/// Result type for server operations.
pub type Result<T, E = ServerError> = std::result::Result<T, E>;

/// Errors raised while starting or running the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Runtime server error.
    #[error("Runtime error: {0}")]
    Runtime(#[source] io::Error),
}

impl ServerError {
    /// Creates a bind error with address context.
    pub fn bind_error(address: impl ToString, source: io::Error) -> Self {
        Self::BindError {
            address: address.to_string(),
            source,
        }
    }

    /// Underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::BindError { source, .. } => source,
            Self::Runtime(source) => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_names_address() {
        let error = ServerError::bind_error(
            "127.0.0.1:8080",
            io::Error::from(io::ErrorKind::AddrInUse),
        );
        assert!(error.to_string().contains("127.0.0.1:8080"));
        assert_eq!(error.io_error().kind(), io::ErrorKind::AddrInUse);
    }
}
