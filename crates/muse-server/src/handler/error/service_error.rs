//! Service error to HTTP error conversion.

use muse_core::ErrorKind as ServiceErrorKind;

use super::http_error::{Error as HttpError, ErrorKind};

/// Tracing target for service error conversion.
const TRACING_TARGET: &str = "muse_server::handler::error";

impl From<muse_core::Error> for HttpError<'static> {
    fn from(error: muse_core::Error) -> Self {
        let summary = error.summary();
        match error.kind() {
            ServiceErrorKind::InvalidInput | ServiceErrorKind::Serialization => {
                ErrorKind::BadRequest.with_message(summary)
            }
            ServiceErrorKind::NotFound => ErrorKind::NotFound.with_message(summary),
            ServiceErrorKind::Pipeline => ErrorKind::BadGateway.with_context(summary),
            ServiceErrorKind::Configuration => {
                tracing::error!(target: TRACING_TARGET, error = %error, "No provider available");
                ErrorKind::ServiceUnavailable.with_context(summary)
            }
            ServiceErrorKind::QueueTransient => {
                tracing::error!(target: TRACING_TARGET, error = %error, "Job backend unreachable");
                ErrorKind::ServiceUnavailable.with_context("job backend unreachable")
            }
            ServiceErrorKind::Adapter
            | ServiceErrorKind::CacheUnavailable
            | ServiceErrorKind::Timeout
            | ServiceErrorKind::Internal => {
                tracing::error!(target: TRACING_TARGET, error = %error, "Request failed");
                ErrorKind::InternalServerError.into_error()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    fn status(error: muse_core::Error) -> StatusCode {
        HttpError::from(error).kind().status_code()
    }

    #[test]
    fn maps_service_kinds_to_status_codes() {
        assert_eq!(
            status(muse_core::Error::invalid_input().with_message("bad base64")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(muse_core::Error::pipeline()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(muse_core::Error::configuration()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(muse_core::Error::queue_transient()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(muse_core::Error::adapter()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(muse_core::Error::timeout()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let error = HttpError::from(
            muse_core::Error::internal().with_message("secret connection string"),
        );
        assert_eq!(error.message(), None);
        assert_eq!(error.context(), None);
    }
}
