//! Server lifecycle logging.

use std::io;
use std::time::Instant;

use super::{Result, ServerError};
use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Logs security warnings for potentially unsafe configurations.
pub(super) fn log_security_warnings(config: &ServerConfig) {
    if config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Server bound to all interfaces, ensure the firewall is configured"
        );
    }
}

/// Handles the server result and logs appropriate messages.
pub(super) fn handle_result(result: io::Result<()>, start_time: Instant) -> Result<()> {
    let uptime = start_time.elapsed();

    match result {
        Ok(()) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                uptime_secs = uptime.as_secs(),
                "HTTP server stopped"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %err,
                kind = ?err.kind(),
                uptime_secs = uptime.as_secs(),
                "Fatal error"
            );
            log_suggestion(&err);
            Err(ServerError::Runtime(err))
        }
    }
}

/// Logs a recovery suggestion for the error, if one is known.
pub(super) fn log_suggestion(err: &io::Error) {
    if let Some(suggestion) = error_suggestion(err) {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            suggestion = suggestion,
            "Recovery suggestion"
        );
    }
}

/// Provides a human-readable suggestion for resolving an IO error.
fn error_suggestion(err: &io::Error) -> Option<&'static str> {
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            Some("Try using a port above 1024 or run with appropriate privileges")
        }
        io::ErrorKind::AddrInUse => {
            Some("The port is already in use. Try a different port or stop the conflicting service")
        }
        io::ErrorKind::AddrNotAvailable => {
            Some("The address is not available. Check network interface configuration")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_fix_for_port_in_use() {
        let err = io::Error::from(io::ErrorKind::AddrInUse);
        assert!(error_suggestion(&err).is_some_and(|s| s.contains("already in use")));
        assert!(error_suggestion(&io::Error::other("boom")).is_none());
    }

    #[test]
    fn runtime_errors_are_wrapped() {
        let result = handle_result(Err(io::Error::other("boom")), Instant::now());
        assert!(matches!(result, Err(ServerError::Runtime(_))));
    }
}
