//! HTTP server startup.

use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::lifecycle::{handle_result, log_security_warnings, log_suggestion};
use super::{Result, ServerError, shutdown_signal};
use crate::TRACING_TARGET_SERVER_STARTUP;
use crate::config::ServerConfig;

/// Binds the configured address and serves `app` until shutdown.
///
/// Shutdown starts on SIGTERM, Ctrl+C, or when `cancel` fires, and always
/// cancels `cancel` so background work stops with the server.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails
/// while running.
pub async fn serve_http(
    app: Router,
    server_config: &ServerConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let server_addr = server_config.server_addr();

    let listener = match TcpListener::bind(server_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_STARTUP,
                addr = %server_addr,
                error = %err,
                "Failed to bind to address"
            );
            log_suggestion(&err);
            return Err(ServerError::bind_error(server_addr, err));
        }
    };

    log_security_warnings(server_config);
    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %server_addr,
        "Server is ready and listening for connections"
    );

    let start_time = Instant::now();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await;

    handle_result(result, start_time)
}
