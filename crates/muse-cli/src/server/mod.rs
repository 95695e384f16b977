//! HTTP server startup and graceful shutdown.

mod error;
mod http_server;
mod lifecycle;
mod shutdown;

pub use error::{Result, ServerError};
pub use http_server::serve_http;
pub use shutdown::shutdown_signal;
