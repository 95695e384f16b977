//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! ```rust,no_run
//! use muse_server::handler::routes;
//! use muse_server::service::ServiceState;
//!
//! fn app(state: ServiceState) -> axum::Router {
//!     routes(state)
//! }
//! ```
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod error;
mod monitors;
mod processing;
pub mod request;
pub mod response;
mod tasks;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all routes, bound to the state.
pub fn routes(state: ServiceState) -> Router {
    let api_routes = Router::new()
        .merge(processing::routes())
        .merge(tasks::routes());

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(monitors::routes())
        .fallback(fallback)
        .with_state(state)
}
