//! Middleware for `axum::Router`.
//!
//! ```rust,no_run
//! use axum::Router;
//! use muse_server::middleware::{RecoveryConfig, RouterObservabilityExt, RouterRecoveryExt};
//!
//! let app: Router = Router::new()
//!     .with_recovery(&RecoveryConfig::default())
//!     .with_metrics()
//!     .with_observability();
//! ```

mod observability;
mod recovery;

pub use observability::{RouterObservabilityExt, track_request_timing};
pub use recovery::{
    DEFAULT_MAX_BODY_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS, RecoveryConfig, RouterRecoveryExt,
};
