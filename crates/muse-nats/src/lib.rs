#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for NATS client operations.
///
/// Use this target for logging client initialization, configuration, and client-level errors.
pub const TRACING_TARGET_CLIENT: &str = "muse_nats::client";

/// Tracing target for NATS key-value store operations.
///
/// Use this target for logging KV bucket operations, cache reads and writes, and job records.
pub const TRACING_TARGET_KV: &str = "muse_nats::kv";

/// Tracing target for NATS job queue operations.
///
/// Use this target for logging stream setup, publishing, pulls and acknowledgements.
pub const TRACING_TARGET_QUEUE: &str = "muse_nats::queue";

/// Tracing target for NATS connection operations.
///
/// Use this target for logging connection establishment, reconnection, and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "muse_nats::connection";

mod backend;
mod client;
mod error;
pub mod kv;
pub mod queue;
mod retry;

// Re-export async_nats types needed by consumers
pub use async_nats::jetstream;
pub use backend::NatsJobBackend;
pub use client::{MAX_RECONNECT_DELAY, NatsClient, NatsConfig};
pub use error::{Error, Result};
pub use retry::RetryPolicy;
