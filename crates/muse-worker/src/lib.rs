#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the consumer loops.
pub const TRACING_TARGET_POOL: &str = "muse_worker::pool";

/// Tracing target for job execution.
pub const TRACING_TARGET_EXECUTOR: &str = "muse_worker::executor";

mod config;
mod error;
mod executor;
mod pool;

pub use config::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_RETRY_DELAY_SECS, JobLimits,
    WorkerConfig,
};
pub use error::{Result, WorkerError};
pub use executor::JobExecutor;
pub use pool::{WorkerPool, attach_consumers};
