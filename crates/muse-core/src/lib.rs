#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for adapter registry operations.
pub const TRACING_TARGET_REGISTRY: &str = "muse_core::registry";

/// Tracing target for cache store operations.
pub const TRACING_TARGET_CACHE: &str = "muse_core::cache";

mod capability;
mod error;

pub mod adapter;
pub mod cache;
pub mod job;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;
pub mod registry;

pub use capability::{Capability, Provider};
pub use error::{BoxedError, Error, ErrorKind, Result};
