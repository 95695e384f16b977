#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for provider calls.
pub const TRACING_TARGET: &str = "muse_rig::adapter";

mod config;
mod error;
pub mod gtts;
mod http;
pub mod huggingface;
pub mod openai;
mod registry;

pub use crate::config::{AdapterConfig, DEFAULT_TIMEOUT};
pub use crate::error::{Error, Result};
pub use crate::http::HttpClient;
pub use crate::registry::default_registry;
