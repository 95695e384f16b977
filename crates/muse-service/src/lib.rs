#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for capability service calls.
pub const TRACING_TARGET_SERVICE: &str = "muse_service::service";

/// Tracing target for result cache operations.
pub const TRACING_TARGET_CACHE: &str = "muse_service::cache";

/// Tracing target for pipeline execution.
pub const TRACING_TARGET_PIPELINE: &str = "muse_service::pipeline";

/// Tracing target for task orchestration.
pub const TRACING_TARGET_ORCHESTRATOR: &str = "muse_service::orchestrator";

pub mod cache;
pub mod orchestrator;
pub mod pipeline;
pub mod recommendation;
pub mod service;

pub use cache::{CacheTtls, ResultCache};
pub use muse_core::{Error, ErrorKind, Result};
pub use orchestrator::{JobStatusReport, TaskOrchestrator};
pub use pipeline::{MultimodalPipeline, PipelineResult, TextPipeline, TextResponse};
pub use recommendation::RecommendationService;
pub use service::{LlmService, SttService, TtsService, VisionService};
