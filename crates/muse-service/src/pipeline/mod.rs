//! Composite pipelines built from the capability services.

mod multimodal;
mod text;

pub use multimodal::{MultimodalPipeline, PipelineResult};
pub use text::{TextPipeline, TextResponse};
