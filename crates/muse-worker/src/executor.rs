//! Job body execution.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use muse_core::job::{JobOutput, JobPayload};
use muse_core::{Error, Result};
use muse_service::{LlmService, MultimodalPipeline};
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_EXECUTOR;

/// Runs job payloads against the capability services.
///
/// Job bodies only regenerate their output, so executing the same payload
/// twice after a redelivery is harmless.
#[derive(Debug, Clone)]
pub struct JobExecutor {
    llm: LlmService,
    pipeline: MultimodalPipeline,
}

impl JobExecutor {
    pub fn new(llm: LlmService, pipeline: MultimodalPipeline) -> Self {
        Self { llm, pipeline }
    }

    /// Executes one payload.
    ///
    /// `cancel` is the soft time limit signal; it is observed between
    /// stages and surfaces as a `Timeout` error.
    #[tracing::instrument(skip_all, fields(kind = %payload.kind()), target = TRACING_TARGET_EXECUTOR)]
    pub async fn execute(
        &self,
        payload: &JobPayload,
        cancel: &CancellationToken,
    ) -> Result<JobOutput> {
        match payload {
            JobPayload::LlmGenerate { prompt } => {
                if cancel.is_cancelled() {
                    return Err(Error::timeout().with_message("soft time limit exceeded"));
                }
                match self.llm.generate(prompt).await? {
                    Some(text) => Ok(JobOutput::Text(text)),
                    None => {
                        tracing::warn!(
                            target: TRACING_TARGET_EXECUTOR,
                            "Text generation returned nothing"
                        );
                        Err(Error::pipeline().with_message("generation produced no text"))
                    }
                }
            }
            JobPayload::MultimodalPipeline { image_base64 } => {
                let image = STANDARD.decode(image_base64.trim()).map_err(|e| {
                    Error::invalid_input()
                        .with_message("image is not valid base64")
                        .with_source(e)
                })?;
                let result = self.pipeline.run_with_cancel(&image, cancel).await?;
                JobOutput::structured(&result)
            }
        }
    }
}
