use muse_core::Provider;
use muse_core::adapter::VisionAdapter;

use super::{GeneratedText, HuggingFaceClient, first_generated};
use crate::TRACING_TARGET;

/// Image captioning through the Inference API.
#[derive(Debug, Clone)]
pub struct HuggingFaceVision {
    client: HuggingFaceClient,
    model: String,
}

impl HuggingFaceVision {
    pub fn new(client: HuggingFaceClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl VisionAdapter for HuggingFaceVision {
    fn provider(&self) -> Provider {
        Provider::HuggingFace
    }

    async fn describe(&self, image: &[u8]) -> muse_core::Result<String> {
        tracing::debug!(
            target: TRACING_TARGET,
            model = %self.model,
            image_len = image.len(),
            "Sending HuggingFace image-to-text request"
        );

        let items: Vec<GeneratedText> = self.client.infer_bytes(&self.model, image).await?;
        Ok(first_generated(items)?)
    }
}
