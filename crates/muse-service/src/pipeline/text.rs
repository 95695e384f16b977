use serde::{Deserialize, Serialize};

use crate::recommendation::RecommendationService;
use crate::service::LlmService;
use crate::{Result, TRACING_TARGET_PIPELINE};

/// Generated reply together with products related to the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Text generation plus recommendations for the same input.
#[derive(Debug, Clone)]
pub struct TextPipeline {
    llm: LlmService,
    recommendations: RecommendationService,
}

impl TextPipeline {
    pub fn new(llm: LlmService, recommendations: RecommendationService) -> Self {
        Self {
            llm,
            recommendations,
        }
    }

    /// Generates a reply and ranks recommendations for `text`.
    ///
    /// A failed generation leaves `response_text` empty; recommendations are
    /// computed regardless.
    pub async fn run(&self, text: &str) -> Result<TextResponse> {
        let response_text = self.llm.generate(text).await?;
        let recommendations = self.recommendations.recommend(text);

        tracing::debug!(
            target: TRACING_TARGET_PIPELINE,
            generated = response_text.is_some(),
            recommendations = recommendations.len(),
            "Text pipeline finished"
        );

        Ok(TextResponse {
            response_text,
            recommendations,
        })
    }
}
