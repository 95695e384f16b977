use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Reply of the synchronous capability endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
}

impl AssistantResponse {
    /// Builds a reply, encoding narrated audio when present.
    pub fn new(response_text: String, recommendations: Vec<String>, audio: Option<Bytes>) -> Self {
        Self {
            response_text: Some(response_text),
            recommendations: Some(recommendations),
            audio_base64: audio
                .filter(|audio| !audio.is_empty())
                .map(|audio| STANDARD.encode(audio)),
        }
    }
}
