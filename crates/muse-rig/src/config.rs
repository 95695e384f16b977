//! Adapter configuration: model names and HTTP settings.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default request timeout for provider calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Model selection and HTTP settings for the concrete adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct AdapterConfig {
    /// OpenAI model used for text generation.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAI_LLM_MODEL", default_value = "gpt-4o-mini")
    )]
    pub openai_llm_model: String,

    /// OpenAI model used for image captioning.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAI_VISION_MODEL", default_value = "gpt-4o")
    )]
    pub openai_vision_model: String,

    /// OpenAI model used for transcription.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAI_STT_MODEL", default_value = "whisper-1")
    )]
    pub openai_stt_model: String,

    /// OpenAI model used for speech synthesis.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAI_TTS_MODEL", default_value = "tts-1")
    )]
    pub openai_tts_model: String,

    /// OpenAI voice used for speech synthesis.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "OPENAI_TTS_VOICE", default_value = "alloy")
    )]
    pub openai_tts_voice: String,

    /// HuggingFace model used for text generation.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "HF_LLM_MODEL", default_value = "gpt2")
    )]
    pub hf_llm_model: String,

    /// HuggingFace model used for image captioning.
    #[cfg_attr(
        feature = "config",
        arg(
            long,
            env = "HF_VISION_MODEL",
            default_value = "Salesforce/blip-image-captioning-base"
        )
    )]
    pub hf_vision_model: String,

    /// HuggingFace model used for transcription.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "HF_STT_MODEL", default_value = "openai/whisper-tiny")
    )]
    pub hf_stt_model: String,

    /// Language passed to the Google TTS endpoint.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "GTTS_LANGUAGE", default_value = "en")
    )]
    pub gtts_language: String,

    /// Per-request timeout for provider calls in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "adapter-timeout", env = "ADAPTER_TIMEOUT", default_value_t = 60)
    )]
    pub timeout_secs: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            openai_llm_model: "gpt-4o-mini".to_owned(),
            openai_vision_model: "gpt-4o".to_owned(),
            openai_stt_model: "whisper-1".to_owned(),
            openai_tts_model: "tts-1".to_owned(),
            openai_tts_voice: "alloy".to_owned(),
            hf_llm_model: "gpt2".to_owned(),
            hf_vision_model: "Salesforce/blip-image-captioning-base".to_owned(),
            hf_stt_model: "openai/whisper-tiny".to_owned(),
            gtts_language: "en".to_owned(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl AdapterConfig {
    /// Returns the effective timeout, using the default if zero.
    pub fn timeout(&self) -> Duration {
        if self.timeout_secs == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }

    /// User agent sent with every request.
    pub fn user_agent(&self) -> String {
        format!("muse/{}", env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_provider_documentation() {
        let config = AdapterConfig::default();
        assert_eq!(config.openai_llm_model, "gpt-4o-mini");
        assert_eq!(config.openai_tts_voice, "alloy");
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn zero_timeout_uses_default() {
        let config = AdapterConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.user_agent().starts_with("muse/"));
    }
}
