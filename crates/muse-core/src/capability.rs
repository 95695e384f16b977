//! Capabilities and provider identifiers.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// A logical AI capability that can be served by one or more providers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    IntoStaticStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    /// Text generation from a prompt.
    Llm,
    /// Image captioning.
    Vision,
    /// Speech-to-text transcription.
    Stt,
    /// Text-to-speech synthesis.
    Tts,
}

impl Capability {
    /// All capabilities, in declaration order.
    pub const ALL: [Capability; 4] = [Self::Llm, Self::Vision, Self::Stt, Self::Tts];

    /// Providers tried, in order, after the requested or default provider.
    pub fn fallback_chain(self) -> &'static [Provider] {
        match self {
            Self::Llm | Self::Vision | Self::Stt => &[Provider::OpenAi, Provider::HuggingFace],
            Self::Tts => &[Provider::Gtts],
        }
    }
}

/// A concrete backend that implements one or more capabilities.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    IntoStaticStr
)]
#[cfg_attr(feature = "config", derive(clap::ValueEnum))]
pub enum Provider {
    /// OpenAI HTTP API.
    #[serde(rename = "openai")]
    #[strum(serialize = "openai")]
    #[cfg_attr(feature = "config", value(name = "openai"))]
    OpenAi,
    /// HuggingFace Inference API.
    #[serde(rename = "huggingface")]
    #[strum(serialize = "huggingface")]
    #[cfg_attr(feature = "config", value(name = "huggingface"))]
    HuggingFace,
    /// Google Translate text-to-speech.
    #[serde(rename = "gtts")]
    #[strum(serialize = "gtts")]
    #[cfg_attr(feature = "config", value(name = "gtts"))]
    Gtts,
}

impl Provider {
    /// Returns whether the provider needs a credential to be usable.
    pub fn requires_credential(self) -> bool {
        !matches!(self, Self::Gtts)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn provider_names() {
        assert_eq!(Provider::OpenAi.to_string(), "openai");
        assert_eq!(Provider::from_str("huggingface").unwrap(), Provider::HuggingFace);
        assert!(Provider::from_str("anthropic").is_err());
        assert_eq!(
            serde_json::to_string(&Provider::Gtts).unwrap(),
            "\"gtts\""
        );
    }

    #[test]
    fn tts_falls_back_to_keyless_provider() {
        let chain = Capability::Tts.fallback_chain();
        assert_eq!(chain, &[Provider::Gtts]);
        assert!(chain.iter().all(|p| !p.requires_credential()));
    }

    #[test]
    fn capability_names() {
        assert_eq!(Capability::Stt.as_ref(), "stt");
        assert_eq!(Capability::from_str("vision").unwrap(), Capability::Vision);
    }
}
