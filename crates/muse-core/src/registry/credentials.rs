//! Provider credentials and per-capability defaults.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Capability, Provider};

/// API credentials for credentialed providers.
///
/// A missing credential disables the provider in the registry's fallback
/// chain; it never aborts startup.
#[derive(Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ProviderCredentials {
    /// OpenAI API key.
    #[cfg_attr(feature = "config", arg(long = "openai-api-key", env = "OPENAI_API_KEY"))]
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,

    /// HuggingFace Inference API token.
    #[cfg_attr(feature = "config", arg(long = "hf-api-token", env = "HF_API_TOKEN"))]
    #[serde(default, skip_serializing)]
    pub hf_api_token: Option<String>,
}

impl ProviderCredentials {
    /// Creates an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the OpenAI API key.
    pub fn with_openai(mut self, api_key: impl Into<String>) -> Self {
        self.openai_api_key = Some(api_key.into());
        self
    }

    /// Sets the HuggingFace token.
    pub fn with_huggingface(mut self, token: impl Into<String>) -> Self {
        self.hf_api_token = Some(token.into());
        self
    }

    /// Returns the non-empty credential for the provider, if any.
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        let key = match provider {
            Provider::OpenAi => self.openai_api_key.as_deref(),
            Provider::HuggingFace => self.hf_api_token.as_deref(),
            Provider::Gtts => None,
        };
        key.filter(|k| !k.trim().is_empty())
    }

    /// Returns whether the provider can be used with these credentials.
    pub fn is_configured(&self, provider: Provider) -> bool {
        !provider.requires_credential() || self.api_key(provider).is_some()
    }

    /// Providers that have usable credentials.
    pub fn configured(&self) -> Vec<Provider> {
        [Provider::OpenAi, Provider::HuggingFace, Provider::Gtts]
            .into_iter()
            .filter(|p| self.is_configured(*p))
            .collect()
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("hf_api_token", &self.hf_api_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Default provider per capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct DefaultProviders {
    /// Default provider for text generation.
    #[cfg_attr(
        feature = "config",
        arg(long = "default-llm-provider", env = "DEFAULT_LLM_PROVIDER", value_enum, default_value = "openai")
    )]
    pub llm: Provider,

    /// Default provider for image captioning.
    #[cfg_attr(
        feature = "config",
        arg(long = "default-vision-provider", env = "DEFAULT_VISION_PROVIDER", value_enum, default_value = "openai")
    )]
    pub vision: Provider,

    /// Default provider for speech-to-text.
    #[cfg_attr(
        feature = "config",
        arg(long = "default-stt-provider", env = "DEFAULT_STT_PROVIDER", value_enum, default_value = "openai")
    )]
    pub stt: Provider,

    /// Default provider for text-to-speech.
    #[cfg_attr(
        feature = "config",
        arg(long = "default-tts-provider", env = "DEFAULT_TTS_PROVIDER", value_enum, default_value = "openai")
    )]
    pub tts: Provider,
}

impl Default for DefaultProviders {
    fn default() -> Self {
        Self {
            llm: Provider::OpenAi,
            vision: Provider::OpenAi,
            stt: Provider::OpenAi,
            tts: Provider::OpenAi,
        }
    }
}

impl DefaultProviders {
    /// Returns the default provider for a capability.
    pub fn get(&self, capability: Capability) -> Provider {
        match capability {
            Capability::Llm => self.llm,
            Capability::Vision => self.vision,
            Capability::Stt => self.stt,
            Capability::Tts => self.tts,
        }
    }

    /// Overrides the default provider for a capability.
    pub fn with(mut self, capability: Capability, provider: Provider) -> Self {
        match capability {
            Capability::Llm => self.llm = provider,
            Capability::Vision => self.vision = provider,
            Capability::Stt => self.stt = provider,
            Capability::Tts => self.tts = provider,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_are_not_configured() {
        let credentials = ProviderCredentials::new().with_openai("  ");
        assert!(!credentials.is_configured(Provider::OpenAi));
        assert!(credentials.is_configured(Provider::Gtts));
        assert_eq!(credentials.configured(), vec![Provider::Gtts]);
    }

    #[test]
    fn debug_redacts_secrets() {
        let credentials = ProviderCredentials::new().with_huggingface("hf_secret");
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("hf_secret"));
    }

    #[test]
    fn defaults_per_capability() {
        let defaults = DefaultProviders::default().with(Capability::Tts, Provider::Gtts);
        assert_eq!(defaults.get(Capability::Llm), Provider::OpenAi);
        assert_eq!(defaults.get(Capability::Tts), Provider::Gtts);
    }
}
