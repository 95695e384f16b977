//! Default adapter registrations.

use std::sync::Arc;

use muse_core::Provider;
use muse_core::adapter::{LlmAdapter, SttAdapter, TtsAdapter, VisionAdapter};
use muse_core::registry::{AdapterRegistry, DefaultProviders, ProviderCredentials};

use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::gtts::GttsTts;
use crate::http::HttpClient;
use crate::huggingface::{HuggingFaceClient, HuggingFaceLlm, HuggingFaceStt, HuggingFaceVision};
use crate::openai::{OpenAiClient, OpenAiLlm, OpenAiStt, OpenAiTts, OpenAiVision};

/// Builds a registry with every concrete adapter registered.
///
/// Factories only build clients; no request is made until an adapter is
/// used. Providers without credentials stay registered but are skipped
/// during resolution.
pub fn default_registry(
    credentials: ProviderCredentials,
    defaults: DefaultProviders,
    config: &AdapterConfig,
) -> Result<AdapterRegistry> {
    let http = HttpClient::new(config)?;
    let config = Arc::new(config.clone());

    let openai = {
        let http = http.clone();
        move |credentials: &ProviderCredentials| -> Result<OpenAiClient> {
            let key = credentials
                .api_key(Provider::OpenAi)
                .ok_or_else(|| Error::config(Provider::OpenAi, "missing API key"))?;
            OpenAiClient::new(http.clone(), key)
        }
    };
    let huggingface = {
        let http = http.clone();
        move |credentials: &ProviderCredentials| -> Result<HuggingFaceClient> {
            let token = credentials
                .api_key(Provider::HuggingFace)
                .ok_or_else(|| Error::config(Provider::HuggingFace, "missing API token"))?;
            HuggingFaceClient::new(http.clone(), token)
        }
    };

    let registry = AdapterRegistry::builder(credentials)
        .with_defaults(defaults)
        .register_llm(Provider::OpenAi, {
            let config = config.clone();
            move |credentials: &ProviderCredentials| -> muse_core::Result<Arc<dyn LlmAdapter>> {
                let key = credentials
                    .api_key(Provider::OpenAi)
                    .ok_or_else(|| Error::config(Provider::OpenAi, "missing API key"))?;
                let adapter = OpenAiLlm::new(key, config.openai_llm_model.clone())?;
                Ok(Arc::new(adapter))
            }
        })
        .register_llm(Provider::HuggingFace, {
            let (config, huggingface) = (config.clone(), huggingface.clone());
            move |credentials: &ProviderCredentials| -> muse_core::Result<Arc<dyn LlmAdapter>> {
                let adapter = HuggingFaceLlm::new(huggingface(credentials)?, config.hf_llm_model.clone());
                Ok(Arc::new(adapter))
            }
        })
        .register_vision(Provider::OpenAi, {
            let (config, openai) = (config.clone(), openai.clone());
            move |credentials: &ProviderCredentials| -> muse_core::Result<Arc<dyn VisionAdapter>> {
                let adapter = OpenAiVision::new(openai(credentials)?, config.openai_vision_model.clone());
                Ok(Arc::new(adapter))
            }
        })
        .register_vision(Provider::HuggingFace, {
            let (config, huggingface) = (config.clone(), huggingface.clone());
            move |credentials: &ProviderCredentials| -> muse_core::Result<Arc<dyn VisionAdapter>> {
                let adapter =
                    HuggingFaceVision::new(huggingface(credentials)?, config.hf_vision_model.clone());
                Ok(Arc::new(adapter))
            }
        })
        .register_stt(Provider::OpenAi, {
            let (config, openai) = (config.clone(), openai.clone());
            move |credentials: &ProviderCredentials| -> muse_core::Result<Arc<dyn SttAdapter>> {
                let adapter = OpenAiStt::new(openai(credentials)?, config.openai_stt_model.clone());
                Ok(Arc::new(adapter))
            }
        })
        .register_stt(Provider::HuggingFace, {
            let (config, huggingface) = (config.clone(), huggingface);
            move |credentials: &ProviderCredentials| -> muse_core::Result<Arc<dyn SttAdapter>> {
                let adapter = HuggingFaceStt::new(huggingface(credentials)?, config.hf_stt_model.clone());
                Ok(Arc::new(adapter))
            }
        })
        .register_tts(Provider::OpenAi, {
            let config = config.clone();
            move |credentials: &ProviderCredentials| -> muse_core::Result<Arc<dyn TtsAdapter>> {
                let adapter = OpenAiTts::new(
                    openai(credentials)?,
                    config.openai_tts_model.clone(),
                    config.openai_tts_voice.clone(),
                );
                Ok(Arc::new(adapter))
            }
        })
        .register_tts(Provider::Gtts, move |_: &ProviderCredentials| -> muse_core::Result<Arc<dyn TtsAdapter>> {
            let adapter = GttsTts::new(http.clone(), config.gtts_language.clone());
            Ok(Arc::new(adapter))
        })
        .build();

    Ok(registry)
}
