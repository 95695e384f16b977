#[cfg(feature = "config")]
use clap::Args;
use muse_core::Provider;
use muse_service::CacheTtls;
use serde::{Deserialize, Serialize};

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Provider pinned for the text pipeline's generation step.
    ///
    /// Falls back to the default LLM provider when unset.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "TEXT_PIPELINE_PROVIDER", value_enum)
    )]
    #[serde(default)]
    pub text_pipeline_provider: Option<Provider>,

    /// Cache lifetimes per result category.
    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(default)]
    pub cache_ttls: CacheTtls,
}

impl ServiceConfig {
    /// Pins the text pipeline to a provider.
    pub fn with_text_pipeline_provider(mut self, provider: Provider) -> Self {
        self.text_pipeline_provider = Some(provider);
        self
    }
}
