//! Image captioning service with a content-addressed cache.

use std::sync::Arc;

use jiff::Timestamp;
use muse_core::adapter::VisionAdapter;
use muse_core::cache::vision_key;
use muse_core::job::JobOutput;
use muse_core::registry::AdapterRegistry;
use muse_core::{Capability, Provider, Result};
use sha2::{Digest, Sha256};

use super::{LazyAdapter, settle};
use crate::cache::{CacheTtls, ResultCache};
use crate::TRACING_TARGET_SERVICE;

/// Image captioning façade.
///
/// Captions are memoized under `cache:vision:<sha256hex>` of the raw image
/// bytes. Only non-empty captions are stored. A cache outage never blocks
/// the adapter call: the request simply runs uncached.
#[derive(Clone)]
pub struct VisionService {
    adapter: Arc<LazyAdapter<dyn VisionAdapter>>,
    cache: ResultCache,
    ttls: CacheTtls,
}

impl VisionService {
    /// Creates the service, optionally pinned to a provider.
    pub fn new(
        registry: AdapterRegistry,
        provider: Option<Provider>,
        cache: ResultCache,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            adapter: Arc::new(LazyAdapter::new(
                registry,
                provider,
                AdapterRegistry::resolve_vision,
            )),
            cache,
            ttls,
        }
    }

    /// Hex-encoded SHA-256 of the image payload.
    pub fn content_hash(image: &[u8]) -> String {
        hex::encode(Sha256::digest(image))
    }

    /// Describes the image.
    ///
    /// Returns `Ok(None)` when the provider failed or produced nothing.
    #[tracing::instrument(skip_all, fields(image_len = image.len()))]
    pub async fn describe(&self, image: &[u8]) -> Result<Option<String>> {
        let key = vision_key(&Self::content_hash(image));

        let cache_enabled = match self.cache.lookup_text(&key).await {
            Ok(Some(description)) if !description.is_empty() => {
                tracing::debug!(target: TRACING_TARGET_SERVICE, key, "Vision cache hit");
                return Ok(Some(description));
            }
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_SERVICE,
                    key,
                    error = %error,
                    "Vision cache unavailable, describing without cache"
                );
                false
            }
        };

        let adapter = self.adapter.get().await?;
        let started_at = Timestamp::now();
        let result = adapter
            .describe(image)
            .await
            .map(|text| text.trim().to_owned());
        let description = settle(
            Capability::Vision,
            adapter.provider(),
            started_at,
            result,
            String::is_empty,
        );

        if cache_enabled && let Some(description) = &description {
            let value = JobOutput::Text(description.clone());
            if let Err(error) = self.cache.store(&key, &value, self.ttls.vision()).await {
                tracing::warn!(
                    target: TRACING_TARGET_SERVICE,
                    key,
                    error = %error,
                    "Failed to cache vision description"
                );
            }
        }

        Ok(description)
    }
}

impl std::fmt::Debug for VisionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionService")
            .field("provider", &self.adapter.provider)
            .field("ttls", &self.ttls)
            .finish_non_exhaustive()
    }
}
