//! Fail-soft result cache.
//!
//! Wraps a [`CacheStore`] with the serialization rule shared by every writer:
//! structured records are stored as JSON text, plain strings as-is. Reads try
//! a structured decode first and fall back to the raw string, so both kinds
//! of producers share one key space without a discriminator.

mod ttl;

use std::sync::Arc;
use std::time::Duration;

use muse_core::cache::CacheStore;
use muse_core::job::JobOutput;
use muse_core::{Error, Result};
pub use ttl::CacheTtls;

use crate::TRACING_TARGET_CACHE;

/// Cache of job results and content-addressed captions.
///
/// `get` and `set` never fail: a store outage degrades to "no cache". The
/// `lookup` and `store` variants expose the underlying error for callers
/// that want to react to it once.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
}

impl ResultCache {
    /// Creates a cache over the given store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Encodes a value with the shared serialization rule.
    pub fn encode(value: &JobOutput) -> Result<String> {
        match value {
            JobOutput::Text(text) => Ok(text.clone()),
            JobOutput::Structured(record) => Ok(serde_json::to_string(record)?),
        }
    }

    /// Decodes a stored value: structured records first, raw text otherwise.
    ///
    /// Only JSON objects and arrays count as structured, so a plain string
    /// such as `"42"` round-trips unchanged.
    pub fn decode(raw: String) -> JobOutput {
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) if value.is_object() || value.is_array() => JobOutput::Structured(value),
            _ => JobOutput::Text(raw),
        }
    }

    /// Passes a value through the encode/decode rule.
    ///
    /// The result is exactly what a later cache read hands back, so callers
    /// returning a value they also cache report the same shape either way.
    pub fn normalize(value: JobOutput) -> Result<JobOutput> {
        Ok(Self::decode(Self::encode(&value)?))
    }

    /// Reads a value, surfacing store errors.
    pub async fn lookup(&self, key: &str) -> Result<Option<JobOutput>> {
        let raw = self.store.get(key).await.map_err(unavailable)?;
        Ok(raw.map(Self::decode))
    }

    /// Reads a value as stored, without the structured decode.
    pub async fn lookup_text(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key).await.map_err(unavailable)
    }

    /// Writes a value, surfacing store and encoding errors.
    pub async fn store(&self, key: &str, value: &JobOutput, ttl: Duration) -> Result<()> {
        let encoded = Self::encode(value)?;
        self.store.set(key, encoded, ttl).await.map_err(unavailable)
    }

    /// Reads a value; any failure is logged and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<JobOutput> {
        match self.lookup(key).await {
            Ok(value) => {
                tracing::trace!(target: TRACING_TARGET_CACHE, key, hit = value.is_some(), "Cache read");
                value
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_CACHE,
                    key,
                    error = %error,
                    "Cache read failed, continuing without cache"
                );
                None
            }
        }
    }

    /// Writes a value; any failure is logged and swallowed.
    pub async fn set(&self, key: &str, value: &JobOutput, ttl: Duration) {
        match self.store(key, value, ttl).await {
            Ok(()) => {
                tracing::trace!(
                    target: TRACING_TARGET_CACHE,
                    key,
                    ttl_secs = ttl.as_secs(),
                    "Cache write"
                );
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_CACHE,
                    key,
                    error = %error,
                    "Cache write failed, continuing without cache"
                );
            }
        }
    }
}

fn unavailable(error: Error) -> Error {
    if error.kind() == muse_core::ErrorKind::CacheUnavailable {
        return error;
    }
    let message = error.to_string();
    Error::cache_unavailable()
        .with_message(message)
        .with_source(error)
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache").finish_non_exhaustive()
    }
}
