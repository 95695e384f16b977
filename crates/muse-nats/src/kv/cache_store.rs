//! Result cache on a NATS KV bucket.

use std::time::Duration;

use async_nats::jetstream::{self, kv};
use bytes::Bytes;
use jiff::Timestamp;
use muse_core::cache::CacheStore;
use serde::{Deserialize, Serialize};

use super::bucket::{self, KvBucket, ResultCacheBucket, kv_key};
use crate::{Error, Result, TRACING_TARGET_KV};

/// Stored form of a cache entry.
///
/// NATS KV only supports a per-bucket `max_age`, so every value carries its
/// own expiry instant and readers treat expired values as misses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedValue {
    pub value: String,
    pub expires_at: Timestamp,
}

impl CachedValue {
    /// Wraps `value` to expire `ttl` from now.
    pub fn new(value: String, ttl: Duration) -> Self {
        let expires_at = Timestamp::now()
            .checked_add(ttl)
            .unwrap_or(Timestamp::MAX);
        Self { value, expires_at }
    }

    /// Returns whether the entry has expired at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// [`CacheStore`] over the `result_cache` bucket.
#[derive(Clone)]
pub struct KvCacheStore {
    store: kv::Store,
}

impl std::fmt::Debug for KvCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvCacheStore")
            .field("bucket", &ResultCacheBucket::NAME)
            .finish()
    }
}

impl KvCacheStore {
    /// Opens the bucket; entries are dropped by the server after `max_age`.
    #[tracing::instrument(skip(jetstream), target = TRACING_TARGET_KV)]
    pub(crate) async fn new(jetstream: &jetstream::Context, max_age: Duration) -> Result<Self> {
        let max_age = if max_age.is_zero() {
            ResultCacheBucket::TTL.unwrap_or_default()
        } else {
            max_age
        };
        let store = bucket::open::<ResultCacheBucket>(jetstream, max_age).await?;
        Ok(Self { store })
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        let nats_key = kv_key(key);
        let Some(raw) = self
            .store
            .get(nats_key.as_str())
            .await
            .map_err(|e| Error::operation("kv_get", e.to_string()))?
        else {
            return Ok(None);
        };

        let cached: CachedValue = match serde_json::from_slice(&raw) {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_KV,
                    key = %nats_key,
                    error = %err,
                    "Ignoring undecodable cache entry"
                );
                return Ok(None);
            }
        };

        if cached.is_expired_at(Timestamp::now()) {
            tracing::debug!(
                target: TRACING_TARGET_KV,
                key = %nats_key,
                "Cache entry expired"
            );
            return Ok(None);
        }
        Ok(Some(cached.value))
    }

    async fn write(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let nats_key = kv_key(key);
        let payload = Bytes::from(serde_json::to_vec(&CachedValue::new(value, ttl))?);
        let size = payload.len();
        let revision = self
            .store
            .put(nats_key.as_str(), payload)
            .await
            .map_err(|e| Error::operation("kv_put", e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_KV,
            key = %nats_key,
            revision,
            size_bytes = size,
            ttl_secs = ttl.as_secs(),
            "Put value to cache"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheStore for KvCacheStore {
    async fn get(&self, key: &str) -> muse_core::Result<Option<String>> {
        self.read(key).await.map_err(Error::into_cache_error)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> muse_core::Result<()> {
        self.write(key, value, ttl)
            .await
            .map_err(Error::into_cache_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_after_ttl() {
        let cached = CachedValue::new("hello".into(), Duration::from_secs(600));
        let now = Timestamp::now();
        assert!(!cached.is_expired_at(now));
        assert!(cached.is_expired_at(now.checked_add(Duration::from_secs(601)).unwrap()));
    }

    #[test]
    fn zero_ttl_is_expired_immediately() {
        let cached = CachedValue::new("gone".into(), Duration::ZERO);
        assert!(cached.is_expired_at(Timestamp::now()));
    }

    #[test]
    fn wire_format_keeps_value_verbatim() {
        let cached = CachedValue {
            value: "{\"a\":1}".into(),
            expires_at: Timestamp::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&cached).unwrap();
        assert_eq!(json["value"], "{\"a\":1}");
        assert_eq!(json["expires_at"], "1970-01-01T00:00:00Z");
    }
}
