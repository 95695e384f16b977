//! Key-value bucket configuration.

use std::time::Duration;

use async_nats::jetstream::{self, kv};

use crate::{Error, Result, TRACING_TARGET_KV};

/// Marker trait for KV bucket configuration.
pub trait KvBucket: Send + Sync + 'static {
    /// Bucket name used in NATS KV.
    const NAME: &'static str;

    /// Human-readable description for the bucket.
    const DESCRIPTION: &'static str;

    /// Default retention for entries in this bucket.
    const TTL: Option<Duration>;
}

/// Bucket for memoized job results and vision captions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResultCacheBucket;

impl KvBucket for ResultCacheBucket {
    const NAME: &'static str = "result_cache";
    const DESCRIPTION: &'static str = "Memoized job results and vision captions";
    const TTL: Option<Duration> = Some(Duration::from_secs(24 * 60 * 60)); // 24 hours
}

/// Bucket for authoritative job records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct JobStatusBucket;

impl KvBucket for JobStatusBucket {
    const NAME: &'static str = "job_status";
    const DESCRIPTION: &'static str = "Background job records";
    const TTL: Option<Duration> = Some(Duration::from_secs(7 * 24 * 60 * 60)); // 7 days
}

/// Maps a logical key onto the NATS KV key alphabet.
///
/// NATS keys allow `[-/_=.a-zA-Z0-9]` only, so the `:` separator becomes `.`
/// and any other character becomes `_`.
pub fn kv_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            ':' => '.',
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '/' | '_' | '=' | '.') => c,
            _ => '_',
        })
        .collect()
}

/// Opens the bucket, creating it with `max_age` when it does not exist.
pub(crate) async fn open<B: KvBucket>(
    jetstream: &jetstream::Context,
    max_age: Duration,
) -> Result<kv::Store> {
    match jetstream.get_key_value(B::NAME).await {
        Ok(store) => {
            tracing::debug!(
                target: TRACING_TARGET_KV,
                bucket = %B::NAME,
                "Using existing KV bucket"
            );
            Ok(store)
        }
        Err(_) => {
            tracing::debug!(
                target: TRACING_TARGET_KV,
                bucket = %B::NAME,
                max_age_secs = max_age.as_secs(),
                "Creating new KV bucket"
            );
            let config = kv::Config {
                bucket: B::NAME.to_string(),
                description: B::DESCRIPTION.to_string(),
                max_age,
                history: 1,
                ..Default::default()
            };
            jetstream
                .create_key_value(config)
                .await
                .map_err(|e| Error::operation("kv_create", e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_names() {
        assert_eq!(ResultCacheBucket::NAME, "result_cache");
        assert_eq!(JobStatusBucket::NAME, "job_status");
        assert!(JobStatusBucket::TTL > ResultCacheBucket::TTL);
    }

    #[test]
    fn logical_keys_map_to_nats_keys() {
        assert_eq!(kv_key("result:abc-123"), "result.abc-123");
        assert_eq!(
            kv_key("cache:vision:deadbeef"),
            "cache.vision.deadbeef"
        );
        assert_eq!(kv_key("a b*c"), "a_b_c");
    }
}
