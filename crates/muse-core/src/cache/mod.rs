//! Key-value cache contract with per-key expiry.
//!
//! Stores hold opaque text values. Serialization of structured values and
//! the fail-soft policy live one layer up, in the result cache.

mod memory;

use std::time::Duration;

pub use memory::MemoryCacheStore;

use crate::Result;

/// Prefix of job result memoization keys.
pub const RESULT_KEY_PREFIX: &str = "result";

/// Prefix of content-addressed vision caption keys.
pub const VISION_KEY_PREFIX: &str = "cache:vision";

/// Cache key for a job result: `result:<jobId>`.
pub fn result_key(job_id: impl std::fmt::Display) -> String {
    format!("{RESULT_KEY_PREFIX}:{job_id}")
}

/// Cache key for a vision caption: `cache:vision:<sha256hex>`.
pub fn vision_key(content_hash: &str) -> String {
    format!("{VISION_KEY_PREFIX}:{content_hash}")
}

/// Backing store for cached values.
///
/// Implementations report outages as `CacheUnavailable` errors; callers
/// decide how to degrade.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value for `key` if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}
