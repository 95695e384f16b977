//! NATS Key-Value stores.
//!
//! - [`KvCacheStore`]: the result cache, keyed by logical cache keys
//! - [`JobStatusStore`]: authoritative job records, keyed by job id

mod bucket;
mod cache_store;
mod job_status;

pub use bucket::{JobStatusBucket, KvBucket, ResultCacheBucket, kv_key};
pub use cache_store::{CachedValue, KvCacheStore};
pub use job_status::JobStatusStore;
