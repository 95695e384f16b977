//! In-process cache store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use super::CacheStore;
use crate::{Result, TRACING_TARGET_CACHE};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Cache store held in process memory.
///
/// Expired entries are dropped lazily on read. Useful for single-process
/// deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remaining lifetime of a live entry.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        entry.expires_at.checked_duration_since(Instant::now())
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
            tracing::trace!(target: TRACING_TARGET_CACHE, key, "Evicted expired entry");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_owned(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get() {
        let store = MemoryCacheStore::new();
        store
            .set("result:abc", "Hello back!".into(), Duration::from_secs(600))
            .await
            .unwrap();
        assert_eq!(
            store.get("result:abc").await.unwrap().as_deref(),
            Some("Hello back!")
        );
        assert!(store.get("result:other").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let store = MemoryCacheStore::new();
        store
            .set("k", "v".into(), Duration::from_secs(10))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }
}
