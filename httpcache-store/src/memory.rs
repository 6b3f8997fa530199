//! In-memory cache store.

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::traits::{BlockingCacheStore, CacheStore};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

#[derive(Clone)]
struct StoredValue {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// Process-local cache store.
///
/// Every operation takes one mutex, so concurrent writers never interleave.
/// Cloning shares the underlying map.
///
/// ```
/// use httpcache_store::{BlockingCacheStore, InMemoryCache};
///
/// let cache = InMemoryCache::new();
/// cache.set("k", "v".into()).unwrap();
/// assert_eq!(cache.get("k").unwrap().as_deref(), Some(&b"v"[..]));
/// ```
#[derive(Clone)]
pub struct InMemoryCache {
    data: Arc<Mutex<HashMap<String, StoredValue>>>,
    config: StoreConfig,
}

impl InMemoryCache {
    /// Create new in-memory cache
    pub fn new() -> Self {
        Self::with_config(StoreConfig::memory())
    }

    /// Create with key prefix and TTL taken from `config`
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data.lock().values().filter(|v| !v.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.data.lock().clear();
    }

    fn get_sync(&self, key: &str) -> Option<Bytes> {
        let key = self.config.build_key(key);
        let mut data = self.data.lock();

        match data.get(&key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                trace!(key = %key, "Dropping expired entry");
                data.remove(&key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    fn set_sync(&self, key: &str, value: Bytes) {
        let key = self.config.build_key(key);
        let now = Instant::now();
        let expires_at = self
            .config
            .default_ttl
            .and_then(|ttl| now.checked_add(ttl));

        let mut data = self.data.lock();
        if self.config.default_ttl.is_some() {
            let before = data.len();
            data.retain(|_, entry| !entry.is_expired(now));
            let swept = before - data.len();
            if swept > 0 {
                trace!(swept, "Swept expired entries");
            }
        }
        data.insert(key, StoredValue { value, expires_at });
    }

    fn delete_sync(&self, key: &str) {
        let key = self.config.build_key(key);
        self.data.lock().remove(&key);
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        Ok(self.get_sync(key))
    }

    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        self.set_sync(key, value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.delete_sync(key);
        Ok(())
    }
}

impl BlockingCacheStore for InMemoryCache {
    fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        Ok(self.get_sync(key))
    }

    fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        self.set_sync(key, value);
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.delete_sync(key);
        Ok(())
    }
}
