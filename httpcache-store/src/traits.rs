//! Cache store trait definitions.

use crate::error::StoreResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Async byte store backing the HTTP cache.
///
/// Implementations must be safe to call concurrently. A missing key is
/// `Ok(None)`; `Err` is reserved for backend failures.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the bytes stored under `key`.
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(value))` if the key exists, `Ok(None)` if not found,
    /// or an error if the operation fails.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Release backend resources.
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Blocking counterpart of [`CacheStore`].
pub trait BlockingCacheStore: Send + Sync {
    /// Get the bytes stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Bytes) -> StoreResult<()>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Release backend resources.
    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: CacheStore + ?Sized> CacheStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key).await
    }

    async fn close(&self) -> StoreResult<()> {
        (**self).close().await
    }
}
