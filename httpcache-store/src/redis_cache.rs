//! Redis cache stores.

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::traits::{BlockingCacheStore, CacheStore};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use redis::{AsyncCommands, Client, Commands, aio::ConnectionManager};
use std::future::Future;
use tracing::debug;

fn open_client(config: &StoreConfig) -> StoreResult<Client> {
    if config.backend != StoreBackend::Redis {
        return Err(StoreError::Config(format!(
            "expected a Redis configuration, got {}",
            config.backend
        )));
    }
    Client::open(config.url.as_str()).map_err(|e| StoreError::InvalidUrl(e.to_string()))
}

/// Async Redis cache store.
///
/// Commands are multiplexed over one [`ConnectionManager`], which reconnects
/// on failure. Redis applies commands in arrival order.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: StoreConfig,
}

impl RedisCache {
    /// Create a new Redis cache instance.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use httpcache_store::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), StoreError> {
    ///     let config = StoreConfig::redis("redis://localhost:6379")?;
    ///     let cache = RedisCache::new(config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = open_client(&config)?;

        let connection = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        debug!(url = %config.url, "Connected to Redis");
        Ok(Self { connection, config })
    }

    /// Get the underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    async fn with_timeout<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.config.operation_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let key = self.config.build_key(key);
        let mut conn = self.connection.clone();

        let value: Option<Vec<u8>> = self.with_timeout(conn.get(&key)).await?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        let key = self.config.build_key(key);
        let mut conn = self.connection.clone();

        if let Some(ttl) = self.config.default_ttl {
            let _: () = self
                .with_timeout(conn.set_ex(&key, value.as_ref(), ttl.as_secs().max(1)))
                .await?;
        } else {
            let _: () = self.with_timeout(conn.set(&key, value.as_ref())).await?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let key = self.config.build_key(key);
        let mut conn = self.connection.clone();
        let _: () = self.with_timeout(conn.del(&key)).await?;
        Ok(())
    }
}

/// Blocking Redis cache store.
///
/// One connection guarded by a mutex, so commands from different threads are
/// sent one at a time.
pub struct BlockingRedisCache {
    connection: Mutex<redis::Connection>,
    config: StoreConfig,
}

impl BlockingRedisCache {
    /// Connect to Redis.
    ///
    /// ```no_run
    /// use httpcache_store::*;
    ///
    /// let config = StoreConfig::redis("redis://localhost:6379").unwrap();
    /// let cache = BlockingRedisCache::new(config).unwrap();
    /// ```
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let client = open_client(&config)?;
        let connection = client
            .get_connection_with_timeout(config.connection_timeout)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        connection
            .set_read_timeout(Some(config.operation_timeout))
            .and_then(|_| connection.set_write_timeout(Some(config.operation_timeout)))
            .map_err(|e| StoreError::Config(e.to_string()))?;

        debug!(url = %config.url, "Connected to Redis");
        Ok(Self {
            connection: Mutex::new(connection),
            config,
        })
    }
}

impl BlockingCacheStore for BlockingRedisCache {
    fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let key = self.config.build_key(key);
        let value: Option<Vec<u8>> = self.connection.lock().get(&key)?;
        Ok(value.map(Bytes::from))
    }

    fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
        let key = self.config.build_key(key);
        let mut conn = self.connection.lock();

        if let Some(ttl) = self.config.default_ttl {
            let _: () = conn.set_ex(&key, value.as_ref(), ttl.as_secs().max(1))?;
        } else {
            let _: () = conn.set(&key, value.as_ref())?;
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let key = self.config.build_key(key);
        let _: () = self.connection.lock().del(&key)?;
        Ok(())
    }
}
