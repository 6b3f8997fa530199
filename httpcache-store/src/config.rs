//! Cache store configuration types.

use crate::error::{StoreError, StoreResult};
use std::fmt;
use std::time::Duration;

/// Cache store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local map
    Memory,
    /// Redis backend
    Redis,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "Memory"),
            StoreBackend::Redis => write!(f, "Redis"),
        }
    }
}

/// Cache store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store backend type
    pub backend: StoreBackend,

    /// Connection URL (empty for the in-memory backend)
    pub url: String,

    /// Key prefix for all cache keys
    pub key_prefix: Option<String>,

    /// TTL applied to every stored entry
    pub default_ttl: Option<Duration>,

    /// Connection timeout
    pub connection_timeout: Duration,

    /// Operation timeout
    pub operation_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::memory()
    }
}

impl StoreConfig {
    /// Create an in-memory store configuration.
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: String::new(),
            key_prefix: None,
            default_ttl: None,
            connection_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(3),
        }
    }

    /// Create a new Redis store configuration.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Examples
    ///
    /// ```
    /// use httpcache_store::StoreConfig;
    ///
    /// let config = StoreConfig::redis("redis://localhost:6379").unwrap();
    /// assert!(StoreConfig::redis("localhost:6379").is_err());
    /// ```
    pub fn redis(url: impl Into<String>) -> StoreResult<Self> {
        let url = url.into();
        if !(url.starts_with("redis://")
            || url.starts_with("rediss://")
            || url.starts_with("redis+unix://")
            || url.starts_with("unix://"))
        {
            return Err(StoreError::InvalidUrl(url));
        }

        Ok(Self {
            backend: StoreBackend::Redis,
            url,
            ..Self::memory()
        })
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Build the final key with prefix if configured.
    pub fn build_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}
