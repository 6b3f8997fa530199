//! Byte stores backing the HTTP cache.
//!
//! The caching policy only needs get, set and delete on opaque byte values
//! keyed by URL. This crate defines that contract in async ([`CacheStore`])
//! and blocking ([`BlockingCacheStore`]) flavours and ships the backends.
//!
//! # Features
//!
//! - `redis` - Enable Redis store support (enabled by default)
//!
//! # Examples
//!
//! ## In-memory store
//!
//! ```
//! use httpcache_store::*;
//!
//! # async fn example() -> StoreResult<()> {
//! let cache = InMemoryCache::new();
//! CacheStore::set(&cache, "http://example.com/", "entry".into()).await?;
//! assert!(CacheStore::get(&cache, "http://example.com/").await?.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Redis store
//!
//! ```no_run
//! use httpcache_store::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StoreError> {
//!     let config = StoreConfig::redis("redis://localhost:6379")?
//!         .with_key_prefix("httpcache")
//!         .with_default_ttl(Duration::from_secs(86_400));
//!     let cache = RedisCache::new(config).await?;
//!
//!     cache.set("http://example.com/", "entry".into()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "redis")]
pub mod redis_cache;

pub use config::{StoreBackend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryCache;
pub use traits::{BlockingCacheStore, CacheStore};

#[cfg(feature = "redis")]
pub use redis_cache::{BlockingRedisCache, RedisCache};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::StoreConfig;
    pub use crate::error::{StoreError, StoreResult};
    pub use crate::memory::InMemoryCache;
    pub use crate::traits::{BlockingCacheStore, CacheStore};

    #[cfg(feature = "redis")]
    pub use crate::redis_cache::{BlockingRedisCache, RedisCache};
}
