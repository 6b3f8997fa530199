//! # httpcache client
//!
//! HTTP transports that answer requests from a cache store when RFC 7234
//! allows it, and a `reqwest`-backed client built on top of them.
//!
//! ## Features
//!
//! - **Caching transports**: async [`CachingTransport`] and [`BlockingCachingTransport`]
//!   wrap any [`Transport`] or [`BlockingTransport`] together with a cache store
//! - **Streamed writes**: responses are stored once their body has been read to the end
//! - **Revalidation**: stale entries with an `ETag` or `Last-Modified` are revalidated
//! - **Pluggable stores**: in-memory or Redis via `httpcache-store`
//! - **Connection Pooling**: Efficient connection reuse
//! - **Compression**: Automatic gzip/brotli support
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use httpcache_client::{CachingClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = CachingClient::in_memory(ClientConfig::default())?;
//!
//!     let response = client
//!         .get("https://api.example.com/users")
//!         .send()
//!         .await?;
//!
//!     println!("Status: {} (cached: {})", response.status, response.from_cache());
//!     let body = response.text().await?;
//!     println!("{body}");
//!     Ok(())
//! }
//! ```
//!
//! ## With a Heuristic and Redis
//!
//! ```rust,no_run
//! use httpcache_client::{CachingClient, ClientConfig};
//! use httpcache_core::{PolicyConfig, OneDayCacheHeuristic};
//! use httpcache_store::{RedisCache, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let store = RedisCache::new(StoreConfig::redis("redis://localhost:6379")?).await?;
//!     let config = ClientConfig::builder()
//!         .policy(PolicyConfig::builder().heuristic(OneDayCacheHeuristic).build())
//!         .build();
//!
//!     let client = CachingClient::new(store, config)?;
//!     let response = client.get("https://example.com/feed.xml").send().await?;
//!     response.bytes().await?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

mod caching;
mod client;
mod config;
mod error;
mod request;
mod stream;
mod transport;

pub use caching::{BlockingCachingTransport, CachingTransport};
pub use client::CachingClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ClientError, Result};
pub use request::RequestBuilder;
pub use stream::{CachingBodyIter, CachingStream, PersistFuture};
pub use transport::{BlockingReqwestTransport, BlockingTransport, ReqwestTransport, Transport};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::caching::{BlockingCachingTransport, CachingTransport};
    pub use crate::client::CachingClient;
    pub use crate::config::ClientConfig;
    pub use crate::error::{ClientError, Result};
    pub use crate::request::RequestBuilder;
    pub use crate::transport::{BlockingTransport, Transport};
}
