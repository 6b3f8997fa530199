// httpcache - Client-side HTTP response caching for Rust
//
// This library decides when a cached response may be reused, revalidates
// stale entries with the origin and keeps a pluggable store up to date.

// Re-export the policy engine
pub use httpcache_core::*;

// Re-export stores
pub use httpcache_store::{
    BlockingCacheStore, CacheStore, InMemoryCache, StoreBackend, StoreConfig, StoreError,
    StoreResult,
};

#[cfg(feature = "redis")]
pub use httpcache_store::{BlockingRedisCache, RedisCache};

// Re-export the caching client
#[cfg(feature = "client")]
pub use httpcache_client::{
    BlockingCachingTransport, BlockingReqwestTransport, BlockingTransport, CachingClient,
    CachingTransport, ClientConfig, ClientConfigBuilder, ClientError, RequestBuilder,
    ReqwestTransport, Transport,
};

pub use httpcache_core;
pub use httpcache_store;

#[cfg(feature = "client")]
pub use httpcache_client;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        ActionResult,
        BlockingCacheStore,
        BlockingIoHandler,
        Body,
        CacheControl,
        CacheStore,
        CachingPolicy,
        Clock,
        FixedClock,
        InMemoryCache,
        IoAction,
        IoHandler,
        PolicyConfig,
        Request,
        Response,
        Source,
        StoreConfig,
        // Heuristics
        ExpiresAfterHeuristic,
        Heuristic,
        LastModifiedHeuristic,
        OneDayCacheHeuristic,
    };

    #[cfg(feature = "client")]
    pub use crate::{
        BlockingCachingTransport, CachingClient, CachingTransport, ClientConfig, ClientError,
    };
}
