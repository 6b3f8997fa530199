//! Caching HTTP client.

use http::Method;
use httpcache_core::{Request, Response, Source};
use httpcache_store::{CacheStore, InMemoryCache};
use std::sync::Arc;
use tracing::debug;

use crate::{CachingTransport, ClientConfig, RequestBuilder, ReqwestTransport, Result};

/// HTTP client that answers requests from a cache store when it can.
///
/// Cloning is cheap and clones share the store and connection pool.
pub struct CachingClient<S = InMemoryCache> {
    transport: Arc<CachingTransport<ReqwestTransport, S>>,
    config: Arc<ClientConfig>,
}

impl<S> Clone for CachingClient<S> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: self.config.clone(),
        }
    }
}

impl CachingClient<InMemoryCache> {
    /// Create a client backed by a fresh in-memory store.
    pub fn in_memory(config: ClientConfig) -> Result<Self> {
        Self::new(InMemoryCache::new(), config)
    }
}

impl<S> CachingClient<S>
where
    S: CacheStore + 'static,
{
    /// Create a client that owns the given store.
    pub fn new(store: S, config: ClientConfig) -> Result<Self> {
        Self::with_store(Arc::new(store), config)
    }

    /// Create a client over a shared store.
    pub fn with_store(store: Arc<S>, config: ClientConfig) -> Result<Self> {
        let network = ReqwestTransport::new(&config)?;
        let transport = CachingTransport::new(network, store).with_config(config.policy.clone());

        Ok(Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the caching transport.
    pub fn transport(&self) -> &CachingTransport<ReqwestTransport, S> {
        &self.transport
    }

    /// Get the cache store.
    pub fn store(&self) -> &Arc<S> {
        self.transport.store()
    }

    /// Create a GET request builder.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder<'_, S> {
        RequestBuilder::new(self, Method::GET, url.into())
    }

    /// Create a POST request builder.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder<'_, S> {
        RequestBuilder::new(self, Method::POST, url.into())
    }

    /// Create a PUT request builder.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder<'_, S> {
        RequestBuilder::new(self, Method::PUT, url.into())
    }

    /// Create a PATCH request builder.
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder<'_, S> {
        RequestBuilder::new(self, Method::PATCH, url.into())
    }

    /// Create a DELETE request builder.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder<'_, S> {
        RequestBuilder::new(self, Method::DELETE, url.into())
    }

    /// Create a HEAD request builder.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder<'_, S> {
        RequestBuilder::new(self, Method::HEAD, url.into())
    }

    /// Create a request builder with a custom method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder<'_, S> {
        RequestBuilder::new(self, method, url.into())
    }

    /// Execute a request through the cache.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let (response, _) = self.execute_with_source(request).await?;
        Ok(response)
    }

    /// Execute a request and report whether the cache answered it.
    pub async fn execute_with_source(&self, request: Request) -> Result<(Response, Source)> {
        let method = request.method.clone();
        let url = request.url.clone();
        let (response, source) = self.transport.handle(request).await?;
        debug!(%method, %url, status = response.status, ?source, "Request completed");
        Ok((response, source))
    }

    /// Close the cache store.
    pub async fn close(&self) -> Result<()> {
        self.transport.close().await
    }
}
