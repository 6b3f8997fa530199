//! Transports that answer requests through the caching policy.

use crate::error::{ClientError, Result};
use crate::stream::{CachingBodyIter, CachingStream, PersistFuture};
use crate::transport::{BlockingTransport, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use httpcache_core::{
    ActionResult, BlockingIoHandler, Body, CachingPolicy, EntryCodec, IoAction, IoHandler,
    MsgPackCodec, PolicyConfig, Request, Response, ResponseHead, Source, VaryData,
};
use httpcache_store::{BlockingCacheStore, CacheStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Async transport that consults a cache store before the network.
///
/// # Examples
///
/// ```no_run
/// use httpcache_client::{CachingTransport, ClientConfig, ReqwestTransport};
/// use httpcache_core::Request;
/// use httpcache_store::InMemoryCache;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = ReqwestTransport::new(&ClientConfig::default())?;
/// let caching = CachingTransport::new(transport, Arc::new(InMemoryCache::new()));
///
/// let request = Request::get("https://example.com/".parse()?);
/// let (response, source) = caching.handle(request).await?;
/// println!("{} from {:?}", response.status, source);
/// # Ok(())
/// # }
/// ```
pub struct CachingTransport<T, S> {
    transport: T,
    store: Arc<S>,
    codec: Arc<dyn EntryCodec>,
    config: PolicyConfig,
}

impl<T, S> CachingTransport<T, S>
where
    T: Transport,
    S: CacheStore + 'static,
{
    pub fn new(transport: T, store: Arc<S>) -> Self {
        Self {
            transport,
            store,
            codec: Arc::new(MsgPackCodec),
            config: PolicyConfig::default(),
        }
    }

    /// Replace the caching policy configuration.
    pub fn with_config(mut self, config: PolicyConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the entry codec.
    pub fn with_codec(mut self, codec: impl EntryCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Answer a request from the cache or the origin.
    ///
    /// The response carries `from_cache` in its extensions.
    pub async fn handle(&self, request: Request) -> Result<(Response, Source)> {
        let policy = CachingPolicy::new(request, self.config.clone());
        let (mut response, source) = policy.run(self).await?;
        response.ext.insert("from_cache", source.is_cache());
        Ok((response, source))
    }

    /// Close the store and then the transport.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await?;
        self.transport.close().await
    }

    async fn write_entry(
        &self,
        key: &str,
        head: &ResponseHead,
        body: &[u8],
        vary: &VaryData,
    ) -> Result<()> {
        let data = self.codec.dumps(head, body, vary)?;
        self.store.set(key, Bytes::from(data)).await?;
        debug!(key = %key, size = body.len(), "Stored response");
        Ok(())
    }
}

#[async_trait]
impl<T, S> IoHandler for CachingTransport<T, S>
where
    T: Transport,
    S: CacheStore + 'static,
{
    type Error = ClientError;

    async fn handle(&self, action: IoAction) -> Result<ActionResult> {
        match action {
            IoAction::CacheGet { key } => {
                let entry = self
                    .store
                    .get(&key)
                    .await?
                    .and_then(|data| self.codec.loads(&data));
                Ok(ActionResult::Entry(entry))
            }
            IoAction::CacheSet {
                key,
                response,
                vary,
                deferred,
            } => {
                let (head, body) = response.into_parts();
                if !deferred {
                    let bytes = body.collect().await.map_err(ClientError::Body)?;
                    self.write_entry(&key, &head, &bytes, &vary).await?;
                    return Ok(ActionResult::Stored(None));
                }

                match body {
                    Body::Full(bytes) => {
                        self.write_entry(&key, &head, &bytes, &vary).await?;
                        let response = Response::from_parts(head, Body::Full(bytes));
                        Ok(ActionResult::Stored(Some(response)))
                    }
                    streaming => {
                        let persist = persist_async(
                            self.store.clone(),
                            self.codec.clone(),
                            key,
                            head.clone(),
                            vary,
                        );
                        let wrapped = CachingStream::new(streaming.into_stream(), persist);
                        let response = Response::from_parts(head, Body::from_stream(wrapped));
                        Ok(ActionResult::Stored(Some(response)))
                    }
                }
            }
            IoAction::CacheDelete { key } => {
                self.store.delete(&key).await?;
                debug!(key = %key, "Deleted cache entry");
                Ok(ActionResult::Done)
            }
            IoAction::MakeRequest { request } => {
                let head = request.head();
                let mut response = self.transport.send(request).await?;
                response.ext.set_real_request(Some(head));
                Ok(ActionResult::Response(response))
            }
            IoAction::CloseResponseStream { body } => {
                let mut stream = body.into_stream();
                while let Some(chunk) = stream.next().await {
                    if let Err(e) = chunk {
                        debug!(error = %e, "Error while draining response body");
                        break;
                    }
                }
                Ok(ActionResult::Done)
            }
        }
    }
}

/// Blocking transport that consults a cache store before the network.
pub struct BlockingCachingTransport<T, S> {
    transport: T,
    store: Arc<S>,
    codec: Arc<dyn EntryCodec>,
    config: PolicyConfig,
}

impl<T, S> BlockingCachingTransport<T, S>
where
    T: BlockingTransport,
    S: BlockingCacheStore + 'static,
{
    pub fn new(transport: T, store: Arc<S>) -> Self {
        Self {
            transport,
            store,
            codec: Arc::new(MsgPackCodec),
            config: PolicyConfig::default(),
        }
    }

    /// Replace the caching policy configuration.
    pub fn with_config(mut self, config: PolicyConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the entry codec.
    pub fn with_codec(mut self, codec: impl EntryCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Answer a request from the cache or the origin.
    pub fn handle(&self, request: Request) -> Result<(Response, Source)> {
        let policy = CachingPolicy::new(request, self.config.clone());
        let (mut response, source) = policy.run_blocking(self)?;
        response.ext.insert("from_cache", source.is_cache());
        Ok((response, source))
    }

    /// Close the store and then the transport.
    pub fn close(&self) -> Result<()> {
        self.store.close()?;
        self.transport.close()
    }

    fn write_entry(
        &self,
        key: &str,
        head: &ResponseHead,
        body: &[u8],
        vary: &VaryData,
    ) -> Result<()> {
        let data = self.codec.dumps(head, body, vary)?;
        self.store.set(key, Bytes::from(data))?;
        debug!(key = %key, size = body.len(), "Stored response");
        Ok(())
    }
}

impl<T, S> BlockingIoHandler for BlockingCachingTransport<T, S>
where
    T: BlockingTransport,
    S: BlockingCacheStore + 'static,
{
    type Error = ClientError;

    fn handle(&self, action: IoAction) -> Result<ActionResult> {
        match action {
            IoAction::CacheGet { key } => {
                let entry = self.store.get(&key)?.and_then(|data| self.codec.loads(&data));
                Ok(ActionResult::Entry(entry))
            }
            IoAction::CacheSet {
                key,
                response,
                vary,
                deferred,
            } => {
                let (head, body) = response.into_parts();
                if !deferred {
                    let bytes = body.collect_blocking().map_err(ClientError::Body)?;
                    self.write_entry(&key, &head, &bytes, &vary)?;
                    return Ok(ActionResult::Stored(None));
                }

                match body {
                    Body::Full(bytes) => {
                        self.write_entry(&key, &head, &bytes, &vary)?;
                        let response = Response::from_parts(head, Body::Full(bytes));
                        Ok(ActionResult::Stored(Some(response)))
                    }
                    streaming => {
                        let persist = persist_blocking(
                            self.store.clone(),
                            self.codec.clone(),
                            key,
                            head.clone(),
                            vary,
                        );
                        let wrapped = CachingBodyIter::new(streaming.into_blocking(), persist);
                        let response = Response::from_parts(head, Body::from_blocking(wrapped));
                        Ok(ActionResult::Stored(Some(response)))
                    }
                }
            }
            IoAction::CacheDelete { key } => {
                self.store.delete(&key)?;
                debug!(key = %key, "Deleted cache entry");
                Ok(ActionResult::Done)
            }
            IoAction::MakeRequest { request } => {
                let head = request.head();
                let mut response = self.transport.send(request)?;
                response.ext.set_real_request(Some(head));
                Ok(ActionResult::Response(response))
            }
            IoAction::CloseResponseStream { body } => {
                for chunk in body.into_blocking() {
                    if let Err(e) = chunk {
                        debug!(error = %e, "Error while draining response body");
                        break;
                    }
                }
                Ok(ActionResult::Done)
            }
        }
    }
}

fn persist_async<S>(
    store: Arc<S>,
    codec: Arc<dyn EntryCodec>,
    key: String,
    head: ResponseHead,
    vary: VaryData,
) -> impl FnOnce(Bytes) -> PersistFuture + Send + 'static
where
    S: CacheStore + 'static,
{
    move |body: Bytes| -> PersistFuture {
        Box::pin(async move {
            let data = match codec.dumps(&head, &body, &vary) {
                Ok(data) => data,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to encode response for cache");
                    return;
                }
            };
            match store.set(&key, Bytes::from(data)).await {
                Ok(()) => debug!(key = %key, size = body.len(), "Stored streamed response"),
                Err(e) => warn!(key = %key, error = %e, "Failed to store streamed response"),
            }
        })
    }
}

fn persist_blocking<S>(
    store: Arc<S>,
    codec: Arc<dyn EntryCodec>,
    key: String,
    head: ResponseHead,
    vary: VaryData,
) -> impl FnOnce(Bytes) + Send + 'static
where
    S: BlockingCacheStore + 'static,
{
    move |body: Bytes| {
        let data = match codec.dumps(&head, &body, &vary) {
            Ok(data) => data,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode response for cache");
                return;
            }
        };
        match store.set(&key, Bytes::from(data)) {
            Ok(()) => debug!(key = %key, size = body.len(), "Stored streamed response"),
            Err(e) => warn!(key = %key, error = %e, "Failed to store streamed response"),
        }
    }
}
