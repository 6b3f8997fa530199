//! Network transports that carry requests to the origin.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use httpcache_core::{Body, BoxError, Request, Response};
use std::io::Read;
use tracing::debug;

/// Sends requests to the origin asynchronously.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the response with its body still streaming.
    async fn send(&self, request: Request) -> Result<Response>;

    /// Release any resources held by the transport.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Sends requests to the origin on the calling thread.
pub trait BlockingTransport: Send + Sync {
    /// Send a request and return the response with its body still streaming.
    fn send(&self, request: Request) -> Result<Response>;

    /// Release any resources held by the transport.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Async transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a `reqwest` client from the configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.gzip)
            .brotli(config.brotli)
            .redirect(redirect)
            .build()?;

        Ok(Self { inner })
    }

    /// Wrap an existing `reqwest` client.
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Get the inner `reqwest` client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let body = request.body.collect().await.map_err(ClientError::Body)?;

        let mut outgoing = reqwest::Request::new(request.method, request.url);
        *outgoing.headers_mut() = request.headers;
        if !body.is_empty() {
            *outgoing.body_mut() = Some(reqwest::Body::from(body));
        }

        debug!(method = %outgoing.method(), url = %outgoing.url(), "Sending request");
        let incoming = self.inner.execute(outgoing).await?;

        let mut response = Response::new(incoming.status().as_u16());
        response.headers = incoming.headers().clone();
        response
            .ext
            .insert("http_version", format!("{:?}", incoming.version()));
        response.body = Body::from_stream(
            incoming
                .bytes_stream()
                .map_err(|e| Box::new(e) as BoxError),
        );

        Ok(response)
    }
}

/// Blocking transport backed by `reqwest::blocking`.
///
/// Must not be created or dropped inside an async runtime.
#[derive(Debug, Clone)]
pub struct BlockingReqwestTransport {
    inner: reqwest::blocking::Client,
}

impl BlockingReqwestTransport {
    /// Build a blocking `reqwest` client from the configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let inner = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.gzip)
            .brotli(config.brotli)
            .redirect(redirect)
            .build()?;

        Ok(Self { inner })
    }

    /// Wrap an existing blocking `reqwest` client.
    pub fn from_client(inner: reqwest::blocking::Client) -> Self {
        Self { inner }
    }
}

impl BlockingTransport for BlockingReqwestTransport {
    fn send(&self, request: Request) -> Result<Response> {
        let body = request.body.collect_blocking().map_err(ClientError::Body)?;

        let mut outgoing = reqwest::blocking::Request::new(request.method, request.url);
        *outgoing.headers_mut() = request.headers;
        if !body.is_empty() {
            *outgoing.body_mut() = Some(reqwest::blocking::Body::from(body.to_vec()));
        }

        debug!(method = %outgoing.method(), url = %outgoing.url(), "Sending request");
        let incoming = self.inner.execute(outgoing)?;

        let mut response = Response::new(incoming.status().as_u16());
        response.headers = incoming.headers().clone();
        response
            .ext
            .insert("http_version", format!("{:?}", incoming.version()));
        response.body = Body::from_blocking(ReadChunks::new(incoming));

        Ok(response)
    }
}

const CHUNK_SIZE: usize = 8 * 1024;

/// Iterator over the chunks of a blocking reader.
pub(crate) struct ReadChunks<R> {
    reader: R,
    done: bool,
}

impl<R: Read> ReadChunks<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: Read> Iterator for ReadChunks<R> {
    type Item = std::result::Result<Bytes, BoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Some(Ok(Bytes::from(buf)));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(Box::new(e)));
                }
            }
        }
    }
}
