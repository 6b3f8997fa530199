//! Request and response types seen by the caching policy.

use crate::body::Body;
use crate::error::BoxError;
use bytes::Bytes;
use http::header::{AsHeaderName, HeaderMap, HeaderName, HeaderValue};
use http::Method;
use serde_json::{Map, Value};
use url::Url;

/// Where a final response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Served from (or revalidated into) the cache.
    Cache,
    /// Fetched from the origin server.
    Server,
}

impl Source {
    pub fn is_cache(&self) -> bool {
        matches!(self, Source::Cache)
    }
}

/// Method, URL and headers of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHead {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

/// An outgoing HTTP request.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Append a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn head(&self) -> RequestHead {
        RequestHead {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
        }
    }

    /// Cache key: the serialized absolute URL.
    pub fn cache_key(&self) -> String {
        self.url.as_str().to_string()
    }
}

/// Out-of-band response metadata.
///
/// `values` is persisted with cached entries. `real_request` records the
/// request that went over the wire and is never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extensions {
    values: Map<String, Value>,
    real_request: Option<RequestHead>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Map<String, Value>) -> Self {
        Self {
            values,
            real_request: None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Serializable values.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn real_request(&self) -> Option<&RequestHead> {
        self.real_request.as_ref()
    }

    pub fn set_real_request(&mut self, head: Option<RequestHead>) {
        self.real_request = head;
    }

    /// The `from_cache` flag set by the transport adapters.
    pub fn from_cache(&self) -> Option<bool> {
        self.values.get("from_cache").and_then(Value::as_bool)
    }
}

/// An HTTP response, either from the server or rebuilt from the cache.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Body,
    pub ext: Extensions,
}

/// A response without its body.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: HeaderMap,
    pub ext: Extensions,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::empty(),
            ext: Extensions::default(),
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header as a string.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Status 400 and above.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    pub fn from_cache(&self) -> bool {
        self.ext.from_cache().unwrap_or(false)
    }

    pub fn head(&self) -> ResponseHead {
        ResponseHead {
            status: self.status,
            headers: self.headers.clone(),
            ext: self.ext.clone(),
        }
    }

    pub fn into_parts(self) -> (ResponseHead, Body) {
        (
            ResponseHead {
                status: self.status,
                headers: self.headers,
                ext: self.ext,
            },
            self.body,
        )
    }

    pub fn from_parts(head: ResponseHead, body: Body) -> Self {
        Self {
            status: head.status,
            headers: head.headers,
            body,
            ext: head.ext,
        }
    }

    /// Clone a response whose body is materialized.
    pub fn try_clone(&self) -> Option<Response> {
        let body = self.body.try_clone()?;
        Some(Self::from_parts(self.head(), body))
    }

    /// Read the whole body.
    pub async fn bytes(self) -> Result<Bytes, BoxError> {
        self.body.collect().await
    }

    /// Read the whole body from a blocking context.
    pub fn bytes_blocking(self) -> Result<Bytes, BoxError> {
        self.body.collect_blocking()
    }

    /// Read the whole body as UTF-8 text, replacing invalid sequences.
    pub async fn text(self) -> Result<String, BoxError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
