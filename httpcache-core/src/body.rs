//! Response and request bodies.

use crate::error::BoxError;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;

/// Lazily produced asynchronous body.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// Lazily produced blocking body.
pub type BlockingBody = Box<dyn Iterator<Item = Result<Bytes, BoxError>> + Send>;

/// HTTP message body.
///
/// A body is either fully materialized or a one-shot stream of chunks. Only
/// materialized bodies can be cloned.
pub enum Body {
    /// All bytes are in memory.
    Full(Bytes),
    /// Async chunk stream, consumed once.
    Stream(BodyStream),
    /// Blocking chunk iterator, consumed once.
    Blocking(BlockingBody),
}

impl Body {
    pub fn empty() -> Self {
        Body::Full(Bytes::new())
    }

    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Body::Stream(Box::pin(stream))
    }

    pub fn from_blocking<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Body::Blocking(Box::new(iter))
    }

    /// Whether every byte is already in memory.
    pub fn is_full(&self) -> bool {
        matches!(self, Body::Full(_))
    }

    /// The bytes of a materialized body.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Full(bytes) => Some(&bytes[..]),
            _ => None,
        }
    }

    /// Clone a materialized body. Streams cannot be cloned.
    pub fn try_clone(&self) -> Option<Body> {
        match self {
            Body::Full(bytes) => Some(Body::Full(bytes.clone())),
            _ => None,
        }
    }

    /// Read the whole body.
    pub async fn collect(self) -> Result<Bytes, BoxError> {
        match self {
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
            Body::Blocking(iter) => collect_iter(iter),
        }
    }

    /// Read the whole body from a blocking context.
    ///
    /// Async streams are driven with a local executor.
    pub fn collect_blocking(self) -> Result<Bytes, BoxError> {
        match self {
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(stream) => collect_iter(futures::executor::block_on_stream(stream)),
            Body::Blocking(iter) => collect_iter(iter),
        }
    }

    /// Convert into an async chunk stream.
    pub fn into_stream(self) -> BodyStream {
        match self {
            Body::Full(bytes) => Box::pin(stream::iter(non_empty(bytes))),
            Body::Stream(stream) => stream,
            Body::Blocking(iter) => Box::pin(stream::iter(iter)),
        }
    }

    /// Convert into a blocking chunk iterator.
    pub fn into_blocking(self) -> BlockingBody {
        match self {
            Body::Full(bytes) => Box::new(non_empty(bytes).into_iter()),
            Body::Stream(stream) => Box::new(futures::executor::block_on_stream(stream)),
            Body::Blocking(iter) => iter,
        }
    }
}

fn non_empty(bytes: Bytes) -> Option<Result<Bytes, BoxError>> {
    if bytes.is_empty() {
        None
    } else {
        Some(Ok(bytes))
    }
}

fn collect_iter<I>(iter: I) -> Result<Bytes, BoxError>
where
    I: Iterator<Item = Result<Bytes, BoxError>>,
{
    let mut buf = BytesMut::new();
    for chunk in iter {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Body::Stream(_) => f.write_str("Stream"),
            Body::Blocking(_) => f.write_str("Blocking"),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Full(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Full(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Body::Full(Bytes::from_static(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Full(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Full(Bytes::from_static(text.as_bytes()))
    }
}
