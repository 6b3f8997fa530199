//! Body wrappers that persist a response once it has been read in full.
//!
//! The wrapped body is passed through to the caller chunk by chunk while a
//! copy is buffered. The persist callback runs only when the underlying body
//! reports its end. A chunk error or dropping the body early discards the
//! buffer and nothing is written.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use httpcache_core::{BlockingBody, BodyStream, BoxError};
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Pending write of a fully read body.
pub type PersistFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type PersistFn = Box<dyn FnOnce(Bytes) -> PersistFuture + Send>;
type BlockingPersistFn = Box<dyn FnOnce(Bytes) + Send>;

/// Async body stream that persists its content at end of stream.
pub struct CachingStream {
    inner: BodyStream,
    buffer: BytesMut,
    persist: Option<PersistFn>,
    pending: Option<PersistFuture>,
    done: bool,
}

impl CachingStream {
    pub fn new<F>(inner: BodyStream, persist: F) -> Self
    where
        F: FnOnce(Bytes) -> PersistFuture + Send + 'static,
    {
        Self {
            inner,
            buffer: BytesMut::new(),
            persist: Some(Box::new(persist)),
            pending: None,
            done: false,
        }
    }
}

impl Stream for CachingStream {
    type Item = Result<Bytes, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(pending) = this.pending.as_mut() {
            ready!(pending.as_mut().poll(cx));
            this.pending = None;
            this.done = true;
            return Poll::Ready(None);
        }

        if this.done {
            return Poll::Ready(None);
        }

        match ready!(this.inner.as_mut().poll_next(cx)) {
            Some(Ok(chunk)) => {
                if this.persist.is_some() {
                    this.buffer.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                this.persist = None;
                this.buffer.clear();
                Poll::Ready(Some(Err(e)))
            }
            None => {
                if let Some(persist) = this.persist.take() {
                    let mut pending = persist(mem::take(&mut this.buffer).freeze());
                    if pending.as_mut().poll(cx).is_pending() {
                        this.pending = Some(pending);
                        return Poll::Pending;
                    }
                }
                this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

/// Blocking body iterator that persists its content once exhausted.
pub struct CachingBodyIter {
    inner: BlockingBody,
    buffer: BytesMut,
    persist: Option<BlockingPersistFn>,
    done: bool,
}

impl CachingBodyIter {
    pub fn new<F>(inner: BlockingBody, persist: F) -> Self
    where
        F: FnOnce(Bytes) + Send + 'static,
    {
        Self {
            inner,
            buffer: BytesMut::new(),
            persist: Some(Box::new(persist)),
            done: false,
        }
    }
}

impl Iterator for CachingBodyIter {
    type Item = Result<Bytes, BoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.inner.next() {
            Some(Ok(chunk)) => {
                if self.persist.is_some() {
                    self.buffer.extend_from_slice(&chunk);
                }
                Some(Ok(chunk))
            }
            Some(Err(e)) => {
                self.persist = None;
                self.buffer.clear();
                Some(Err(e))
            }
            None => {
                if let Some(persist) = self.persist.take() {
                    persist(mem::take(&mut self.buffer).freeze());
                }
                self.done = true;
                None
            }
        }
    }
}
