//! Cache decision events.

use std::sync::Arc;

/// Callback invoked for every cache decision.
pub type CacheObserver = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// A decision taken by the caching policy, keyed by cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A fresh cached response was served.
    Hit { key: String },
    /// No usable entry was found.
    Miss { key: String },
    /// The request asked to skip the cache.
    Bypass { key: String },
    /// An entry exists but was stored for different request headers.
    VaryMismatch { key: String },
    /// An unusable entry was deleted.
    Purged { key: String },
    /// A response was written, or handed over for writing once read.
    Stored { key: String, deferred: bool },
    /// An unsafe method removed the entry.
    Invalidated { key: String },
    /// A `304 Not Modified` refreshed the cached entry.
    Revalidated { key: String },
}

impl CacheEvent {
    pub fn key(&self) -> &str {
        match self {
            CacheEvent::Hit { key }
            | CacheEvent::Miss { key }
            | CacheEvent::Bypass { key }
            | CacheEvent::VaryMismatch { key }
            | CacheEvent::Purged { key }
            | CacheEvent::Stored { key, .. }
            | CacheEvent::Invalidated { key }
            | CacheEvent::Revalidated { key } => key,
        }
    }
}
