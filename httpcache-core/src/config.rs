//! Caching policy configuration.

use crate::clock::{Clock, SystemClock};
use crate::heuristics::Heuristic;
use crate::observer::{CacheEvent, CacheObserver};
use http::Method;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Methods whose successful responses invalidate the cached entry.
pub const INVALIDATING_METHODS: [Method; 3] = [Method::PUT, Method::PATCH, Method::DELETE];

/// Status codes cached by default.
pub const DEFAULT_CACHEABLE_STATUS_CODES: [u16; 5] = [200, 203, 300, 301, 308];

/// Permanent redirects, trusted without freshness checks.
pub const PERMANENT_REDIRECT_STATUSES: [u16; 2] = [301, 308];

/// Caching policy configuration.
#[derive(Clone)]
pub struct PolicyConfig {
    /// Store responses carrying an `ETag` and revalidate them when stale.
    pub cache_etags: bool,
    /// Methods whose responses may be served from and written to the cache.
    pub cacheable_methods: HashSet<Method>,
    /// Response status codes that may be stored.
    pub cacheable_status_codes: HashSet<u16>,
    /// Expiration heuristic applied to server responses.
    pub heuristic: Option<Arc<dyn Heuristic>>,
    /// Time source for freshness calculations.
    pub clock: Arc<dyn Clock>,
    /// Decision callback.
    pub observer: Option<CacheObserver>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            cache_etags: true,
            cacheable_methods: HashSet::from([Method::GET]),
            cacheable_status_codes: HashSet::from(DEFAULT_CACHEABLE_STATUS_CODES),
            heuristic: None,
            clock: Arc::new(SystemClock),
            observer: None,
        }
    }
}

impl fmt::Debug for PolicyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyConfig")
            .field("cache_etags", &self.cache_etags)
            .field("cacheable_methods", &self.cacheable_methods)
            .field("cacheable_status_codes", &self.cacheable_status_codes)
            .field("heuristic", &self.heuristic.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl PolicyConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PolicyConfigBuilder {
        PolicyConfigBuilder::default()
    }

    pub fn is_cacheable_method(&self, method: &Method) -> bool {
        self.cacheable_methods.contains(method)
    }

    pub fn is_cacheable_status(&self, status: u16) -> bool {
        self.cacheable_status_codes.contains(&status)
    }

    pub fn is_invalidating_method(method: &Method) -> bool {
        INVALIDATING_METHODS.contains(method)
    }

    pub(crate) fn notify(&self, event: CacheEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }
}

/// Builder for [`PolicyConfig`].
#[derive(Debug, Default)]
pub struct PolicyConfigBuilder {
    config: PolicyConfig,
}

impl PolicyConfigBuilder {
    /// Enable or disable ETag based caching.
    pub fn cache_etags(mut self, enable: bool) -> Self {
        self.config.cache_etags = enable;
        self
    }

    /// Replace the cacheable methods.
    pub fn cacheable_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.config.cacheable_methods = methods.into_iter().collect();
        self
    }

    /// Replace the cacheable status codes.
    pub fn cacheable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.config.cacheable_status_codes = codes.into_iter().collect();
        self
    }

    /// Set the expiration heuristic.
    pub fn heuristic(mut self, heuristic: impl Heuristic + 'static) -> Self {
        self.config.heuristic = Some(Arc::new(heuristic));
        self
    }

    /// Set the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.config.clock = clock;
        self
    }

    /// Set the decision callback.
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.config.observer = Some(Arc::new(observer));
        self
    }

    /// Build the configuration.
    pub fn build(self) -> PolicyConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, unix_secs};
    use crate::heuristics::OneDayCacheHeuristic;
    use parking_lot::Mutex;

    #[test]
    fn test_defaults() {
        let config = PolicyConfig::default();
        assert!(config.cache_etags);
        assert!(config.is_cacheable_method(&Method::GET));
        assert!(!config.is_cacheable_method(&Method::POST));
        for status in [200, 203, 300, 301, 308] {
            assert!(config.is_cacheable_status(status));
        }
        assert!(!config.is_cacheable_status(404));
        assert!(config.heuristic.is_none());
    }

    #[test]
    fn test_invalidating_methods() {
        assert!(PolicyConfig::is_invalidating_method(&Method::PUT));
        assert!(PolicyConfig::is_invalidating_method(&Method::PATCH));
        assert!(PolicyConfig::is_invalidating_method(&Method::DELETE));
        assert!(!PolicyConfig::is_invalidating_method(&Method::POST));
    }

    #[test]
    fn test_builder() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let config = PolicyConfig::builder()
            .cache_etags(false)
            .cacheable_methods([Method::GET, Method::HEAD])
            .cacheable_status_codes([200])
            .heuristic(OneDayCacheHeuristic)
            .clock(Arc::new(FixedClock::at_unix(42)))
            .observer(move |event| sink.lock().push(event.clone()))
            .build();

        assert!(!config.cache_etags);
        assert!(config.is_cacheable_method(&Method::HEAD));
        assert!(!config.is_cacheable_status(301));
        assert!(config.heuristic.is_some());
        assert_eq!(unix_secs(config.clock.now()), 42);

        config.notify(CacheEvent::Miss { key: "k".into() });
        assert_eq!(events.lock().len(), 1);
        assert_eq!(events.lock()[0].key(), "k");
    }
}
