//! Expiration heuristics.
//!
//! A heuristic rewrites the headers of a server response before the cache
//! write decision runs, typically by adding an `Expires` header so that a
//! response without explicit freshness information becomes storable.

use crate::clock::unix_secs;
use crate::headers::{date_value, header_str, http_date};
use http::header::{self, HeaderMap, HeaderValue};
use std::time::{Duration, SystemTime};

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Strategy that proposes header updates for a server response.
pub trait Heuristic: Send + Sync {
    /// Header updates to apply. An empty map means "leave the response alone".
    fn update_headers(&self, headers: &HeaderMap, status: u16, now: SystemTime) -> HeaderMap;

    /// `Warning` header value added alongside any update.
    fn warning(&self) -> Option<String> {
        Some("110 - \"Response is Stale\"".to_string())
    }

    /// Apply the updates in place.
    ///
    /// Every updated header replaces all existing values of that name. When
    /// at least one header changed and [`warning`](Heuristic::warning)
    /// yields a value, `Warning` is set as well.
    fn apply(&self, headers: &mut HeaderMap, status: u16, now: SystemTime) {
        let updates = self.update_headers(headers, status, now);
        if updates.is_empty() {
            return;
        }

        crate::headers::merge_headers(headers, &updates, &[]);

        if let Some(warning) = self.warning()
            && let Ok(value) = HeaderValue::from_str(&warning)
        {
            headers.insert(header::WARNING, value);
        }
    }
}

fn expires_public(expires: SystemTime) -> HeaderMap {
    let mut updates = HeaderMap::new();
    if let Some(value) = date_value(expires) {
        updates.insert(header::EXPIRES, value);
        updates.insert(header::CACHE_CONTROL, HeaderValue::from_static("public"));
    }
    updates
}

/// Cache every response for a fixed period from now.
#[derive(Debug, Clone, Copy)]
pub struct ExpiresAfterHeuristic {
    delta: Duration,
}

impl ExpiresAfterHeuristic {
    pub fn new(delta: Duration) -> Self {
        Self { delta }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn days(days: u64) -> Self {
        let secs = days.saturating_mul(ONE_DAY.as_secs());
        Self::new(Duration::from_secs(secs))
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }
}

impl Heuristic for ExpiresAfterHeuristic {
    fn update_headers(&self, _headers: &HeaderMap, _status: u16, now: SystemTime) -> HeaderMap {
        match now.checked_add(self.delta) {
            Some(expires) => expires_public(expires),
            None => HeaderMap::new(),
        }
    }

    fn warning(&self) -> Option<String> {
        Some(format!(
            "110 - Automatically cached for {:?}. Response might be stale",
            self.delta
        ))
    }
}

/// Cache a response for one day after its `Date` unless it already expires.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneDayCacheHeuristic;

impl Heuristic for OneDayCacheHeuristic {
    fn update_headers(&self, headers: &HeaderMap, _status: u16, _now: SystemTime) -> HeaderMap {
        if headers.contains_key(header::EXPIRES) {
            return HeaderMap::new();
        }

        match http_date(headers, header::DATE) {
            Some(date) => match date.checked_add(ONE_DAY) {
                Some(expires) => expires_public(expires),
                None => HeaderMap::new(),
            },
            None => HeaderMap::new(),
        }
    }
}

/// Derive an expiry from `Last-Modified`, following RFC 7234 section 4.2.2.
///
/// The lifetime is a tenth of the time between `Last-Modified` and `Date`,
/// capped at one day.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastModifiedHeuristic;

impl LastModifiedHeuristic {
    /// Statuses that are cacheable by default (RFC 7231 section 6.1).
    pub const CACHEABLE_BY_DEFAULT: [u16; 11] =
        [200, 203, 204, 206, 300, 301, 404, 405, 410, 414, 501];
}

impl Heuristic for LastModifiedHeuristic {
    fn update_headers(&self, headers: &HeaderMap, status: u16, now: SystemTime) -> HeaderMap {
        let none = HeaderMap::new();

        if headers.contains_key(header::EXPIRES) {
            return none;
        }

        if let Some(cc) = header_str(headers, header::CACHE_CONTROL)
            && cc != "public"
        {
            return none;
        }

        if !Self::CACHEABLE_BY_DEFAULT.contains(&status) {
            return none;
        }

        let (Some(date), Some(last_modified)) = (
            http_date(headers, header::DATE),
            http_date(headers, header::LAST_MODIFIED),
        ) else {
            return none;
        };

        let date_secs = unix_secs(date);
        let current_age = unix_secs(now).saturating_sub(date_secs).max(0);
        let lifetime = (date_secs.saturating_sub(unix_secs(last_modified)) / 10).clamp(0, 86_400);
        if lifetime <= current_age {
            return none;
        }

        let mut updates = HeaderMap::new();
        if let Some(value) = date
            .checked_add(Duration::from_secs(lifetime.unsigned_abs()))
            .and_then(date_value)
        {
            updates.insert(header::EXPIRES, value);
        }
        updates
    }

    fn warning(&self) -> Option<String> {
        None
    }
}
