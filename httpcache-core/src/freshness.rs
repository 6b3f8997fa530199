//! Freshness evaluation of cached responses.

use crate::clock::unix_secs;
use crate::config::PERMANENT_REDIRECT_STATUSES;
use crate::directives::CacheControl;
use crate::headers::http_date;
use crate::models::Response;
use http::header;
use std::time::SystemTime;
use tracing::debug;

/// Outcome of checking a cached response against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Serve the cached response as is.
    Good,
    /// Stale but has a validator: revalidate with the origin.
    Inconclusive,
    /// Unusable: delete the entry and treat as a miss.
    Purge,
}

/// Decide whether a cached response can satisfy a request.
///
/// `request_cc` are the request's directives. Vary matching happens before
/// this is called.
pub fn evaluate(request_cc: &CacheControl, cached: &Response, now: SystemTime) -> Evaluation {
    if PERMANENT_REDIRECT_STATUSES.contains(&cached.status) {
        debug!("Returning cached permanent redirect, ignoring date and etag");
        return Evaluation::Good;
    }

    let has_etag = cached.headers.contains_key(header::ETAG);

    let Some(date) = http_date(&cached.headers, header::DATE) else {
        if has_etag {
            debug!("Cached response has no usable date, revalidating");
            return Evaluation::Inconclusive;
        }
        debug!("Cached response has neither date nor etag");
        return Evaluation::Purge;
    };

    let date = unix_secs(date);
    let mut current_age = unix_secs(now).saturating_sub(date).max(0);
    debug!(current_age, "Current age based on date");

    let response_cc = CacheControl::from_headers(&cached.headers);
    let mut freshness_lifetime = 0;

    if let Some(max_age) = response_cc.max_age() {
        freshness_lifetime = max_age;
        debug!(freshness_lifetime, "Freshness lifetime from max-age");
    } else if let Some(expires) = http_date(&cached.headers, header::EXPIRES) {
        freshness_lifetime = unix_secs(expires).saturating_sub(date).max(0);
        debug!(freshness_lifetime, "Freshness lifetime from expires");
    }

    if let Some(max_age) = request_cc.max_age() {
        freshness_lifetime = max_age;
        debug!(freshness_lifetime, "Freshness lifetime from request max-age");
    }

    if let Some(min_fresh) = request_cc.min_fresh() {
        current_age = current_age.saturating_add(min_fresh);
        debug!(current_age, "Adjusted current age from min-fresh");
    }

    if freshness_lifetime > current_age {
        debug!(freshness_lifetime, current_age, "Cached response is fresh");
        return Evaluation::Good;
    }

    if has_etag {
        Evaluation::Inconclusive
    } else {
        debug!("Cached response is stale with no etag");
        Evaluation::Purge
    }
}
