//! Cache write decision for fresh server responses.

use crate::config::{PERMANENT_REDIRECT_STATUSES, PolicyConfig};
use crate::directives::CacheControl;
use crate::headers::{VaryData, has_vary_star, vary_header_values};
use crate::models::Response;
use http::header::{self, HeaderMap};
use tracing::debug;

/// What to do with the cache after receiving a server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheWrite {
    /// Remove the existing entry.
    Delete,
    /// Store the response once its body has been read.
    Store { vary: VaryData },
    /// Store a permanent redirect immediately, without a body.
    StoreRedirect { vary: VaryData },
}

/// Decide whether and how a server response should be written to the cache.
///
/// `entry_exists` tells whether a cached candidate was found for the request.
pub fn cache_write_decision(
    request_headers: &HeaderMap,
    response: &Response,
    entry_exists: bool,
    config: &PolicyConfig,
) -> Option<CacheWrite> {
    if !config.is_cacheable_status(response.status) {
        debug!(status = response.status, "Status code is not cacheable");
        return None;
    }

    let request_cc = CacheControl::from_headers(request_headers);
    let response_cc = CacheControl::from_headers(&response.headers);

    if response_cc.is_no_store() || request_cc.is_no_store() {
        debug!(
            request = request_cc.is_no_store(),
            response = response_cc.is_no_store(),
            "Honoring no-store"
        );
        return entry_exists.then_some(CacheWrite::Delete);
    }

    if has_vary_star(&response.headers) {
        debug!("Response has Vary: *, not caching");
        return None;
    }

    let vary = || vary_header_values(request_headers, &response.headers);

    if config.cache_etags && response.headers.contains_key(header::ETAG) {
        debug!("Caching due to etag");
        return Some(CacheWrite::Store { vary: vary() });
    }

    if PERMANENT_REDIRECT_STATUSES.contains(&response.status) {
        debug!("Caching permanent redirect");
        return Some(CacheWrite::StoreRedirect { vary: vary() });
    }

    if response.headers.contains_key(header::DATE) {
        if response_cc.max_age().is_some_and(|max_age| max_age > 0) {
            debug!("Caching because date exists and max-age > 0");
            return Some(CacheWrite::Store { vary: vary() });
        }

        if response
            .headers
            .get(header::EXPIRES)
            .is_some_and(|expires| !expires.is_empty())
        {
            debug!("Caching because of expires header");
            return Some(CacheWrite::Store { vary: vary() });
        }
    }

    None
}
