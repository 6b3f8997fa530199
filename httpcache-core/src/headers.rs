//! Header helpers shared by the policy, the heuristics and the codec.

use http::header::{self, AsHeaderName, HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

// 9999-12-31T23:59:59Z, the last instant an IMF-fixdate can express.
const LAST_HTTP_DATE_SECS: u64 = 253_402_300_799;

/// Request header values recorded for every name listed in a response's
/// `Vary` header. `None` means the request did not carry that header.
pub type VaryData = BTreeMap<String, Option<String>>;

/// Get a header as a string, joining repeated fields with `", "`.
pub fn header_str<K: AsHeaderName>(headers: &HeaderMap, name: K) -> Option<String> {
    let values: Vec<String> = headers
        .get_all(name)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// Parse an HTTP-date header (`Date`, `Expires`, `Last-Modified`).
pub fn http_date<K: AsHeaderName>(headers: &HeaderMap, name: K) -> Option<SystemTime> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v.trim()).ok())
}

/// Format a time as an IMF-fixdate header value.
///
/// Returns `None` for times before 1970 or after 9999.
pub fn date_value(time: SystemTime) -> Option<HeaderValue> {
    let secs = time.duration_since(UNIX_EPOCH).ok()?.as_secs();
    if secs > LAST_HTTP_DATE_SECS {
        return None;
    }
    HeaderValue::from_str(&httpdate::fmt_http_date(time)).ok()
}

/// Header names listed in the `Vary` header, in order of appearance.
pub fn vary_header_names(headers: &HeaderMap) -> Vec<String> {
    header_str(headers, header::VARY)
        .map(|vary| {
            vary.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Whether the response carries `Vary: *`, which never matches any request.
pub fn has_vary_star(headers: &HeaderMap) -> bool {
    header_str(headers, header::VARY).is_some_and(|vary| vary.contains('*'))
}

/// Record the request's values for every header the response varies on.
pub fn vary_header_values(request_headers: &HeaderMap, response_headers: &HeaderMap) -> VaryData {
    vary_header_names(response_headers)
        .into_iter()
        .map(|name| {
            let value = header_str(request_headers, name.as_str());
            (name, value)
        })
        .collect()
}

/// Check that a request carries the same values the cached entry was stored
/// with. A header absent from both counts as a match.
pub fn vary_matches(request_headers: &HeaderMap, vary: &VaryData) -> bool {
    vary.iter()
        .all(|(name, value)| header_str(request_headers, name.as_str()) == *value)
}

/// Replace headers in `target` with every field present in `updates`,
/// skipping the names in `excluded`.
pub(crate) fn merge_headers(target: &mut HeaderMap, updates: &HeaderMap, excluded: &[HeaderName]) {
    for name in updates.keys() {
        if excluded.contains(name) {
            continue;
        }
        target.remove(name);
        for value in updates.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}
