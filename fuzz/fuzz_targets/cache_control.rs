//! Fuzz target for Cache-Control parsing.
//!
//! Parsing must never panic, and whatever survives parsing must survive
//! being rendered and parsed again.

#![no_main]

use arbitrary::Arbitrary;
use http::{HeaderMap, HeaderValue};
use httpcache_core::CacheControl;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzCacheControl {
    /// Single raw header value
    raw: String,
    /// Repeated header field values
    fields: Vec<String>,
}

fuzz_target!(|data: FuzzCacheControl| {
    let parsed = CacheControl::parse(&data.raw);
    assert!(parsed.len() <= 12);

    let reparsed = CacheControl::parse(&parsed.to_string());
    assert_eq!(parsed, reparsed);

    let mut headers = HeaderMap::new();
    for field in &data.fields {
        if let Ok(value) = HeaderValue::from_str(field) {
            headers.append(http::header::CACHE_CONTROL, value);
        }
    }
    let _ = CacheControl::from_headers(&headers);
});
