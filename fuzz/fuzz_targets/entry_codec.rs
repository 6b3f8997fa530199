//! Fuzz target for cache entry decoding.
//!
//! Stored bytes come from an external store and may be corrupt; decoding
//! must never panic, and a decoded entry must encode again.

#![no_main]

use httpcache_core::{EntryCodec, MsgPackCodec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let codec = MsgPackCodec;
    let Some(entry) = codec.loads(data) else {
        return;
    };

    let (head, body) = entry.response.into_parts();
    let body = body.as_bytes().map(<[u8]>::to_vec).unwrap_or_default();
    let encoded = codec
        .dumps(&head, &body, &entry.vary)
        .expect("decoded entries encode");

    let again = codec.loads(&encoded).expect("encoded entries decode");
    assert_eq!(again.response.status, head.status);
    assert_eq!(again.vary, entry.vary);
});
