//! Cache entry encoding.
//!
//! Entries are stored as `cc=<version>,<payload>`. Version `0` is a
//! MessagePack map:
//!
//! ```text
//! { response: { body: bin, headers: [[bin, bin], ...], status_code: int, ext: map },
//!   vary: { name: str | nil } }
//! ```

use crate::body::Body;
use crate::error::CodecError;
use crate::headers::VaryData;
use crate::models::{Extensions, Response, ResponseHead};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

const VERSION_PREFIX: &[u8] = b"cc=";
const CURRENT_VERSION: &[u8] = b"0";

/// A decoded cache entry: the stored response and the request header values
/// it varies on.
#[derive(Debug)]
pub struct CacheEntry {
    pub response: Response,
    pub vary: VaryData,
}

impl CacheEntry {
    pub fn new(response: Response, vary: VaryData) -> Self {
        Self { response, vary }
    }
}

/// Converts cache entries to and from bytes.
pub trait EntryCodec: Send + Sync {
    /// Encode a response head, its full body and the vary data.
    fn dumps(&self, head: &ResponseHead, body: &[u8], vary: &VaryData) -> Result<Vec<u8>, CodecError>;

    /// Decode stored bytes. Anything that cannot be decoded is a miss.
    fn loads(&self, data: &[u8]) -> Option<CacheEntry>;
}

/// Versioned MessagePack codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    response: StoredResponse,
    #[serde(default)]
    vary: VaryData,
}

#[derive(Serialize, Deserialize)]
struct StoredResponse {
    body: ByteBuf,
    headers: Vec<(ByteBuf, ByteBuf)>,
    status_code: u16,
    #[serde(default, deserialize_with = "ext_values")]
    ext: Map<String, Value>,
}

/// Decode `ext`, accepting MessagePack `bin` values as well.
///
/// Binary values become text when they are valid UTF-8 (`http_version`
/// is written as `b"HTTP/1.1"` by other writers of this format) and an
/// array of byte values otherwise.
fn ext_values<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, ExtValue>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(key, ExtValue(value))| (key, value)).collect())
}

struct ExtValue(Value);

impl<'de> Deserialize<'de> for ExtValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ExtValueVisitor).map(ExtValue)
    }
}

struct ExtValueVisitor;

fn bytes_value(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(text.to_owned()),
        Err(_) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

impl<'de> Visitor<'de> for ExtValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a MessagePack value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(bytes_value(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        ExtValue::deserialize(deserializer).map(|ExtValue(value)| value)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(ExtValue(value)) = seq.next_element()? {
            items.push(value);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = Map::new();
        while let Some((key, ExtValue(value))) = map.next_entry::<String, ExtValue>()? {
            object.insert(key, value);
        }
        Ok(Value::Object(object))
    }
}

impl MsgPackCodec {
    fn loads_v0(&self, payload: &[u8]) -> Option<CacheEntry> {
        let stored: StoredEntry = match rmp_serde::from_slice(payload) {
            Ok(stored) => stored,
            Err(e) => {
                debug!(error = %e, "Failed to decode cache entry");
                return None;
            }
        };

        let mut headers = HeaderMap::with_capacity(stored.response.headers.len());
        for (name, value) in stored.response.headers {
            match (
                HeaderName::from_bytes(&name),
                HeaderValue::from_bytes(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => trace!("Skipping invalid cached header"),
            }
        }

        if headers
            .get(header::TRANSFER_ENCODING)
            .is_some_and(|v| v.as_bytes().eq_ignore_ascii_case(b"chunked"))
        {
            headers.remove(header::TRANSFER_ENCODING);
        }

        let response = Response {
            status: stored.response.status_code,
            headers,
            body: Body::Full(stored.response.body.into_vec().into()),
            ext: Extensions::from_values(stored.response.ext),
        };

        Some(CacheEntry::new(response, stored.vary))
    }
}

impl EntryCodec for MsgPackCodec {
    fn dumps(&self, head: &ResponseHead, body: &[u8], vary: &VaryData) -> Result<Vec<u8>, CodecError> {
        let stored = StoredEntry {
            response: StoredResponse {
                body: ByteBuf::from(body.to_vec()),
                headers: head
                    .headers
                    .iter()
                    .map(|(name, value)| {
                        (
                            ByteBuf::from(name.as_str().as_bytes().to_vec()),
                            ByteBuf::from(value.as_bytes().to_vec()),
                        )
                    })
                    .collect(),
                status_code: head.status,
                ext: head.ext.values().clone(),
            },
            vary: vary.clone(),
        };

        let payload =
            rmp_serde::to_vec_named(&stored).map_err(|e| CodecError::Encode(e.to_string()))?;

        let mut data = Vec::with_capacity(VERSION_PREFIX.len() + 2 + payload.len());
        data.extend_from_slice(VERSION_PREFIX);
        data.extend_from_slice(CURRENT_VERSION);
        data.push(b',');
        data.extend_from_slice(&payload);
        Ok(data)
    }

    fn loads(&self, data: &[u8]) -> Option<CacheEntry> {
        if data.is_empty() {
            return None;
        }

        let (version, payload) = match data.iter().position(|b| *b == b',') {
            Some(comma) if data[..comma].starts_with(VERSION_PREFIX) => {
                (&data[VERSION_PREFIX.len()..comma], &data[comma + 1..])
            }
            // No usable version tag: the whole input is a v0 payload.
            _ => (CURRENT_VERSION, data),
        };

        match version {
            b"0" => self.loads_v0(payload),
            other => {
                debug!(
                    version = %String::from_utf8_lossy(other),
                    "Unknown cache entry version, treating as miss"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head() -> ResponseHead {
        let mut headers = HeaderMap::new();
        headers.insert(header::ETAG, HeaderValue::from_static("\"abc\""));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        let mut ext = Extensions::new();
        ext.insert("http_version", "HTTP/1.1");
        ResponseHead {
            status: 200,
            headers,
            ext,
        }
    }

    #[test]
    fn test_round_trip() {
        let codec = MsgPackCodec;
        let mut vary = VaryData::new();
        vary.insert("Accept".to_string(), Some("text/plain".to_string()));
        vary.insert("X-Absent".to_string(), None);

        let data = codec.dumps(&head(), b"body bytes", &vary).unwrap();
        assert!(data.starts_with(b"cc=0,"));

        let entry = codec.loads(&data).unwrap();
        assert_eq!(entry.response.status, 200);
        assert_eq!(entry.response.header(header::ETAG), Some("\"abc\""));
        assert_eq!(entry.response.headers.get_all(header::SET_COOKIE).iter().count(), 2);
        assert_eq!(entry.response.body.as_bytes(), Some(&b"body bytes"[..]));
        assert_eq!(
            entry.response.ext.get("http_version"),
            Some(&Value::from("HTTP/1.1"))
        );
        assert_eq!(entry.vary, vary);
    }

    #[test]
    fn test_real_request_is_not_encoded() {
        let codec = MsgPackCodec;
        let mut head = head();
        head.ext.set_real_request(Some(crate::models::RequestHead {
            method: http::Method::GET,
            url: url::Url::parse("http://example.com").unwrap(),
            headers: HeaderMap::new(),
        }));

        let data = codec.dumps(&head, b"", &VaryData::new()).unwrap();
        let entry = codec.loads(&data).unwrap();
        assert!(entry.response.ext.real_request().is_none());
    }

    #[test]
    fn test_unknown_version_is_miss() {
        let codec = MsgPackCodec;
        let data = codec.dumps(&head(), b"x", &VaryData::new()).unwrap();
        let mut tampered = b"cc=7".to_vec();
        tampered.extend_from_slice(&data[4..]);
        assert!(codec.loads(&tampered).is_none());
    }

    #[test]
    fn test_empty_and_garbage_are_misses() {
        let codec = MsgPackCodec;
        assert!(codec.loads(b"").is_none());
        assert!(codec.loads(b"cc=0,not msgpack").is_none());
        assert!(codec.loads(b"garbage without comma").is_none());
    }

    #[test]
    fn test_untagged_payload_is_version_zero() {
        let codec = MsgPackCodec;
        let data = codec.dumps(&head(), b"payload", &VaryData::new()).unwrap();
        let untagged = &data[b"cc=0,".len()..];

        let entry = codec.loads(untagged).unwrap();
        assert_eq!(entry.response.body.as_bytes(), Some(&b"payload"[..]));
    }

    #[derive(Serialize)]
    struct ForeignResponse {
        body: ByteBuf,
        headers: Vec<(ByteBuf, ByteBuf)>,
        status_code: u16,
        ext: BTreeMap<&'static str, ByteBuf>,
    }

    #[derive(Serialize)]
    struct ForeignEntry {
        response: ForeignResponse,
        vary: BTreeMap<&'static str, Option<&'static str>>,
    }

    #[test]
    fn test_binary_ext_values_decode() {
        let entry = ForeignEntry {
            response: ForeignResponse {
                body: ByteBuf::from(b"hello".to_vec()),
                headers: vec![(
                    ByteBuf::from(b"content-type".to_vec()),
                    ByteBuf::from(b"text/plain".to_vec()),
                )],
                status_code: 200,
                ext: BTreeMap::from([
                    ("http_version", ByteBuf::from(b"HTTP/1.1".to_vec())),
                    ("raw", ByteBuf::from(vec![0xff, 0x00])),
                ]),
            },
            vary: BTreeMap::from([("Accept", None)]),
        };
        let mut data = b"cc=0,".to_vec();
        data.extend_from_slice(&rmp_serde::to_vec_named(&entry).unwrap());

        let decoded = MsgPackCodec.loads(&data).unwrap();
        assert_eq!(decoded.response.status, 200);
        assert_eq!(decoded.response.body.as_bytes(), Some(&b"hello"[..]));
        assert_eq!(
            decoded.response.ext.get("http_version"),
            Some(&Value::from("HTTP/1.1"))
        );
        assert_eq!(
            decoded.response.ext.get("raw"),
            Some(&serde_json::json!([255, 0]))
        );
        assert_eq!(decoded.vary.get("Accept"), Some(&None));
    }

    #[test]
    fn test_chunked_transfer_encoding_dropped() {
        let codec = MsgPackCodec;
        let mut head = head();
        head.headers
            .insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let data = codec.dumps(&head, b"abc", &VaryData::new()).unwrap();
        let entry = codec.loads(&data).unwrap();
        assert!(!entry.response.headers.contains_key(header::TRANSFER_ENCODING));
    }
}
