//! Integration tests for common caching workflows.
//!
//! These run the caching transport against a scripted origin, an in-memory
//! store and a fixed clock.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{HeaderMap, Method};
use httpcache::headers::date_value;
use httpcache::prelude::*;
use httpcache::{CacheEvent, Clock, FixedClock, Transport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

const NOW: u64 = 1_700_000_000;
const URL: &str = "http://example.com/articles/1";

// =============================================================================
// Test Harness
// =============================================================================

/// Origin that replays scripted responses and records what it was sent.
#[derive(Default)]
struct ScriptedOrigin {
    responses: Mutex<VecDeque<Response>>,
    sent: Mutex<Vec<HeaderMap>>,
}

impl ScriptedOrigin {
    fn calls(&self) -> usize {
        self.sent.lock().len()
    }

    fn last_sent(&self) -> HeaderMap {
        self.sent.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Transport for ScriptedOrigin {
    async fn send(&self, request: Request) -> httpcache::httpcache_client::Result<Response> {
        self.sent.lock().push(request.headers.clone());
        self.responses.lock().pop_front().ok_or_else(|| {
            ClientError::RequestBuild(format!("no scripted response for {}", request.url))
        })
    }
}

struct Fixture {
    clock: Arc<FixedClock>,
    store: Arc<InMemoryCache>,
    transport: CachingTransport<ScriptedOrigin, InMemoryCache>,
    events: Arc<Mutex<Vec<CacheEvent>>>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_policy(|builder| builder)
    }

    fn with_policy(
        customize: impl FnOnce(httpcache::PolicyConfigBuilder) -> httpcache::PolicyConfigBuilder,
    ) -> Self {
        let clock = Arc::new(FixedClock::at_unix(NOW));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let policy = customize(
            PolicyConfig::builder()
                .clock(clock.clone())
                .observer(move |event: &CacheEvent| sink.lock().push(event.clone())),
        )
        .build();

        let store = Arc::new(InMemoryCache::new());
        let transport =
            CachingTransport::new(ScriptedOrigin::default(), store.clone()).with_config(policy);

        Self {
            clock,
            store,
            transport,
            events,
        }
    }

    fn origin(&self) -> &ScriptedOrigin {
        self.transport.transport()
    }

    fn script(&self, response: Response) {
        self.origin().responses.lock().push_back(response);
    }

    fn date(&self) -> HeaderValue {
        date_value(self.clock.now()).unwrap()
    }

    fn ok(&self, body: &'static str) -> Response {
        Response::new(200)
            .with_header(header::DATE, self.date())
            .with_body(body)
    }

    async fn fetch(&self, request: Request) -> (Response, Source, Bytes) {
        let (response, source) = self.transport.handle(request).await.unwrap();
        let head = response.head();
        let body = response.bytes().await.unwrap();
        (Response::from_parts(head, Body::from(body.clone())), source, body)
    }

    async fn get(&self) -> (Response, Source, Bytes) {
        self.fetch(get()).await
    }
}

fn get() -> Request {
    Request::get(URL.parse().unwrap())
}

fn hv(value: &'static str) -> HeaderValue {
    HeaderValue::from_static(value)
}

// =============================================================================
// Freshness
// =============================================================================

#[tokio::test]
async fn test_fresh_response_reserved_without_origin() {
    let fx = Fixture::new();
    fx.script(fx.ok("article").with_header(header::CACHE_CONTROL, hv("max-age=3600")));

    let (first, source, body) = fx.get().await;
    assert_eq!(source, Source::Server);
    assert!(!first.from_cache());
    assert_eq!(body, "article");

    fx.clock.advance(Duration::from_secs(60));
    for _ in 0..3 {
        let (cached, source, body) = fx.get().await;
        assert_eq!(source, Source::Cache);
        assert!(cached.from_cache());
        assert_eq!(cached.status, 200);
        assert_eq!(body, "article");
    }
    assert_eq!(fx.origin().calls(), 1);
}

#[tokio::test]
async fn test_max_age_zero_request_bypasses_cache() {
    let fx = Fixture::new();
    fx.script(fx.ok("v1").with_header(header::CACHE_CONTROL, hv("max-age=3600")));
    fx.script(fx.ok("v2").with_header(header::CACHE_CONTROL, hv("max-age=3600")));

    fx.get().await;
    let request = get().with_header(header::CACHE_CONTROL, hv("max-age=0"));
    let (_, source, body) = fx.fetch(request).await;

    assert_eq!(source, Source::Server);
    assert_eq!(body, "v2");
    assert!(fx
        .events
        .lock()
        .iter()
        .any(|e| matches!(e, CacheEvent::Bypass { .. })));
}

#[tokio::test]
async fn test_permanent_redirect_trusted_indefinitely() {
    let fx = Fixture::new();
    fx.script(
        Response::new(308)
            .with_header(header::LOCATION, hv("/articles/2"))
            .with_body("moved"),
    );

    let (first, _, _) = fx.get().await;
    assert_eq!(first.status, 308);

    fx.clock.advance(Duration::from_secs(365 * 86_400));
    let (cached, source, body) = fx.get().await;
    assert_eq!(source, Source::Cache);
    assert_eq!(cached.status, 308);
    assert_eq!(cached.header(header::LOCATION), Some("/articles/2"));
    assert!(body.is_empty());
    assert_eq!(fx.origin().calls(), 1);
}

#[tokio::test]
async fn test_stale_entry_without_validator_is_purged() {
    let fx = Fixture::new();
    fx.script(fx.ok("old").with_header(header::CACHE_CONTROL, hv("max-age=60")));
    fx.get().await;
    assert_eq!(fx.store.len(), 1);

    fx.clock.advance(Duration::from_secs(120));
    fx.script(fx.ok("new"));
    let (_, source, body) = fx.get().await;

    assert_eq!(source, Source::Server);
    assert_eq!(body, "new");
    assert!(fx.store.is_empty());
}

// =============================================================================
// Invalidation
// =============================================================================

#[tokio::test]
async fn test_put_invalidates_cached_entry() {
    let fx = Fixture::new();
    fx.script(fx.ok("draft").with_header(header::CACHE_CONTROL, hv("max-age=3600")));
    fx.script(Response::new(204));
    fx.script(fx.ok("published").with_header(header::CACHE_CONTROL, hv("max-age=3600")));

    fx.get().await;
    let put = Request::new(Method::PUT, URL.parse().unwrap()).with_body("published");
    let (updated, source, _) = fx.fetch(put).await;
    assert_eq!(updated.status, 204);
    assert_eq!(source, Source::Server);
    assert!(fx.store.is_empty());

    let (_, source, body) = fx.get().await;
    assert_eq!(source, Source::Server);
    assert_eq!(body, "published");
}

#[tokio::test]
async fn test_failed_delete_keeps_entry() {
    let fx = Fixture::new();
    fx.script(fx.ok("keep").with_header(header::CACHE_CONTROL, hv("max-age=3600")));
    fx.script(Response::new(500));

    fx.get().await;
    fx.fetch(Request::new(Method::DELETE, URL.parse().unwrap())).await;

    let (_, source, body) = fx.get().await;
    assert_eq!(source, Source::Cache);
    assert_eq!(body, "keep");
}

#[tokio::test]
async fn test_no_store_response_purges_revalidated_entry() {
    let fx = Fixture::new();
    fx.script(fx.ok("cached").with_header(header::ETAG, hv("\"v1\"")));
    fx.get().await;
    assert_eq!(fx.store.len(), 1);

    fx.script(fx.ok("private").with_header(header::CACHE_CONTROL, hv("no-store")));
    let (_, source, body) = fx.get().await;

    assert_eq!(source, Source::Server);
    assert_eq!(body, "private");
    assert!(fx.store.is_empty());
}

// =============================================================================
// Vary
// =============================================================================

#[tokio::test]
async fn test_vary_mismatch_goes_to_origin() {
    let fx = Fixture::new();
    let english = || get().with_header(header::ACCEPT_LANGUAGE, hv("en"));
    let french = || get().with_header(header::ACCEPT_LANGUAGE, hv("fr"));

    fx.script(
        fx.ok("hello")
            .with_header(header::CACHE_CONTROL, hv("max-age=3600"))
            .with_header(header::VARY, hv("Accept-Language")),
    );
    fx.script(fx.ok("bonjour"));

    fx.fetch(english()).await;
    let (_, source, _) = fx.fetch(english()).await;
    assert_eq!(source, Source::Cache);

    let (_, source, body) = fx.fetch(french()).await;
    assert_eq!(source, Source::Server);
    assert_eq!(body, "bonjour");
    assert!(fx
        .events
        .lock()
        .iter()
        .any(|e| matches!(e, CacheEvent::VaryMismatch { .. })));
}

#[tokio::test]
async fn test_vary_star_never_stored() {
    let fx = Fixture::new();
    fx.script(
        fx.ok("dynamic")
            .with_header(header::CACHE_CONTROL, hv("max-age=3600"))
            .with_header(header::VARY, hv("*")),
    );

    fx.get().await;
    assert!(fx.store.is_empty());
}

// =============================================================================
// Revalidation
// =============================================================================

#[tokio::test]
async fn test_not_modified_merges_into_cached_entry() {
    let fx = Fixture::new();
    fx.script(
        fx.ok("cache")
            .with_header(header::CACHE_CONTROL, hv("max-age=60"))
            .with_header(header::ETAG, hv("\"abc\""))
            .with_header(header::CONTENT_LENGTH, hv("5"))
            .with_header(header::HeaderName::from_static("x-version"), hv("1")),
    );
    fx.get().await;

    fx.clock.advance(Duration::from_secs(120));
    fx.script(
        Response::new(304)
            .with_header(header::DATE, fx.date())
            .with_header(header::CONTENT_LENGTH, hv("0"))
            .with_header(header::HeaderName::from_static("x-version"), hv("2")),
    );

    let (merged, source, body) = fx.get().await;
    assert_eq!(source, Source::Cache);
    assert_eq!(merged.status, 200);
    assert_eq!(body, "cache");
    assert_eq!(merged.header("x-version"), Some("2"));
    assert_eq!(merged.header(header::CONTENT_LENGTH), Some("5"));
    assert_eq!(fx.origin().last_sent().get(header::IF_NONE_MATCH).unwrap(), "\"abc\"");

    let (_, source, body) = fx.get().await;
    assert_eq!(source, Source::Cache);
    assert_eq!(body, "cache");
    assert_eq!(fx.origin().calls(), 2);
}

#[tokio::test]
async fn test_last_modified_sent_as_if_modified_since() {
    let fx = Fixture::new();
    fx.script(
        fx.ok("doc")
            .with_header(header::ETAG, hv("\"d\""))
            .with_header(header::LAST_MODIFIED, hv("Mon, 13 Nov 2023 00:00:00 GMT")),
    );
    fx.get().await;

    fx.script(Response::new(304).with_header(header::DATE, fx.date()));
    fx.get().await;

    let sent = fx.origin().last_sent();
    assert_eq!(
        sent.get(header::IF_MODIFIED_SINCE).unwrap(),
        "Mon, 13 Nov 2023 00:00:00 GMT"
    );
    assert_eq!(sent.get(header::IF_NONE_MATCH).unwrap(), "\"d\"");
}

// =============================================================================
// Heuristics and Storage
// =============================================================================

#[tokio::test]
async fn test_one_day_heuristic_caches_plain_response() {
    let fx = Fixture::with_policy(|builder| builder.heuristic(OneDayCacheHeuristic));
    fx.script(fx.ok("plain"));

    let (first, _, _) = fx.get().await;
    assert_eq!(first.header(header::CACHE_CONTROL), Some("public"));
    assert!(first.header(header::EXPIRES).is_some());
    assert!(first.header(header::WARNING).is_some());

    fx.clock.advance(Duration::from_secs(3600));
    let (_, source, body) = fx.get().await;
    assert_eq!(source, Source::Cache);
    assert_eq!(body, "plain");
}

#[tokio::test]
async fn test_unknown_entry_version_is_a_miss() {
    let fx = Fixture::new();
    CacheStore::set(fx.store.as_ref(), URL, Bytes::from_static(b"cc=9,opaque"))
        .await
        .unwrap();
    fx.script(fx.ok("origin"));

    let (_, source, body) = fx.get().await;
    assert_eq!(source, Source::Server);
    assert_eq!(body, "origin");
}

#[tokio::test]
async fn test_post_is_never_cached() {
    let fx = Fixture::new();
    fx.script(fx.ok("created").with_header(header::CACHE_CONTROL, hv("max-age=3600")));

    let post = Request::new(Method::POST, URL.parse().unwrap()).with_body("new");
    fx.fetch(post).await;
    assert!(fx.store.is_empty());
}

#[test]
fn test_directive_parsing_is_lenient() {
    let cc = CacheControl::parse("max-age=abc, public, bogus-directive=1");
    assert_eq!(cc.len(), 1);
    assert!(cc.is_public());
    assert_eq!(cc.max_age(), None);
}
