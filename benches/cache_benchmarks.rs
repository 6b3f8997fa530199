#![allow(deprecated)]

//! Benchmarks for the caching policy engine and stores

use bytes::Bytes;
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use http::header::{self, HeaderValue};
use httpcache::headers::date_value;
use httpcache::prelude::*;
use httpcache::{CacheEntry, Clock, EntryCodec, FixedClock, MsgPackCodec, PolicyError, VaryData};
use std::sync::Arc;

const NOW: u64 = 1_700_000_000;
const URL: &str = "http://example.com/bench";

fn directive_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_control");
    group.throughput(Throughput::Elements(1));

    group.bench_function("parse_typical", |b| {
        b.iter(|| CacheControl::parse(black_box("public, max-age=3600, must-revalidate")))
    });

    group.bench_function("parse_malformed", |b| {
        b.iter(|| {
            CacheControl::parse(black_box(
                "max-age=abc, public, bogus-directive=1, , max-stale, s-maxage=",
            ))
        })
    });

    group.finish();
}

fn cached_response(clock: &FixedClock) -> Response {
    Response::new(200)
        .with_header(header::DATE, date_value(clock.now()).unwrap())
        .with_header(header::CACHE_CONTROL, HeaderValue::from_static("max-age=3600"))
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .with_body(vec![b'x'; 4096])
}

fn codec_benchmark(c: &mut Criterion) {
    let clock = FixedClock::at_unix(NOW);
    let response = cached_response(&clock);
    let (head, body) = response.into_parts();
    let body = body.as_bytes().map(<[u8]>::to_vec).unwrap_or_default();
    let vary = VaryData::new();
    let codec = MsgPackCodec;
    let encoded = codec.dumps(&head, &body, &vary).unwrap();

    let mut group = c.benchmark_group("entry_codec");
    group.throughput(Throughput::Bytes(body.len() as u64));

    group.bench_function("dumps_4k", |b| {
        b.iter(|| codec.dumps(black_box(&head), black_box(&body), &vary).unwrap())
    });

    group.bench_function("loads_4k", |b| {
        b.iter(|| black_box(codec.loads(black_box(&encoded))))
    });

    group.finish();
}

fn store_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(InMemoryCache::new());
    let value = Bytes::from(vec![0u8; 4096]);

    let mut group = c.benchmark_group("memory_store");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set", |b| {
        b.to_async(&rt).iter(|| async {
            CacheStore::set(store.as_ref(), "bench_key", value.clone())
                .await
                .unwrap();
        });
    });

    group.bench_function("get_hit", |b| {
        rt.block_on(CacheStore::set(store.as_ref(), "hit_key", value.clone()))
            .unwrap();
        b.to_async(&rt).iter(|| async {
            black_box(CacheStore::get(store.as_ref(), "hit_key").await.unwrap())
        });
    });

    group.bench_function("get_miss", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(CacheStore::get(store.as_ref(), "missing_key").await.unwrap())
        });
    });

    group.finish();
}

/// Serves a single pre-decoded entry and never reaches an origin.
struct WarmCache {
    entry: CacheEntry,
}

impl BlockingIoHandler for WarmCache {
    type Error = PolicyError;

    fn handle(&self, action: IoAction) -> Result<ActionResult, PolicyError> {
        match action {
            IoAction::CacheGet { .. } => {
                let response = self.entry.response.try_clone().ok_or(PolicyError::NotMaterialized)?;
                Ok(ActionResult::Entry(Some(CacheEntry::new(
                    response,
                    self.entry.vary.clone(),
                ))))
            }
            other => Err(PolicyError::UnexpectedResult {
                expected: "CacheGet",
                got: other.name(),
            }),
        }
    }
}

fn policy_benchmark(c: &mut Criterion) {
    let clock = Arc::new(FixedClock::at_unix(NOW));
    let config = PolicyConfig::builder().clock(clock.clone()).build();
    let handler = WarmCache {
        entry: CacheEntry::new(cached_response(&clock), VaryData::new()),
    };

    let mut group = c.benchmark_group("caching_policy");
    group.throughput(Throughput::Elements(1));

    group.bench_function("fresh_hit", |b| {
        b.iter(|| {
            let request = Request::get(URL.parse().unwrap());
            let policy = CachingPolicy::new(request, config.clone());
            black_box(policy.run_blocking(&handler).unwrap())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    directive_benchmark,
    codec_benchmark,
    store_benchmark,
    policy_benchmark
);
criterion_main!(benches);
