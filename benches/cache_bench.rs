// ABOUTME: Criterion benchmarks for the payload codec, the resilient cache, and the rate limiter
// ABOUTME: Measures encode/decode cost around the compression threshold and in-memory cache latency
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Criterion benchmarks for the resilience layer hot paths.
//!
//! Payload sizes straddle the default 1 KiB compression threshold so the
//! gzip cost shows up next to plain JSON.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use runctl::cache::memory::InMemoryStore;
use runctl::cache::{CacheKey, PayloadCodec, ResilientCache};
use runctl::config::{CacheSettings, RateLimitSettings};
use runctl::metrics;
use runctl::rate_limiting::RateLimiter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::runtime::Runtime;

/// Test payload sizes for benchmarking
#[derive(Debug, Clone, Copy)]
enum PayloadSize {
    Small,
    Medium,
    Large,
}

impl PayloadSize {
    const ALL: [Self; 3] = [Self::Small, Self::Medium, Self::Large];

    const fn bytes(self) -> usize {
        match self {
            Self::Small => 100,
            Self::Medium => 2_000,
            Self::Large => 50_000,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Small => "100B",
            Self::Medium => "2KB",
            Self::Large => "50KB",
        }
    }
}

/// Sleep-summary shaped payload
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SleepPayload {
    score: u32,
    levels: Vec<u16>,
}

fn generate_payload(size: PayloadSize) -> SleepPayload {
    // Roughly four bytes per serialized level
    let levels = (0..size.bytes() / 4)
        .map(|i| u16::try_from(i % 100).unwrap())
        .collect();
    SleepPayload { score: 80, levels }
}

fn make_cache_key(index: u32) -> CacheKey {
    let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let date = base + Days::new(u64::from(index % 365));
    CacheKey::sleep(format!("athlete-{}", index / 365), date)
}

fn test_cache() -> ResilientCache<InMemoryStore> {
    let settings = CacheSettings::in_memory();
    ResilientCache::new(InMemoryStore::new(&settings), &settings, metrics::noop())
}

fn bench_codec(c: &mut Criterion) {
    let codec = PayloadCodec::new(true, 1_024);
    let mut group = c.benchmark_group("codec");

    for size in PayloadSize::ALL {
        let payload = generate_payload(size);
        let encoded = codec.encode(&payload).unwrap();

        group.throughput(Throughput::Bytes(encoded.serialized_len as u64));
        group.bench_with_input(BenchmarkId::new("encode", size.name()), &payload, |b, payload| {
            b.iter(|| codec.encode(black_box(payload)).unwrap());
        });
        group.bench_with_input(
            BenchmarkId::new("decode", size.name()),
            &encoded.bytes,
            |b, bytes| {
                b.iter(|| {
                    let _: SleepPayload = codec.decode(black_box(bytes)).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_cache_set_get(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("cache");

    for size in PayloadSize::ALL {
        let cache = test_cache();
        let payload = generate_payload(size);

        group.bench_with_input(BenchmarkId::new("set", size.name()), &payload, |b, payload| {
            let mut key_index = 0_u32;
            b.iter(|| {
                let key = make_cache_key(key_index);
                key_index = key_index.wrapping_add(1) % 5_000;
                let ttl = Some(Duration::from_secs(3600));
                rt.block_on(cache.set(black_box(&key), black_box(payload), ttl))
            });
        });

        let hit_key = make_cache_key(0);
        rt.block_on(cache.set(&hit_key, &payload, None));
        group.bench_function(BenchmarkId::new("get_hit", size.name()), |b| {
            b.iter(|| {
                let _: Option<SleepPayload> = rt.block_on(cache.get(black_box(&hit_key)));
            });
        });
    }

    let cache = test_cache();
    let miss_key = make_cache_key(9_999);
    group.bench_function("get_miss", |b| {
        b.iter(|| {
            let _: Option<SleepPayload> = rt.block_on(cache.get(black_box(&miss_key)));
        });
    });

    group.finish();
}

fn bench_rate_limiter(c: &mut Criterion) {
    let limiter = RateLimiter::new(RateLimitSettings::new(u32::MAX, u32::MAX));
    let mut group = c.benchmark_group("rate_limiter");

    group.bench_function("acquire_single_key", |b| {
        b.iter(|| limiter.acquire(black_box("sleep"), 1));
    });

    let keys: Vec<String> = (0..64).map(|i| format!("endpoint-{i}")).collect();
    group.bench_function("acquire_64_keys", |b| {
        let mut index = 0_usize;
        b.iter(|| {
            index = (index + 1) % keys.len();
            limiter.acquire(black_box(&keys[index]), 1)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_codec, bench_cache_set_get, bench_rate_limiter);
criterion_main!(benches);
