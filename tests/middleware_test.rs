// ABOUTME: Integration tests for the composable resilience layers
// ABOUTME: Verifies layer ordering, per-attempt metrics, cache-aside behavior, and cancellation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chrono::NaiveDate;
use runctl::cache::memory::InMemoryStore;
use runctl::cache::{CacheError, CacheKey, CacheStore, ResilientCache};
use runctl::config::{BackendFailurePolicy, CacheSettings, RateLimitSettings, RetryPolicy};
use runctl::errors::{ApiError, Classify, ErrorClass};
use runctl::metrics::{self, InMemoryMetrics};
use runctl::middleware::{
    operation_fn, with_cache, with_metrics, with_rate_limit, with_retry, FetchError, Operation,
};
use runctl::rate_limiting::{RateLimitError, RateLimiter};
use runctl::retry::RetryOrchestrator;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn key() -> CacheKey {
    CacheKey::sleep("athlete-1", NaiveDate::from_ymd_opt(2024, 5, 20).unwrap())
}

fn memory_cache(metrics: Arc<InMemoryMetrics>) -> ResilientCache<InMemoryStore> {
    let settings = CacheSettings::in_memory();
    ResilientCache::new(InMemoryStore::new(&settings), &settings, metrics)
}

fn quick_retry(metrics: Arc<InMemoryMetrics>, max_attempts: u32) -> RetryOrchestrator {
    RetryOrchestrator::with_metrics(
        RetryPolicy::default()
            .with_max_attempts(max_attempts)
            .with_delays(Duration::from_millis(50), Duration::from_secs(1)),
        metrics,
    )
}

fn limiter(burst_limit: u32) -> RateLimiter {
    RateLimiter::new(RateLimitSettings {
        poll_interval: Duration::from_millis(100),
        ..RateLimitSettings::new(60, burst_limit)
    })
}

#[tokio::test(start_paused = true)]
async fn test_full_chain_retries_and_caches_result() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let calls = Arc::new(AtomicU32::new(0));
    let cache = memory_cache(metrics.clone());

    let raw = {
        let calls = calls.clone();
        operation_fn(move || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ApiError::Connection("reset by peer".into()))
                } else {
                    Ok(72_u32)
                }
            }
        })
    };
    let chain = with_cache(
        cache.clone(),
        key(),
        Some(Duration::from_secs(60)),
        with_retry(
            quick_retry(metrics.clone(), 3),
            "sleep",
            with_rate_limit(
                limiter(10),
                "sleep",
                1,
                with_metrics(metrics.clone(), "sleep", raw),
            )
            .unwrap(),
        ),
    );
    let cancel = CancellationToken::new();

    let first: u32 = chain.call(&cancel).await.unwrap();
    let second: u32 = chain.call(&cancel).await.unwrap();

    assert_eq!((first, second), (72, 72));
    assert_eq!(calls.load(Ordering::SeqCst), 2, "second call must be served from cache");
    assert_eq!(metrics.counter("api_request", Some("sleep")), 2);
    assert_eq!(metrics.counter("api_error", Some("sleep:network")), 1);
    assert_eq!(metrics.observations("api_latency", Some("sleep")).len(), 1);
    assert_eq!(metrics.counter("retry_attempt", Some("sleep")), 1);
    assert_eq!(metrics.counter("retry_success", Some("sleep")), 1);
    assert_eq!(metrics.counter("cache_miss", None), 1);
    assert_eq!(metrics.counter("cache_hit", None), 1);
    assert_eq!(cache.get::<u32>(&key()).await, Some(72));
}

#[tokio::test(start_paused = true)]
async fn test_each_retry_attempt_acquires_a_credit() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let limiter = limiter(2);
    let raw = operation_fn(|| async { Err::<u32, _>(ApiError::Timeout("slow".into())) });
    let chain = with_retry(
        quick_retry(metrics.clone(), 3),
        "stress",
        with_rate_limit(limiter.clone(), "stress", 1, raw).unwrap(),
    );
    let cancel = CancellationToken::new();
    let started = Instant::now();

    let error = chain.call(&cancel).await.unwrap_err();

    assert!(matches!(error, FetchError::Retry(_)));
    assert_eq!(error.classify(), ErrorClass::NETWORK);
    assert!(matches!(error.api_error(), Some(ApiError::Timeout(_))));
    // Two credits in the burst, the third attempt has to wait for a refill
    assert!(started.elapsed() >= Duration::from_millis(900));
    assert!(limiter.remaining("stress") < 1.0);
}

#[tokio::test]
async fn test_cache_hit_skips_inner_chain() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let cache = memory_cache(metrics.clone());
    cache.set(&key(), &5_u32, None).await;

    let calls = Arc::new(AtomicU32::new(0));
    let raw = {
        let calls = calls.clone();
        operation_fn(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<u32, ApiError>(9) }
        })
    };
    let chain = with_cache(cache, key(), None, with_metrics(metrics.clone(), "sleep", raw));

    let value: u32 = chain.call(&CancellationToken::new()).await.unwrap();
    assert_eq!(value, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(metrics.counter("api_request", Some("sleep")), 0);
}

#[tokio::test]
async fn test_cancellation_after_fetch_skips_cache_write() {
    let cache = memory_cache(Arc::new(InMemoryMetrics::new()));
    let cancel = CancellationToken::new();

    let raw = {
        let cancel = cancel.clone();
        operation_fn(move || {
            cancel.cancel();
            async { Ok::<u32, ApiError>(11) }
        })
    };
    let chain = with_cache(cache.clone(), key(), None, raw);

    let value: u32 = chain.call(&cancel).await.unwrap();
    assert_eq!(value, 11);
    assert_eq!(cache.get::<u32>(&key()).await, None);
}

#[tokio::test]
async fn test_pre_cancelled_fetch_touches_nothing() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let cache = memory_cache(metrics.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let raw = operation_fn(|| async { Ok::<u32, ApiError>(1) });
    let chain = with_cache(cache, key(), None, raw);

    let error = chain.call(&cancel).await.unwrap_err();
    assert!(error.is_cancelled());
    assert_eq!(metrics.counter("cache_miss", None), 0);
}

#[tokio::test]
async fn test_cancellation_inside_rate_limit_is_reported() {
    let limiter = limiter(1);
    assert!(limiter.acquire("sleep", 1));
    let cancel = CancellationToken::new();

    let raw = operation_fn(|| async { Ok::<u32, ApiError>(1) });
    let chain = with_retry(
        RetryOrchestrator::new(RetryPolicy::default()),
        "sleep",
        with_rate_limit(limiter, "sleep", 1, raw).unwrap(),
    );

    let waiter = {
        let cancel = cancel.clone();
        tokio::spawn(async move { chain.call(&cancel).await })
    };
    cancel.cancel();

    let error = waiter.await.unwrap().unwrap_err();
    assert!(error.is_cancelled());
}

#[test]
fn test_oversized_cost_is_rejected_at_construction() {
    let raw = operation_fn(|| async { Ok::<u32, ApiError>(1) });
    let result = with_rate_limit(limiter(3), "sleep", 4, raw);
    assert!(matches!(
        result,
        Err(RateLimitError::CostExceedsCapacity {
            cost: 4,
            capacity: 3
        })
    ));
}

#[tokio::test]
async fn test_fatal_failure_is_not_cached_or_retried() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let cache = memory_cache(metrics.clone());
    let calls = Arc::new(AtomicU32::new(0));
    let raw = {
        let calls = calls.clone();
        operation_fn(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<u32, _>(ApiError::Validation("unknown date".into())) }
        })
    };
    let chain = with_cache(
        cache.clone(),
        key(),
        None,
        with_retry(
            quick_retry(metrics.clone(), 3),
            "sleep",
            with_metrics(metrics.clone(), "sleep", raw),
        ),
    );

    let error = chain.call(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(error.classify(), ErrorClass::VALIDATION);
    assert_eq!(error.to_string(), "validation failed: unknown date");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(metrics.counter("api_error", Some("sleep:validation")), 1);
    assert_eq!(cache.get::<u32>(&key()).await, None);
}

/// Store that cannot be reached
struct DownStore;

#[async_trait::async_trait]
impl CacheStore for DownStore {
    async fn get_raw(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Connection("down".into()))
    }

    async fn set_raw(
        &self,
        _key: &str,
        _payload: Vec<u8>,
        _ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        Err(CacheError::Connection("down".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Connection("down".into()))
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Err(CacheError::Connection("down".into()))
    }

    async fn clear_all(&self) -> Result<(), CacheError> {
        Err(CacheError::Connection("down".into()))
    }
}

#[tokio::test]
async fn test_cache_outage_falls_through_to_api_by_default() {
    let cache = ResilientCache::with_store(DownStore);
    let raw = operation_fn(|| async { Ok::<u32, ApiError>(3) });
    let chain = with_cache(cache, key(), None, raw);

    let value: u32 = chain.call(&CancellationToken::new()).await.unwrap();
    assert_eq!(value, 3);
}

#[tokio::test]
async fn test_cache_outage_propagates_under_propagate_policy() {
    let settings = CacheSettings {
        failure_policy: BackendFailurePolicy::Propagate,
        ..CacheSettings::in_memory()
    };
    let cache = ResilientCache::new(DownStore, &settings, metrics::noop());
    let raw = operation_fn(|| async { Ok::<u32, ApiError>(3) });
    let chain = with_cache(cache, key(), None, raw);

    let error = chain.call(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(error, FetchError::Cache(CacheError::Connection(_))));
    assert_eq!(error.classify(), ErrorClass::NETWORK);
}
