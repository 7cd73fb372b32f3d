// ABOUTME: Integration tests for the keyed token bucket rate limiter
// ABOUTME: Covers burst exhaustion, refill timing, cancellation, oversized costs, and concurrency
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use futures_util::future::join_all;
use proptest::prelude::*;
use runctl::config::RateLimitSettings;
use runctl::metrics::InMemoryMetrics;
use runctl::rate_limiting::{RateLimitError, RateLimiter, TokenBucket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{advance, Instant};
use tokio_util::sync::CancellationToken;

fn limiter(requests_per_minute: u32, burst_limit: u32) -> RateLimiter {
    RateLimiter::new(RateLimitSettings {
        poll_interval: Duration::from_millis(100),
        ..RateLimitSettings::new(requests_per_minute, burst_limit)
    })
}

#[tokio::test(start_paused = true)]
async fn test_burst_then_refill_after_one_second() {
    let limiter = limiter(60, 10);

    for i in 0..10 {
        assert!(limiter.acquire("ep", 1), "call {i} should fit in the burst");
    }
    assert!(!limiter.acquire("ep", 1), "11th immediate call must be refused");

    advance(Duration::from_secs(1)).await;
    assert!(limiter.acquire("ep", 1), "one credit refills per second at 60 rpm");
    assert!(!limiter.acquire("ep", 1));
}

#[tokio::test(start_paused = true)]
async fn test_keys_have_independent_buckets() {
    let limiter = limiter(60, 2);

    assert!(limiter.acquire("sleep", 2));
    assert!(!limiter.acquire("sleep", 1));
    assert!(limiter.acquire("stress", 2));
    assert_eq!(limiter.tracked_keys(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_key_reports_full_bucket_without_tracking() {
    let limiter = limiter(60, 5);

    assert!((limiter.remaining("never-used") - 5.0).abs() < f64::EPSILON);
    assert_eq!(limiter.tracked_keys(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_token_suspends_until_refill() {
    let limiter = limiter(60, 1);
    let cancel = CancellationToken::new();

    limiter.wait_for_token("ep", 1, &cancel).await.unwrap();

    let started = Instant::now();
    limiter.wait_for_token("ep", 1, &cancel).await.unwrap();
    let waited = started.elapsed();

    assert!(waited >= Duration::from_secs(1), "waited only {waited:?}");
    assert!(waited < Duration::from_secs(2), "waited too long: {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn test_wait_reports_rate_limit_hit_once_per_wait() {
    let metrics = Arc::new(InMemoryMetrics::new());
    let limiter = RateLimiter::with_metrics(
        RateLimitSettings {
            poll_interval: Duration::from_millis(100),
            ..RateLimitSettings::new(60, 1)
        },
        metrics.clone(),
    );
    let cancel = CancellationToken::new();

    limiter.wait_for_token("sleep", 1, &cancel).await.unwrap();
    limiter.wait_for_token("sleep", 1, &cancel).await.unwrap();

    assert_eq!(metrics.counter("rate_limit_hit", Some("sleep")), 1);
    let remaining = metrics.gauge("rate_limit_remaining", Some("sleep")).unwrap();
    assert!(remaining < 1.0, "remaining {remaining} after draining the bucket");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_wait_consumes_nothing() {
    let limiter = limiter(1, 1);
    let cancel = CancellationToken::new();

    assert!(limiter.acquire("ep", 1));

    let waiter = {
        let limiter = limiter.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { limiter.wait_for_token("ep", 1, &cancel).await })
    };

    advance(Duration::from_millis(250)).await;
    cancel.cancel();

    let result = waiter.await.unwrap();
    assert_eq!(result, Err(RateLimitError::Cancelled));
    assert!(limiter.remaining("ep") < 1.0);
}

#[tokio::test]
async fn test_already_cancelled_wait_returns_immediately() {
    let limiter = limiter(60, 10);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = limiter.wait_for_token("ep", 1, &cancel).await;
    assert_eq!(result, Err(RateLimitError::Cancelled));
    assert_eq!(limiter.tracked_keys(), 0);
}

#[tokio::test]
async fn test_cost_above_capacity_is_rejected() {
    let limiter = limiter(60, 3);
    let cancel = CancellationToken::new();

    let result = limiter.wait_for_token("ep", 4, &cancel).await;
    assert_eq!(
        result,
        Err(RateLimitError::CostExceedsCapacity {
            cost: 4,
            capacity: 3
        })
    );
    assert!(!limiter.acquire("ep", 4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquires_never_overdraw() {
    let limiter = limiter(1, 25);
    let granted = Arc::new(AtomicUsize::new(0));

    let tasks = (0..100).map(|_| {
        let limiter = limiter.clone();
        let granted = granted.clone();
        tokio::spawn(async move {
            if limiter.acquire("shared", 1) {
                granted.fetch_add(1, Ordering::SeqCst);
            }
        })
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    assert_eq!(granted.load(Ordering::SeqCst), 25);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_waiters_are_all_served() {
    let limiter = limiter(600, 2);
    let cancel = CancellationToken::new();

    let waits = (0..6).map(|_| limiter.wait_for_token("ep", 1, &cancel));
    let results = join_all(waits).await;

    assert!(results.iter().all(Result::is_ok));
}

proptest! {
    #[test]
    fn prop_withdrawals_never_exceed_capacity_plus_refill(
        capacity in 1u32..50,
        rpm in 1u32..600,
        steps in prop::collection::vec((0u64..2_000, 1u32..5), 1..60),
    ) {
        let capacity = f64::from(capacity);
        let fill_rate = f64::from(rpm) / 60.0;
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(capacity, fill_rate, start);

        let mut now = start;
        let mut withdrawn = 0.0;
        for (gap_ms, cost) in steps {
            now += Duration::from_millis(gap_ms);
            let cost = f64::from(cost);
            if bucket.try_acquire_at(cost, now) {
                withdrawn += cost;
            }
            prop_assert!(bucket.tokens() >= 0.0);
            prop_assert!(bucket.tokens() <= capacity);
        }

        let elapsed = now.duration_since(start).as_secs_f64();
        prop_assert!(withdrawn <= elapsed.mul_add(fill_rate, capacity) + 1e-6);
    }
}
