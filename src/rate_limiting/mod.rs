// ABOUTME: Keyed token bucket rate limiter for outbound wellness API calls
// ABOUTME: Non-blocking acquire plus a cancellable wait that polls until a credit frees up
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Rate Limiting
//!
//! One [`TokenBucket`] per resource key, created full on first use and kept
//! for the lifetime of the limiter. Buckets live in a `DashMap`; the entry
//! guard makes refill and withdraw a single atomic step per key while
//! different keys never contend on the same lock.

/// Token bucket primitive
pub mod bucket;

pub use bucket::TokenBucket;

use crate::config::RateLimitSettings;
use crate::metrics::{self, SharedMetrics};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Failures of a rate limit wait
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateLimitError {
    /// The caller cancelled while waiting for a credit
    #[error("rate limit wait cancelled")]
    Cancelled,
    /// The requested cost can never be satisfied by a bucket this small
    #[error("request cost {cost} exceeds bucket capacity {capacity}")]
    CostExceedsCapacity {
        /// Credits requested per call
        cost: u32,
        /// Bucket capacity
        capacity: u32,
    },
}

/// Keyed token bucket rate limiter
///
/// Cloning is cheap and every clone shares the same buckets.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<String, TokenBucket>>,
    settings: RateLimitSettings,
    metrics: SharedMetrics,
}

impl RateLimiter {
    /// Create a limiter that reports to the no-op metrics sink
    #[must_use]
    pub fn new(settings: RateLimitSettings) -> Self {
        Self::with_metrics(settings, metrics::noop())
    }

    /// Create a limiter that reports to `metrics`
    #[must_use]
    pub fn with_metrics(settings: RateLimitSettings, metrics: SharedMetrics) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            settings,
            metrics,
        }
    }

    /// Settings this limiter was built with
    #[must_use]
    pub const fn settings(&self) -> &RateLimitSettings {
        &self.settings
    }

    /// Capacity of every bucket, in credits
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.settings.burst_limit
    }

    /// Check that `cost` could ever be granted
    ///
    /// # Errors
    ///
    /// Returns `CostExceedsCapacity` if `cost` is larger than the bucket
    pub const fn check_cost(&self, cost: u32) -> Result<(), RateLimitError> {
        if cost > self.settings.burst_limit {
            return Err(RateLimitError::CostExceedsCapacity {
                cost,
                capacity: self.settings.burst_limit,
            });
        }
        Ok(())
    }

    /// Try to withdraw `cost` credits from the bucket for `key` without waiting
    ///
    /// Creates a full bucket the first time a key is seen.
    pub fn acquire(&self, key: &str, cost: u32) -> bool {
        let now = Instant::now();
        let mut entry = self
            .buckets
            .entry(key.to_owned())
            .or_insert_with(|| self.new_bucket(now));
        let granted = entry.try_acquire_at(f64::from(cost), now);
        let remaining = entry.tokens();
        drop(entry);

        if granted {
            self.metrics.rate_limit_remaining(key, remaining);
        }
        granted
    }

    /// Wait until `cost` credits are granted for `key`
    ///
    /// Polls `acquire` every `poll_interval`; suspension uses `tokio::time`
    /// so the runtime stays free while waiting.
    ///
    /// # Errors
    ///
    /// Returns `CostExceedsCapacity` immediately if `cost` can never be
    /// granted, or `Cancelled` as soon as `cancel` fires
    pub async fn wait_for_token(
        &self,
        key: &str,
        cost: u32,
        cancel: &CancellationToken,
    ) -> Result<(), RateLimitError> {
        self.check_cost(cost)?;

        let mut polls: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RateLimitError::Cancelled);
            }
            if self.acquire(key, cost) {
                if polls > 0 {
                    debug!(key, cost, polls, "rate limit credit granted after waiting");
                }
                return Ok(());
            }
            if polls == 0 {
                self.metrics.rate_limit_hit(key);
                debug!(
                    key,
                    cost,
                    remaining = self.remaining(key),
                    "rate limit reached, waiting for credit"
                );
            }
            polls = polls.saturating_add(1);

            tokio::select! {
                () = cancel.cancelled() => return Err(RateLimitError::Cancelled),
                () = sleep(self.settings.poll_interval) => {}
            }
        }
    }

    /// Credits currently available for `key`, after refill
    ///
    /// A key that was never used reports a full bucket without creating one.
    #[must_use]
    pub fn remaining(&self, key: &str) -> f64 {
        self.buckets.get_mut(key).map_or_else(
            || self.settings.capacity(),
            |mut bucket| {
                bucket.refill(Instant::now());
                bucket.tokens()
            },
        )
    }

    /// Number of keys that have a bucket
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    fn new_bucket(&self, now: Instant) -> TokenBucket {
        TokenBucket::new_at(self.settings.capacity(), self.settings.fill_rate(), now)
    }
}
