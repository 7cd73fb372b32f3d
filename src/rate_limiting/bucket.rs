// ABOUTME: Token bucket primitive tracking call credits for a single resource key
// ABOUTME: Lazily refills from elapsed monotonic time before every availability check
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use tokio::time::Instant;

/// Call credits for one resource key
///
/// `tokens` always stays within `0.0..=capacity`. Refill is computed on
/// access from the time elapsed since `last_update`; no background task is
/// involved.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    fill_rate: f64,
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    #[must_use]
    pub fn new(capacity: f64, fill_rate: f64) -> Self {
        Self::new_at(capacity, fill_rate, Instant::now())
    }

    /// Create a full bucket whose refill clock starts at `now`
    #[must_use]
    pub const fn new_at(capacity: f64, fill_rate: f64, now: Instant) -> Self {
        Self {
            capacity,
            fill_rate,
            tokens: capacity,
            last_update: now,
        }
    }

    /// Maximum credits this bucket can hold
    #[must_use]
    pub const fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Credits added per second
    #[must_use]
    pub const fn fill_rate(&self) -> f64 {
        self.fill_rate
    }

    /// Credits as of the last refill
    #[must_use]
    pub const fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Add the credits accrued since the last update, capped at capacity
    pub fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = elapsed.mul_add(self.fill_rate, self.tokens).min(self.capacity);
        self.last_update = now;
    }

    /// Refill, then withdraw `cost` credits if enough are available
    pub fn try_acquire_at(&mut self, cost: f64, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }

    /// Refill against the current time, then try to withdraw `cost` credits
    pub fn try_acquire(&mut self, cost: f64) -> bool {
        self.try_acquire_at(cost, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_bucket_is_full() {
        let bucket = TokenBucket::new(10.0, 1.0);
        assert!((bucket.tokens() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_refill_never_exceeds_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(5.0, 2.0, start);
        assert!(bucket.try_acquire_at(5.0, start));
        assert!(!bucket.try_acquire_at(1.0, start));

        bucket.refill(start + Duration::from_secs(1));
        assert!((bucket.tokens() - 2.0).abs() < 1e-9);

        bucket.refill(start + Duration::from_secs(3600));
        assert!((bucket.tokens() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failed_acquire_keeps_tokens() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new_at(3.0, 1.0, start);
        assert!(!bucket.try_acquire_at(4.0, start));
        assert!((bucket.tokens() - 3.0).abs() < f64::EPSILON);
    }
}
