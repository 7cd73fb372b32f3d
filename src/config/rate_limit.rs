// ABOUTME: Token bucket rate limiter settings for wellness API calls
// ABOUTME: Sustained rate, burst capacity, and polling cadence loaded from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::rate_limiting;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Rate limiting configuration applied to every resource key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Sustained requests per minute (refill rate)
    pub requests_per_minute: u32,
    /// Bucket capacity, the largest burst allowed after idling
    pub burst_limit: u32,
    /// Cooldown the upstream applies after throttling (informational only)
    pub cooldown_seconds: u64,
    /// Interval between acquire attempts while waiting for a credit
    pub poll_interval: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_minute: rate_limiting::DEFAULT_REQUESTS_PER_MINUTE,
            burst_limit: rate_limiting::DEFAULT_BURST_LIMIT,
            cooldown_seconds: rate_limiting::DEFAULT_COOLDOWN_SECS,
            poll_interval: Duration::from_millis(rate_limiting::DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl RateLimitSettings {
    /// Create settings with the given rate and burst, other fields defaulted
    #[must_use]
    pub fn new(requests_per_minute: u32, burst_limit: u32) -> Self {
        Self {
            requests_per_minute,
            burst_limit,
            ..Self::default()
        }
    }

    /// Load rate limiting configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            requests_per_minute: env::var("RUNCTL_RATE_LIMIT_RPM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(rate_limiting::DEFAULT_REQUESTS_PER_MINUTE),
            burst_limit: env::var("RUNCTL_RATE_LIMIT_BURST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(rate_limiting::DEFAULT_BURST_LIMIT),
            cooldown_seconds: env::var("RUNCTL_RATE_LIMIT_COOLDOWN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(rate_limiting::DEFAULT_COOLDOWN_SECS),
            poll_interval: Duration::from_millis(
                env::var("RUNCTL_RATE_LIMIT_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(rate_limiting::DEFAULT_POLL_INTERVAL_MS),
            ),
        }
    }

    /// Bucket capacity in credits
    #[must_use]
    pub fn capacity(&self) -> f64 {
        f64::from(self.burst_limit)
    }

    /// Refill rate in credits per second
    #[must_use]
    pub fn fill_rate(&self) -> f64 {
        f64::from(self.requests_per_minute) / 60.0
    }

    /// Reject settings under which no call could ever be admitted
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the rate, burst, or poll interval is zero
    pub fn validate(&self) -> AppResult<()> {
        if self.requests_per_minute == 0 {
            return Err(AppError::invalid_config(
                "requests_per_minute must be at least 1",
            ));
        }
        if self.burst_limit == 0 {
            return Err(AppError::invalid_config("burst_limit must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(AppError::invalid_config(
                "rate limit poll_interval must be greater than zero",
            ));
        }
        Ok(())
    }
}
