// ABOUTME: Retry policy with exponential backoff bounds for wellness API calls
// ABOUTME: Attempt budget, delay curve, and environment loading for the retry orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::retry;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Retry behavior for one call site
///
/// Immutable once built; per-invocation overrides go through the `with_*`
/// methods, which return a modified copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first call
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor applied after each failed attempt
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_secs_f64(retry::DEFAULT_INITIAL_DELAY_SECS),
            max_delay: Duration::from_secs_f64(retry::DEFAULT_MAX_DELAY_SECS),
            backoff_factor: retry::DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Load retry configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env::var("RUNCTL_RETRY_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts),
            initial_delay: env::var("RUNCTL_RETRY_INITIAL_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or(defaults.initial_delay),
            max_delay: env::var("RUNCTL_RETRY_MAX_DELAY_SECS")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or(defaults.max_delay),
            backoff_factor: env::var("RUNCTL_RETRY_BACKOFF_FACTOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.backoff_factor),
        }
    }

    /// Copy of this policy with a different attempt budget
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Copy of this policy with different delay bounds
    #[must_use]
    pub fn with_delays(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = max_delay;
        self
    }

    /// Copy of this policy with a different growth factor
    #[must_use]
    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    /// Delay to wait after the given (1-based) attempt failed
    ///
    /// `min(max_delay, initial_delay * backoff_factor^(attempt - 1))`
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs).map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Reject policies the orchestrator cannot run
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `max_attempts` is zero or the backoff
    /// factor is not a finite number greater than one
    pub fn validate(&self) -> AppResult<()> {
        if self.max_attempts == 0 {
            return Err(AppError::invalid_config("max_attempts must be at least 1"));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 1.0 {
            return Err(AppError::invalid_config(format!(
                "backoff_factor must be greater than 1.0, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }
}
