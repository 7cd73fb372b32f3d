// ABOUTME: Retry orchestrator with exponential backoff and failure classification
// ABOUTME: Re-invokes retryable failures, fails fast on fatal ones, and honors cancellation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Retry Orchestrator
//!
//! Runs an async operation under a [`RetryPolicy`]. Each failure is mapped
//! through [`Classify`] exactly once:
//!
//! - retryable failures are re-invoked after
//!   `min(max_delay, initial_delay * backoff_factor^(attempt - 1))`, stretched
//!   to any `retry_after` the upstream asked for, until `max_attempts` is spent
//! - non-retryable failures are returned immediately as [`RetryError::Fatal`]
//!
//! The orchestrator holds no per-call state, so one instance serves every
//! call site concurrently.

mod error;

pub use error::RetryError;

use crate::config::RetryPolicy;
use crate::constants::retry::RETRIES_EXHAUSTED_LABEL;
use crate::errors::{Classify, ErrorClass};
use crate::metrics::{self, SharedMetrics};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Executes operations with classified, bounded retries
#[derive(Clone)]
pub struct RetryOrchestrator {
    policy: RetryPolicy,
    metrics: SharedMetrics,
}

impl RetryOrchestrator {
    /// Create an orchestrator that reports to the no-op metrics sink
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_metrics(policy, metrics::noop())
    }

    /// Create an orchestrator that reports to `metrics`
    #[must_use]
    pub fn with_metrics(policy: RetryPolicy, metrics: SharedMetrics) -> Self {
        Self { policy, metrics }
    }

    /// Copy of this orchestrator running under a different policy
    #[must_use]
    pub fn with_policy(&self, policy: RetryPolicy) -> Self {
        Self {
            policy,
            metrics: self.metrics.clone(),
        }
    }

    /// Policy applied to every run
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails fatally, runs out of attempts,
    /// or `cancel` fires
    ///
    /// `endpoint` labels the metrics events and log lines of this run.
    ///
    /// # Errors
    ///
    /// - [`RetryError::Fatal`] for the first non-retryable failure
    /// - [`RetryError::Exhausted`] when the last allowed attempt fails
    /// - [`RetryError::Cancelled`] when `cancel` fires before or between
    ///   attempts, or while one is in flight
    pub async fn run<T, E, F, Fut>(
        &self,
        endpoint: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt: u32 = 0;
        let mut previous_delay = Duration::ZERO;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: attempt });
            }
            if attempt > 0 {
                self.metrics.retry_attempt(endpoint);
            }
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(endpoint, attempt, "operation cancelled while in flight");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                outcome = operation() => outcome,
            };

            let failure = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        self.metrics.retry_success(endpoint);
                        info!(endpoint, attempts = attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let kind = match failure.classify() {
                ErrorClass::NonRetryable(kind) => {
                    debug!(endpoint, attempt, class = %kind, error = %failure, "non-retryable failure");
                    return Err(RetryError::Fatal {
                        attempts: attempt,
                        kind,
                        source: failure,
                    });
                }
                ErrorClass::Retryable(kind) => kind,
            };

            if attempt >= max_attempts {
                self.metrics.api_error(endpoint, RETRIES_EXHAUSTED_LABEL);
                error!(
                    endpoint,
                    attempts = attempt,
                    class = %kind,
                    error = %failure,
                    "operation failed after all retry attempts"
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    kind,
                    last: failure,
                });
            }

            let delay = self.delay_after(attempt, failure.retry_after(), previous_delay);
            previous_delay = delay;
            warn!(
                endpoint,
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                class = %kind,
                error = %failure,
                "retrying after backoff"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(endpoint, attempt, "retry backoff cancelled");
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                () = sleep(delay) => {}
            }
        }
    }

    /// Backoff before the next attempt
    ///
    /// At least the previous delay and any `retry_after` hint, never above
    /// `max_delay`, so delays within one run never shrink.
    fn delay_after(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        previous: Duration,
    ) -> Duration {
        let backoff = self.policy.delay_for_attempt(attempt);
        retry_after
            .map_or(backoff, |hint| backoff.max(hint))
            .max(previous)
            .min(self.policy.max_delay)
    }
}
