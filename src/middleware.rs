// ABOUTME: Composable resilience layers wrapped around a raw wellness API call
// ABOUTME: Metrics, rate limiting, retry, and cache-aside as explicit Operation decorators
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Middleware
//!
//! Each layer takes the next [`Operation`] and returns a wrapped one. The
//! canonical chain for one data fetch is
//!
//! ```text
//! with_cache(with_retry(with_rate_limit(with_metrics(operation_fn(call)))))
//! ```
//!
//! so every retry attempt re-acquires a rate limit credit and is measured on
//! its own, while the cache sees only the final outcome.
//!
//! Concurrent misses on the same key each run the inner chain and each write
//! the cache; the last write wins.

use crate::cache::{CacheError, CacheKey, CacheStore, ResilientCache};
use crate::errors::{ApiError, Classify, ErrorClass};
use crate::metrics::SharedMetrics;
use crate::rate_limiting::{RateLimitError, RateLimiter};
use crate::retry::{RetryError, RetryOrchestrator};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Failure surfaced by a middleware chain
#[derive(Debug, Error)]
pub enum FetchError {
    /// The wellness API call failed
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The retry layer gave up
    #[error(transparent)]
    Retry(Box<RetryError<FetchError>>),
    /// The rate limit layer refused or was cancelled
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    /// The cache backend failed under the propagate policy
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The caller cancelled the fetch
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether this failure is the result of cancellation at any layer
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled | Self::RateLimit(RateLimitError::Cancelled) => true,
            Self::Retry(error) => error.is_cancelled(),
            Self::Api(_) | Self::RateLimit(_) | Self::Cache(_) => false,
        }
    }

    /// Underlying API failure, looking through the retry layer
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            Self::Retry(error) => error.last_error().and_then(Self::api_error),
            Self::RateLimit(_) | Self::Cache(_) | Self::Cancelled => None,
        }
    }
}

impl From<RetryError<Self>> for FetchError {
    fn from(error: RetryError<Self>) -> Self {
        Self::Retry(Box::new(error))
    }
}

impl Classify for FetchError {
    fn classify(&self) -> ErrorClass {
        match self {
            Self::Api(error) => error.classify(),
            Self::Retry(error) => error.class().unwrap_or(ErrorClass::UNEXPECTED),
            Self::RateLimit(RateLimitError::CostExceedsCapacity { .. }) => ErrorClass::VALIDATION,
            Self::Cache(error) if error.is_transport() => ErrorClass::NETWORK,
            Self::Cache(_) => ErrorClass::VALIDATION,
            Self::RateLimit(RateLimitError::Cancelled) | Self::Cancelled => {
                ErrorClass::UNEXPECTED
            }
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api(error) => error.retry_after(),
            _ => None,
        }
    }
}

/// One step of a fetch chain
#[async_trait::async_trait]
pub trait Operation<T: Send + 'static>: Send + Sync {
    /// Run the operation, honoring `cancel`
    ///
    /// # Errors
    ///
    /// Returns the failure of this layer or of any layer it wraps
    async fn call(&self, cancel: &CancellationToken) -> Result<T, FetchError>;
}

#[async_trait::async_trait]
impl<T, O> Operation<T> for Arc<O>
where
    T: Send + 'static,
    O: Operation<T> + ?Sized,
{
    async fn call(&self, cancel: &CancellationToken) -> Result<T, FetchError> {
        (**self).call(cancel).await
    }
}

#[async_trait::async_trait]
impl<T, O> Operation<T> for Box<O>
where
    T: Send + 'static,
    O: Operation<T> + ?Sized,
{
    async fn call(&self, cancel: &CancellationToken) -> Result<T, FetchError> {
        (**self).call(cancel).await
    }
}

/// Closure adapted into an [`Operation`]
pub struct FnOperation<F> {
    f: F,
}

/// Adapt a closure producing `Result<T, ApiError>` into the innermost operation
pub const fn operation_fn<F>(f: F) -> FnOperation<F> {
    FnOperation { f }
}

#[async_trait::async_trait]
impl<T, F, Fut> Operation<T> for FnOperation<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, ApiError>> + Send,
{
    async fn call(&self, _cancel: &CancellationToken) -> Result<T, FetchError> {
        (self.f)().await.map_err(FetchError::Api)
    }
}

/// Layer reporting request count, latency, and failures per attempt
pub struct Metered<O> {
    metrics: SharedMetrics,
    endpoint: String,
    inner: O,
}

/// Report `api_request`, then `api_latency` on success or `api_error` with the
/// failure class on error
pub fn with_metrics<O>(metrics: SharedMetrics, endpoint: impl Into<String>, inner: O) -> Metered<O> {
    Metered {
        metrics,
        endpoint: endpoint.into(),
        inner,
    }
}

#[async_trait::async_trait]
impl<T, O> Operation<T> for Metered<O>
where
    T: Send + 'static,
    O: Operation<T>,
{
    async fn call(&self, cancel: &CancellationToken) -> Result<T, FetchError> {
        self.metrics.api_request(&self.endpoint);
        let started = Instant::now();

        let result = self.inner.call(cancel).await;
        match &result {
            Ok(_) => self
                .metrics
                .api_latency(&self.endpoint, started.elapsed().as_secs_f64()),
            Err(error) => self
                .metrics
                .api_error(&self.endpoint, error.classify().label()),
        }
        result
    }
}

/// Layer waiting for a rate limit credit before each call
pub struct RateLimited<O> {
    limiter: RateLimiter,
    key: String,
    cost: u32,
    inner: O,
}

/// Wait for `cost` credits on `key` before every call of `inner`
///
/// # Errors
///
/// Returns `CostExceedsCapacity` if `cost` could never be granted
pub fn with_rate_limit<O>(
    limiter: RateLimiter,
    key: impl Into<String>,
    cost: u32,
    inner: O,
) -> Result<RateLimited<O>, RateLimitError> {
    limiter.check_cost(cost)?;
    Ok(RateLimited {
        limiter,
        key: key.into(),
        cost,
        inner,
    })
}

#[async_trait::async_trait]
impl<T, O> Operation<T> for RateLimited<O>
where
    T: Send + 'static,
    O: Operation<T>,
{
    async fn call(&self, cancel: &CancellationToken) -> Result<T, FetchError> {
        self.limiter
            .wait_for_token(&self.key, self.cost, cancel)
            .await?;
        self.inner.call(cancel).await
    }
}

/// Layer re-invoking the inner chain through a retry orchestrator
pub struct Retrying<O> {
    orchestrator: RetryOrchestrator,
    endpoint: String,
    inner: O,
}

/// Run `inner` under `orchestrator`, surfacing give-ups as [`FetchError::Retry`]
pub fn with_retry<O>(
    orchestrator: RetryOrchestrator,
    endpoint: impl Into<String>,
    inner: O,
) -> Retrying<O> {
    Retrying {
        orchestrator,
        endpoint: endpoint.into(),
        inner,
    }
}

#[async_trait::async_trait]
impl<T, O> Operation<T> for Retrying<O>
where
    T: Send + 'static,
    O: Operation<T>,
{
    async fn call(&self, cancel: &CancellationToken) -> Result<T, FetchError> {
        self.orchestrator
            .run(&self.endpoint, cancel, || self.inner.call(cancel))
            .await
            .map_err(FetchError::from)
    }
}

/// Cache-aside layer
pub struct Cached<S, O> {
    cache: ResilientCache<S>,
    key: CacheKey,
    ttl: Option<Duration>,
    inner: O,
}

/// Serve `key` from `cache` when present; otherwise run `inner` and store its
/// result with `ttl`
///
/// Nothing is written once `cancel` has fired.
pub const fn with_cache<S, O>(
    cache: ResilientCache<S>,
    key: CacheKey,
    ttl: Option<Duration>,
    inner: O,
) -> Cached<S, O> {
    Cached {
        cache,
        key,
        ttl,
        inner,
    }
}

#[async_trait::async_trait]
impl<T, S, O> Operation<T> for Cached<S, O>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: CacheStore + 'static,
    O: Operation<T>,
{
    async fn call(&self, cancel: &CancellationToken) -> Result<T, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        if let Some(value) = self.cache.get_with_policy::<T>(&self.key).await? {
            debug!(key = %self.key, "cache hit");
            return Ok(value);
        }

        let value = self.inner.call(cancel).await?;

        if cancel.is_cancelled() {
            debug!(key = %self.key, "fetch cancelled, skipping cache write");
        } else {
            self.cache.set(&self.key, &value, self.ttl).await;
        }
        Ok(value)
    }
}
