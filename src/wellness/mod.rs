// ABOUTME: Wellness data service applying the resilience chain to sleep, stress, and body battery
// ABOUTME: Cache-aside reads with retried, rate limited, and metered API calls per data kind
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Wellness Service
//!
//! Builds the middleware chain for each fetch. The data kind name
//! (`sleep`, `stress`, `body_battery`) is both the rate limit key and the
//! metrics endpoint label; the cache TTL comes from [`CacheTtlConfig`].

/// External wellness API client interface
pub mod client;

pub use client::WellnessClient;

use crate::cache::{CacheBackend, CacheKey, CacheStore, DataKind, ResilientCache};
use crate::config::{CacheTtlConfig, ResilienceConfig};
use crate::constants::rate_limiting::DEFAULT_REQUEST_COST;
use crate::errors::AppResult;
use crate::metrics::SharedMetrics;
use crate::middleware::{
    operation_fn, with_cache, with_metrics, with_rate_limit, with_retry, FetchError, Operation,
};
use crate::rate_limiting::RateLimiter;
use crate::retry::RetryOrchestrator;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Resilient access to wellness data
pub struct WellnessService<C, S = CacheBackend> {
    client: Arc<C>,
    limiter: RateLimiter,
    orchestrator: RetryOrchestrator,
    cache: ResilientCache<S>,
    ttl: CacheTtlConfig,
    metrics: SharedMetrics,
}

impl<C: WellnessClient + 'static> WellnessService<C, CacheBackend> {
    /// Build every component from `config`, sharing one metrics sink
    ///
    /// Must be called within a Tokio runtime when the in-memory cache runs
    /// background cleanup.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation or the
    /// cache backend cannot be created
    pub fn from_config(client: C, config: &ResilienceConfig, metrics: SharedMetrics) -> AppResult<Self> {
        config.validate()?;
        let cache = ResilientCache::from_settings(&config.cache, metrics.clone())?;
        Ok(Self::new(
            client,
            RateLimiter::with_metrics(config.rate_limit.clone(), metrics.clone()),
            RetryOrchestrator::with_metrics(config.retry.clone(), metrics.clone()),
            cache,
            config.cache.ttl.clone(),
            metrics,
        ))
    }
}

impl<C, S> WellnessService<C, S>
where
    C: WellnessClient + 'static,
    S: CacheStore + 'static,
{
    /// Assemble a service from prebuilt components
    #[must_use]
    pub fn new(
        client: C,
        limiter: RateLimiter,
        orchestrator: RetryOrchestrator,
        cache: ResilientCache<S>,
        ttl: CacheTtlConfig,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            client: Arc::new(client),
            limiter,
            orchestrator,
            cache,
            ttl,
            metrics,
        }
    }

    /// Cache in front of the API
    #[must_use]
    pub const fn cache(&self) -> &ResilientCache<S> {
        &self.cache
    }

    /// Rate limiter shared by every data kind
    #[must_use]
    pub const fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Fetch `kind` for `subject_id` on `date` through the full resilience chain
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the API call ultimately fails, the caller
    /// cancels, or (under the propagate policy) the cache backend fails
    pub async fn fetch(
        &self,
        kind: DataKind,
        subject_id: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Value, FetchError> {
        let endpoint = kind.name();
        let client = Arc::clone(&self.client);
        let subject = subject_id.to_owned();
        let call = operation_fn(move || {
            let client = Arc::clone(&client);
            let subject = subject.clone();
            async move { client.fetch(kind, &subject, date).await }
        });

        let chain = with_cache(
            self.cache.clone(),
            CacheKey::new(kind, subject_id, date),
            Some(self.ttl.ttl_for(kind)),
            with_retry(
                self.orchestrator.clone(),
                endpoint,
                with_rate_limit(
                    self.limiter.clone(),
                    endpoint,
                    DEFAULT_REQUEST_COST,
                    with_metrics(self.metrics.clone(), endpoint, call),
                )?,
            ),
        );

        debug!(kind = endpoint, subject_id, %date, "fetching wellness data");
        chain.call(cancel).await
    }

    /// Sleep data for one night
    ///
    /// # Errors
    ///
    /// See [`Self::fetch`]
    pub async fn sleep(
        &self,
        subject_id: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Value, FetchError> {
        self.fetch(DataKind::Sleep, subject_id, date, cancel).await
    }

    /// Stress data for one day
    ///
    /// # Errors
    ///
    /// See [`Self::fetch`]
    pub async fn stress(
        &self,
        subject_id: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Value, FetchError> {
        self.fetch(DataKind::Stress, subject_id, date, cancel).await
    }

    /// Body battery data for one day
    ///
    /// # Errors
    ///
    /// See [`Self::fetch`]
    pub async fn body_battery(
        &self,
        subject_id: &str,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Value, FetchError> {
        self.fetch(DataKind::BodyBattery, subject_id, date, cancel).await
    }

    /// Fetch every day from `start` to `end` inclusive, one at a time
    ///
    /// Days that fail are logged and skipped. An empty result means every day
    /// failed or `start` is after `end`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Cancelled`] if the caller cancels mid-range
    pub async fn fetch_range(
        &self,
        kind: DataKind,
        subject_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<(NaiveDate, Value)>, FetchError> {
        let mut days = Vec::new();
        for date in start.iter_days().take_while(|date| *date <= end) {
            match self.fetch(kind, subject_id, date, cancel).await {
                Ok(value) => days.push((date, value)),
                Err(e) if e.is_cancelled() => return Err(FetchError::Cancelled),
                Err(e) => {
                    warn!(kind = kind.name(), subject_id, %date, error = %e, "skipping day after failed fetch");
                }
            }
        }
        Ok(days)
    }

    /// Drop the cached value for `kind`, `subject_id`, `date`
    pub async fn invalidate(&self, kind: DataKind, subject_id: &str, date: NaiveDate) -> bool {
        self.cache
            .delete(&CacheKey::new(kind, subject_id, date))
            .await
    }
}
