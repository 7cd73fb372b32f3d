// ABOUTME: Configuration module for the runctl resilience layer
// ABOUTME: Aggregates rate limiting, retry, and cache settings loaded from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration for the resilience layer.
//!
//! Every settings type has a `Default` backed by `runctl_core::constants`, a
//! `from_env()` constructor that falls back to those defaults for missing or
//! unparseable variables, and a `validate()` check run before use.

/// Cache backing store, compression, and TTL settings
pub mod cache;
/// Token bucket rate limiter settings
pub mod rate_limit;
/// Retry policy and backoff curve
pub mod retry;

pub use cache::{BackendFailurePolicy, CacheSettings, CacheTtlConfig, RedisConnectionConfig};
pub use rate_limit::RateLimitSettings;
pub use retry::RetryPolicy;

use crate::errors::AppResult;
use serde::{Deserialize, Serialize};

/// Complete configuration of the resilience layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Rate limiter settings
    pub rate_limit: RateLimitSettings,
    /// Default retry policy
    pub retry: RetryPolicy,
    /// Cache settings
    pub cache: CacheSettings,
}

impl ResilienceConfig {
    /// Load the whole configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            rate_limit: RateLimitSettings::from_env(),
            retry: RetryPolicy::from_env(),
            cache: CacheSettings::from_env(),
        }
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found
    pub fn validate(&self) -> AppResult<()> {
        self.rate_limit.validate()?;
        self.retry.validate()?;
        self.cache.validate()
    }
}
