// ABOUTME: Cache configuration types for the resilient wellness cache
// ABOUTME: Handles backing store selection, compression, Redis connections, and TTLs per data kind
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::cache::DataKind;
use crate::constants::{cache, redis};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// What the cache does when its backing store cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendFailurePolicy {
    /// Log, record a metric, and behave as if the key were absent
    #[default]
    TreatAsMiss,
    /// Surface the failure to the caller
    Propagate,
}

/// Cache configuration for Redis and in-memory caching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Backing store URL; `redis://` selects Redis, absent or `memory://` the in-memory store
    #[serde(default)]
    pub backing_store_url: Option<String>,
    /// Compress payloads larger than `compression_threshold`
    pub compress: bool,
    /// Serialized size in bytes above which payloads are compressed
    pub compression_threshold: usize,
    /// Maximum number of entries in the in-memory store
    pub max_entries: usize,
    /// Interval between background sweeps of expired in-memory entries
    pub cleanup_interval: Duration,
    /// Run the background sweep task for the in-memory store
    pub enable_background_cleanup: bool,
    /// Behavior when the backing store is unreachable
    #[serde(default)]
    pub failure_policy: BackendFailurePolicy,
    /// Redis connection configuration
    #[serde(default)]
    pub redis_connection: RedisConnectionConfig,
    /// Cache TTL configuration
    #[serde(default)]
    pub ttl: CacheTtlConfig,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backing_store_url: None,
            compress: true,
            compression_threshold: cache::DEFAULT_COMPRESSION_THRESHOLD_BYTES,
            max_entries: cache::DEFAULT_CACHE_MAX_ENTRIES,
            cleanup_interval: Duration::from_secs(cache::DEFAULT_CLEANUP_INTERVAL_SECS),
            enable_background_cleanup: true,
            failure_policy: BackendFailurePolicy::TreatAsMiss,
            redis_connection: RedisConnectionConfig::default(),
            ttl: CacheTtlConfig::default(),
        }
    }
}

impl CacheSettings {
    /// In-memory settings with background cleanup disabled, used by tests and tools
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            enable_background_cleanup: false,
            ..Self::default()
        }
    }

    /// Load cache configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        let propagate = env::var("RUNCTL_CACHE_PROPAGATE_FAILURES")
            .ok()
            .and_then(|s| parse_bool(&s))
            .unwrap_or(false);

        Self {
            backing_store_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            compress: env::var("RUNCTL_CACHE_COMPRESS")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(true),
            compression_threshold: env::var("RUNCTL_CACHE_COMPRESSION_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(cache::DEFAULT_COMPRESSION_THRESHOLD_BYTES),
            max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(cache::DEFAULT_CACHE_MAX_ENTRIES),
            cleanup_interval: Duration::from_secs(
                env::var("CACHE_CLEANUP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(cache::DEFAULT_CLEANUP_INTERVAL_SECS),
            ),
            enable_background_cleanup: true,
            failure_policy: if propagate {
                BackendFailurePolicy::Propagate
            } else {
                BackendFailurePolicy::TreatAsMiss
            },
            redis_connection: RedisConnectionConfig::from_env(),
            ttl: CacheTtlConfig::from_env(),
        }
    }

    /// Reject settings the cache backends cannot work with
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the store would hold no entries, the
    /// cleanup interval is zero, or the backing store URL has an unknown scheme
    pub fn validate(&self) -> AppResult<()> {
        if self.max_entries == 0 {
            return Err(AppError::invalid_config("max_entries must be at least 1"));
        }
        if self.enable_background_cleanup && self.cleanup_interval.is_zero() {
            return Err(AppError::invalid_config(
                "cleanup_interval must be greater than zero",
            ));
        }
        if let Some(url) = &self.backing_store_url {
            let known = ["redis://", "rediss://", cache::MEMORY_STORE_SCHEME]
                .iter()
                .any(|scheme| url.starts_with(scheme));
            if !known {
                return Err(AppError::invalid_config(format!(
                    "unsupported cache backing store URL: {url}"
                )));
            }
        }
        Ok(())
    }
}

/// Parse the boolean spellings accepted in environment variables
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Cache TTL configuration for the wellness data kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTtlConfig {
    /// Sleep data cache TTL in seconds (default: 1 hour)
    pub sleep_secs: u64,
    /// Stress data cache TTL in seconds (default: 30 minutes)
    pub stress_secs: u64,
    /// Body battery cache TTL in seconds (default: 30 minutes)
    pub body_battery_secs: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            sleep_secs: cache::TTL_SLEEP_SECS,
            stress_secs: cache::TTL_STRESS_SECS,
            body_battery_secs: cache::TTL_BODY_BATTERY_SECS,
        }
    }
}

impl CacheTtlConfig {
    /// Load cache TTL configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            sleep_secs: env::var("RUNCTL_CACHE_TTL_SLEEP_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(cache::TTL_SLEEP_SECS),
            stress_secs: env::var("RUNCTL_CACHE_TTL_STRESS_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(cache::TTL_STRESS_SECS),
            body_battery_secs: env::var("RUNCTL_CACHE_TTL_BODY_BATTERY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(cache::TTL_BODY_BATTERY_SECS),
        }
    }

    /// TTL applied to cached values of the given kind
    #[must_use]
    pub const fn ttl_for(&self, kind: DataKind) -> Duration {
        let secs = match kind {
            DataKind::Sleep => self.sleep_secs,
            DataKind::Stress => self.stress_secs,
            DataKind::BodyBattery => self.body_battery_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Redis connection and retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConnectionConfig {
    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,
    /// Response/command timeout in seconds
    pub response_timeout_secs: u64,
    /// Number of reconnection retries after connection drop
    pub reconnection_retries: usize,
    /// Exponential backoff base for reconnection delays
    pub retry_exponent_base: u64,
    /// Maximum reconnection delay in milliseconds
    pub max_retry_delay_ms: u64,
    /// Number of retries for the initial connection
    pub initial_connection_retries: u32,
    /// Initial connect retry delay in milliseconds, doubled per attempt
    pub initial_retry_delay_ms: u64,
}

impl Default for RedisConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: redis::CONNECTION_TIMEOUT_SECS,
            response_timeout_secs: redis::RESPONSE_TIMEOUT_SECS,
            reconnection_retries: redis::RECONNECTION_RETRIES,
            retry_exponent_base: redis::RETRY_EXPONENT_BASE,
            max_retry_delay_ms: redis::MAX_RETRY_DELAY_MS,
            initial_connection_retries: redis::INITIAL_CONNECTION_RETRIES,
            initial_retry_delay_ms: redis::INITIAL_RETRY_DELAY_MS,
        }
    }
}

impl RedisConnectionConfig {
    /// Load Redis connection configuration from environment
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connection_timeout_secs: env::var("REDIS_CONNECTION_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.connection_timeout_secs),
            response_timeout_secs: env::var("REDIS_RESPONSE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.response_timeout_secs),
            reconnection_retries: env::var("REDIS_RECONNECTION_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reconnection_retries),
            initial_connection_retries: env::var("REDIS_INITIAL_CONNECTION_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.initial_connection_retries),
            ..defaults
        }
    }
}
