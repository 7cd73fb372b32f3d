// ABOUTME: Resilient TTL cache in front of the wellness API with optional payload compression
// ABOUTME: Pluggable store backends (in-memory, Redis); backend failures degrade to cache misses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Resilient Cache
//!
//! [`ResilientCache`] serializes values to JSON, gzips payloads above the
//! configured threshold, and stores them through a [`CacheStore`]. Reads
//! detect compressed payloads by their magic prefix, so both representations
//! coexist under one key space.
//!
//! `get`, `set` and `delete` never fail: a store that cannot be reached, or
//! an entry that cannot be decoded, is logged, reported to the metrics sink,
//! and treated as a miss. [`ResilientCache::try_get`] is the variant that
//! surfaces transport failures for callers that need to tell the two apart.

/// JSON + gzip payload codec
pub mod codec;
/// Cache backend selection
pub mod factory;
/// Data kinds and structured cache keys
pub mod keys;
/// In-memory LRU store
pub mod memory;
/// Redis store
pub mod redis;

pub use codec::{EncodedPayload, PayloadCodec};
pub use factory::CacheBackend;
pub use keys::{CacheKey, CacheKeyTemplate, DataKind};

use crate::config::{BackendFailurePolicy, CacheSettings};
use crate::errors::{AppError, ErrorCode};
use crate::metrics::{self, SharedMetrics};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures inside the cache layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Backing store unreachable or connection lost
    #[error("cache connection error: {0}")]
    Connection(String),
    /// Value could not be serialized
    #[error("cache serialization error: {0}")]
    Serialization(String),
    /// Stored payload could not be deserialized
    #[error("cache deserialization error: {0}")]
    Deserialization(String),
    /// Payload could not be compressed or decompressed
    #[error("cache compression error: {0}")]
    Compression(String),
    /// Backing store rejected the command
    #[error("cache backend error: {0}")]
    Backend(String),
    /// Cache misconfigured
    #[error("cache configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Stable label used as the `error_type` of cache metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Serialization(_) => "serialization",
            Self::Deserialization(_) => "deserialization",
            Self::Compression(_) => "compression",
            Self::Backend(_) => "backend",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Whether the backing store itself failed, as opposed to the payload
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Backend(_))
    }
}

impl From<CacheError> for AppError {
    fn from(error: CacheError) -> Self {
        let code = match &error {
            CacheError::Connection(_) | CacheError::Backend(_) => ErrorCode::StorageError,
            CacheError::Serialization(_)
            | CacheError::Deserialization(_)
            | CacheError::Compression(_) => ErrorCode::SerializationError,
            CacheError::Configuration(_) => ErrorCode::ConfigInvalid,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}

/// Raw byte store behind the resilient cache
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Establish the backend connection ahead of first use
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn connect(&self) -> Result<(), CacheError> {
        Ok(())
    }

    /// Release the backend connection; the next operation reconnects
    async fn disconnect(&self) {}

    /// Fetch the stored bytes for `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store bytes under `key`; `None` keeps them until evicted or deleted
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    async fn set_raw(
        &self,
        key: &str,
        payload: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError>;

    /// Remove `key`; removing an absent key succeeds
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Verify the backend answers
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unhealthy
    async fn health_check(&self) -> Result<(), CacheError>;

    /// Remove every entry this cache owns
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    async fn clear_all(&self) -> Result<(), CacheError>;
}

/// Cache with TTLs, compression, metrics, and failure absorption
pub struct ResilientCache<S = CacheBackend> {
    store: Arc<S>,
    codec: PayloadCodec,
    failure_policy: BackendFailurePolicy,
    metrics: SharedMetrics,
}

impl<S> Clone for ResilientCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            codec: self.codec,
            failure_policy: self.failure_policy,
            metrics: self.metrics.clone(),
        }
    }
}

impl ResilientCache<CacheBackend> {
    /// Build the cache and its backend from settings
    ///
    /// Must be called within a Tokio runtime when the in-memory backend runs
    /// background cleanup.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the backing store URL is unusable
    pub fn from_settings(settings: &CacheSettings, metrics: SharedMetrics) -> Result<Self, CacheError> {
        let backend = CacheBackend::new(settings)?;
        Ok(Self::new(backend, settings, metrics))
    }
}

impl<S: CacheStore> ResilientCache<S> {
    /// Wrap `store` using the compression and failure settings from `settings`
    #[must_use]
    pub fn new(store: S, settings: &CacheSettings, metrics: SharedMetrics) -> Self {
        Self {
            store: Arc::new(store),
            codec: PayloadCodec::new(settings.compress, settings.compression_threshold),
            failure_policy: settings.failure_policy,
            metrics,
        }
    }

    /// Wrap `store` with default settings and no metrics
    #[must_use]
    pub fn with_store(store: S) -> Self {
        Self::new(store, &CacheSettings::default(), metrics::noop())
    }

    /// Underlying store
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Behavior configured for backend failures
    #[must_use]
    pub const fn failure_policy(&self) -> BackendFailurePolicy {
        self.failure_policy
    }

    /// Connect the backend ahead of first use
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    pub async fn connect(&self) -> Result<(), CacheError> {
        self.store.connect().await
    }

    /// Release the backend connection
    pub async fn disconnect(&self) {
        self.store.disconnect().await;
    }

    /// Verify the backend answers
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unhealthy
    pub async fn health_check(&self) -> Result<(), CacheError> {
        self.store.health_check().await
    }

    /// Cached value for `key`, `None` on a miss or any failure
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.lookup(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, treating as miss");
                self.metrics.cache_miss();
                None
            }
        }
    }

    /// Cached value for `key`, surfacing backing store failures
    ///
    /// Undecodable entries are still reported as a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read
    pub async fn try_get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        self.lookup(key).await.inspect_err(|e| {
            warn!(key = %key, error = %e, "cache read failed");
        })
    }

    /// Read according to the configured [`BackendFailurePolicy`]
    ///
    /// # Errors
    ///
    /// Returns an error only under `Propagate` when the backing store fails
    pub async fn get_with_policy<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> Result<Option<T>, CacheError> {
        match self.failure_policy {
            BackendFailurePolicy::TreatAsMiss => Ok(self.get(key).await),
            BackendFailurePolicy::Propagate => self.try_get(key).await,
        }
    }

    /// Store `value` under `key`, returning whether it was written
    ///
    /// A `None` TTL keeps the entry until it is evicted or deleted.
    pub async fn set<T: Serialize + Sync + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        let key_str = key.to_string();
        let payload = match self.codec.encode(value) {
            Ok(payload) => payload,
            Err(e) => {
                self.metrics.cache_error("set", e.kind());
                warn!(key = %key_str, error = %e, "failed to encode cache value");
                return false;
            }
        };
        self.metrics.cache_value_size(&key_str, payload.serialized_len);

        if ttl.is_none() {
            debug!(key = %key_str, "caching without TTL, entry will not expire");
        }

        let compressed = payload.compressed;
        let stored_len = payload.bytes.len();
        match self.store.set_raw(&key_str, payload.bytes, ttl).await {
            Ok(()) => {
                debug!(
                    key = %key_str,
                    serialized_len = payload.serialized_len,
                    stored_len,
                    compressed,
                    "cached value"
                );
                true
            }
            Err(e) => {
                self.metrics.cache_error("set", e.kind());
                warn!(key = %key_str, error = %e, "failed to write cache entry");
                false
            }
        }
    }

    /// Remove `key`, returning whether the store accepted the delete
    ///
    /// Deleting an absent key succeeds.
    pub async fn delete(&self, key: &CacheKey) -> bool {
        let key_str = key.to_string();
        match self.store.delete(&key_str).await {
            Ok(()) => true,
            Err(e) => {
                self.metrics.cache_error("delete", e.kind());
                warn!(key = %key_str, error = %e, "failed to delete cache entry");
                false
            }
        }
    }

    /// Remove every entry this cache owns
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store.clear_all().await
    }

    /// Shared read path: hit/miss accounting, undecodable payloads become misses,
    /// transport failures are returned after being counted
    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        let key_str = key.to_string();
        let bytes = match self.store.get_raw(&key_str).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.metrics.cache_miss();
                return Ok(None);
            }
            Err(e) => {
                self.metrics.cache_error("get", e.kind());
                return Err(e);
            }
        };

        match self.codec.decode(&bytes) {
            Ok(value) => {
                self.metrics.cache_hit();
                Ok(Some(value))
            }
            Err(e) => {
                self.metrics.cache_error("get", e.kind());
                self.metrics.cache_miss();
                warn!(key = %key_str, error = %e, "discarding undecodable cache entry");
                Ok(None)
            }
        }
    }
}
