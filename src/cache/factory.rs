// ABOUTME: Cache backend selection from the configured backing store URL
// ABOUTME: Dispatches store operations to the in-memory or Redis implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::memory::InMemoryStore;
use super::redis::RedisStore;
use super::{CacheError, CacheStore};
use crate::config::CacheSettings;
use crate::constants::cache::MEMORY_STORE_SCHEME;
use std::time::Duration;
use tracing::info;

/// Concrete cache store chosen at startup
#[derive(Clone)]
pub enum CacheBackend {
    /// Process-local LRU
    Memory(InMemoryStore),
    /// Shared Redis instance
    Redis(RedisStore),
}

impl CacheBackend {
    /// Build the backend named by `settings.backing_store_url`
    ///
    /// `redis://` and `rediss://` select Redis (connected lazily); an absent
    /// URL or `memory://` selects the in-memory store.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown scheme or malformed Redis URL
    pub fn new(settings: &CacheSettings) -> Result<Self, CacheError> {
        match settings.backing_store_url.as_deref() {
            None => Ok(Self::memory(settings)),
            Some(url) if url.starts_with(MEMORY_STORE_SCHEME) => Ok(Self::memory(settings)),
            Some(url) if url.starts_with("redis://") || url.starts_with("rediss://") => {
                info!("initializing Redis cache backend");
                RedisStore::new(url, settings.redis_connection.clone()).map(Self::Redis)
            }
            Some(url) => Err(CacheError::Configuration(format!(
                "unsupported cache backing store URL: {url}"
            ))),
        }
    }

    fn memory(settings: &CacheSettings) -> Self {
        info!(
            max_entries = settings.max_entries,
            background_cleanup = settings.enable_background_cleanup,
            "initializing in-memory cache backend"
        );
        Self::Memory(InMemoryStore::new(settings))
    }

    /// Short backend name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }
}

#[async_trait::async_trait]
impl CacheStore for CacheBackend {
    async fn connect(&self) -> Result<(), CacheError> {
        match self {
            Self::Memory(store) => store.connect().await,
            Self::Redis(store) => store.connect().await,
        }
    }

    async fn disconnect(&self) {
        match self {
            Self::Memory(store) => store.disconnect().await,
            Self::Redis(store) => store.disconnect().await,
        }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self {
            Self::Memory(store) => store.get_raw(key).await,
            Self::Redis(store) => store.get_raw(key).await,
        }
    }

    async fn set_raw(
        &self,
        key: &str,
        payload: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        match self {
            Self::Memory(store) => store.set_raw(key, payload, ttl).await,
            Self::Redis(store) => store.set_raw(key, payload, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            Self::Memory(store) => store.delete(key).await,
            Self::Redis(store) => store.delete(key).await,
        }
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        match self {
            Self::Memory(store) => store.health_check().await,
            Self::Redis(store) => store.health_check().await,
        }
    }

    async fn clear_all(&self) -> Result<(), CacheError> {
        match self {
            Self::Memory(store) => store.clear_all().await,
            Self::Redis(store) => store.clear_all().await,
        }
    }
}
