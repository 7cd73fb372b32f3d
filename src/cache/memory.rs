// ABOUTME: In-memory cache store with LRU eviction and optional per-entry expiry
// ABOUTME: Expired entries are dropped lazily on read and by an optional background sweep
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{CacheError, CacheStore};
use crate::config::CacheSettings;
use crate::constants::cache::DEFAULT_CACHE_MAX_ENTRIES;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Instant};
use tracing::debug;

type Store = Arc<RwLock<LruCache<String, StoredEntry>>>;

/// Payload plus its expiry deadline
#[derive(Debug, Clone)]
struct StoredEntry {
    payload: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    /// A TTL too large to represent as a deadline means no expiry
    fn new(payload: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            payload,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// In-memory store with LRU eviction and background cleanup
///
/// The LRU sits behind `Arc<RwLock<..>>` so the cleanup task spawned at
/// construction can sweep expired entries concurrently with cache traffic.
/// Dropping the last handle stops the task.
#[derive(Clone)]
pub struct InMemoryStore {
    store: Store,
    shutdown_tx: Option<Arc<mpsc::Sender<()>>>,
}

impl InMemoryStore {
    const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_CACHE_MAX_ENTRIES) {
        Some(n) => n,
        None => NonZeroUsize::MIN,
    };

    /// Create a store sized and swept according to `settings`
    ///
    /// Must be called within a Tokio runtime when background cleanup is enabled.
    #[must_use]
    pub fn new(settings: &CacheSettings) -> Self {
        let capacity = NonZeroUsize::new(settings.max_entries).unwrap_or(Self::FALLBACK_CAPACITY);
        let store: Store = Arc::new(RwLock::new(LruCache::new(capacity)));

        let shutdown_tx = settings.enable_background_cleanup.then(|| {
            let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
            let sweep_store = Arc::clone(&store);
            let cleanup_interval = settings.cleanup_interval;

            tokio::spawn(async move {
                let mut ticker = interval(cleanup_interval);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            Self::cleanup_expired(&sweep_store).await;
                        }
                        _ = shutdown_rx.recv() => {
                            debug!("cache cleanup task received shutdown signal");
                            break;
                        }
                    }
                }
            });

            Arc::new(shutdown_tx)
        });

        Self { store, shutdown_tx }
    }

    /// Number of entries currently held, expired or not
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        Self::cleanup_expired(&self.store).await
    }

    async fn cleanup_expired(store: &Store) -> usize {
        let now = Instant::now();
        let mut guard = store.write().await;

        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            guard.pop(key);
        }
        drop(guard);

        if !expired.is_empty() {
            debug!(removed = expired.len(), "cleaned up expired cache entries");
        }
        expired.len()
    }
}

#[async_trait::async_trait]
impl CacheStore for InMemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut store = self.store.write().await;

        // LruCache::get is mutable (updates access order)
        let Some(entry) = store.get(key) else {
            return Ok(None);
        };
        if entry.is_expired(Instant::now()) {
            store.pop(key);
            return Ok(None);
        }
        Ok(Some(entry.payload.clone()))
    }

    async fn set_raw(
        &self,
        key: &str,
        payload: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.store
            .write()
            .await
            .push(key.to_owned(), StoredEntry::new(payload, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.write().await.pop(key);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), CacheError> {
        self.store.write().await.clear();
        Ok(())
    }
}

impl Drop for InMemoryStore {
    fn drop(&mut self) {
        // Only the last clone holding the sender actually stops the task
        if let Some(tx) = &self.shutdown_tx {
            if Arc::strong_count(tx) == 1 {
                if let Err(e) = tx.try_send(()) {
                    debug!(error = ?e, "cache shutdown signal send failed (channel likely closed)");
                }
            }
        }
    }
}
