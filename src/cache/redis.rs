// ABOUTME: Redis cache store with lazy connection management and TTL support
// ABOUTME: Connects on first use with exponential backoff and namespaces every key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{CacheError, CacheStore};
use crate::config::RedisConnectionConfig;
use crate::constants::cache::CACHE_KEY_PREFIX;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Redis-backed cache store
///
/// Holds one shared `ConnectionManager`, created on the first operation (or
/// an explicit [`CacheStore::connect`]) and dropped by
/// [`CacheStore::disconnect`]. The manager reconnects on its own after a
/// dropped connection. All keys are prefixed with `CACHE_KEY_PREFIX`.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    conn_config: RedisConnectionConfig,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

impl RedisStore {
    /// Create a store for `redis_url` without connecting yet
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL cannot be parsed
    pub fn new(redis_url: &str, conn_config: RedisConnectionConfig) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Configuration(format!("invalid Redis URL: {e}")))?;
        Ok(Self {
            client,
            conn_config,
            manager: Arc::new(RwLock::new(None)),
        })
    }

    /// Whether a connection manager is currently held
    pub async fn is_connected(&self) -> bool {
        self.manager.read().await.is_some()
    }

    /// Shared connection, established on first use
    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        if let Some(manager) = self.manager.read().await.as_ref() {
            return Ok(manager.clone());
        }

        let mut guard = self.manager.write().await;
        // Another task may have connected while we waited for the write lock
        if let Some(manager) = guard.as_ref() {
            return Ok(manager.clone());
        }

        info!(
            timeout_secs = self.conn_config.connection_timeout_secs,
            response_timeout_secs = self.conn_config.response_timeout_secs,
            retries = self.conn_config.initial_connection_retries,
            "connecting to Redis cache"
        );
        let manager = Self::connect_with_retry(&self.client, &self.conn_config).await?;
        *guard = Some(manager.clone());
        drop(guard);

        info!("connected to Redis cache");
        Ok(manager)
    }

    /// Connect with exponential backoff between failed attempts
    async fn connect_with_retry(
        client: &Client,
        conn_config: &RedisConnectionConfig,
    ) -> Result<ConnectionManager, CacheError> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(conn_config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(conn_config.response_timeout_secs))
            .set_number_of_retries(conn_config.reconnection_retries)
            .set_exponent_base(conn_config.retry_exponent_base)
            .set_max_delay(conn_config.max_retry_delay_ms);

        let max_retries = conn_config.initial_connection_retries;
        let mut delay_ms = conn_config.initial_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await
            {
                Ok(manager) => {
                    if attempt > 0 {
                        info!(retries = attempt, "Redis connection established after retry");
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    if attempt < max_retries {
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = max_retries + 1,
                            delay_ms,
                            error = %e,
                            "Redis connection attempt failed, retrying"
                        );
                        sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = delay_ms.saturating_mul(2).min(conn_config.max_retry_delay_ms);
                    }
                    last_error = Some(e);
                }
            }
        }

        let cause = last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string());
        error!(attempts = max_retries + 1, error = %cause, "Redis connection failed");
        Err(CacheError::Connection(format!(
            "failed to connect to Redis after {} attempts: {cause}",
            max_retries + 1
        )))
    }

    /// Build full Redis key with namespace prefix
    fn build_key(key: &str) -> String {
        format!("{CACHE_KEY_PREFIX}{key}")
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(error: redis::RedisError) -> Self {
        if error.is_connection_refusal()
            || error.is_connection_dropped()
            || error.is_timeout()
            || error.is_io_error()
        {
            Self::Connection(error.to_string())
        } else {
            Self::Backend(error.to_string())
        }
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisStore {
    async fn connect(&self) -> Result<(), CacheError> {
        self.connection().await.map(|_| ())
    }

    async fn disconnect(&self) {
        if self.manager.write().await.take().is_some() {
            info!("disconnected from Redis cache");
        }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        let data: Option<Vec<u8>> = conn.get(Self::build_key(key)).await?;
        Ok(data)
    }

    async fn set_raw(
        &self,
        key: &str,
        payload: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let redis_key = Self::build_key(key);
        match ttl {
            // EX rejects zero, so sub-second TTLs round up to one second
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(&redis_key, payload, ttl.as_secs().max(1))
                    .await?;
            }
            None => conn.set::<_, _, ()>(&redis_key, payload).await?,
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(Self::build_key(key)).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let response: String = redis::cmd("PING").query_async(&mut conn).await?;
        if response == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Backend(format!(
                "unexpected PING response '{response}'"
            )))
        }
    }

    async fn clear_all(&self) -> Result<(), CacheError> {
        // Only our namespace, so a shared Redis instance is left intact
        let pattern = format!("{CACHE_KEY_PREFIX}*");
        let mut conn = self.connection().await?;
        let mut cursor = 0_u64;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                conn.del::<_, ()>(&keys).await?;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(())
    }
}
