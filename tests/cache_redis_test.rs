// ABOUTME: Integration tests for the Redis cache backend
// ABOUTME: Runs the resilient cache against a real Redis instance when REDIS_URL is set (CI-only)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use anyhow::Result;
use chrono::NaiveDate;
use runctl::cache::codec::is_compressed;
use runctl::cache::redis::RedisStore;
use runctl::cache::{CacheBackend, CacheError, CacheKey, CacheStore, ResilientCache};
use runctl::config::{CacheSettings, RedisConnectionConfig};
use runctl::metrics;
use std::env;
use std::process;
use std::time::Duration;
use tokio::time::sleep;

fn unique_subject(test: &str) -> String {
    format!("redis-test-{test}-{}", process::id())
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// Helper: Create Redis-backed cache from `REDIS_URL` environment variable
/// Returns None if `REDIS_URL` is not set (allows skipping tests in non-Redis environments)
async fn create_redis_cache() -> Result<Option<ResilientCache>> {
    let Ok(redis_url) = env::var("REDIS_URL") else {
        println!("REDIS_URL not set, skipping Redis cache tests");
        return Ok(None);
    };

    let settings = CacheSettings {
        backing_store_url: Some(redis_url),
        compression_threshold: 64,
        ..CacheSettings::in_memory()
    };
    let cache = ResilientCache::from_settings(&settings, metrics::noop())?;
    cache.connect().await?;
    Ok(Some(cache))
}

/// Helper macro to skip test if Redis is not available
macro_rules! require_redis {
    ($cache:expr) => {
        match $cache {
            Some(cache) => cache,
            None => {
                println!("Skipping test: Redis not available");
                return Ok(());
            }
        }
    };
}

#[tokio::test]
async fn test_redis_backend_is_selected_by_url() -> Result<()> {
    let cache = require_redis!(create_redis_cache().await?);
    assert_eq!(cache.store().name(), "redis");
    cache.health_check().await?;
    Ok(())
}

#[tokio::test]
async fn test_redis_set_get_delete() -> Result<()> {
    let cache = require_redis!(create_redis_cache().await?);
    let key = CacheKey::sleep(unique_subject("roundtrip"), day());

    assert!(cache.set(&key, &vec![1_u32, 2, 3], Some(Duration::from_secs(60))).await);
    assert_eq!(cache.get::<Vec<u32>>(&key).await, Some(vec![1, 2, 3]));

    assert!(cache.delete(&key).await);
    assert!(cache.delete(&key).await);
    assert_eq!(cache.get::<Vec<u32>>(&key).await, None);
    Ok(())
}

#[tokio::test]
async fn test_redis_stores_compressed_payloads() -> Result<()> {
    let cache = require_redis!(create_redis_cache().await?);
    let key = CacheKey::stress(unique_subject("compressed"), day());
    let value = "w".repeat(4096);

    assert!(cache.set(&key, &value, Some(Duration::from_secs(60))).await);
    let raw = cache.store().get_raw(&key.to_string()).await?.unwrap();
    assert!(is_compressed(&raw));
    assert_eq!(cache.get::<String>(&key).await, Some(value));

    cache.delete(&key).await;
    Ok(())
}

#[tokio::test]
async fn test_redis_ttl_expiry() -> Result<()> {
    let cache = require_redis!(create_redis_cache().await?);
    let key = CacheKey::body_battery(unique_subject("ttl"), day());

    assert!(cache.set(&key, &"short-lived", Some(Duration::from_secs(1))).await);
    assert!(cache.get::<String>(&key).await.is_some());

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.get::<String>(&key).await, None);
    Ok(())
}

#[tokio::test]
async fn test_invalid_redis_url_is_a_configuration_error() {
    let result = RedisStore::new("not a url", RedisConnectionConfig::default());
    assert!(matches!(result, Err(CacheError::Configuration(_))));
}

#[tokio::test]
async fn test_unknown_scheme_is_rejected() {
    let settings = CacheSettings {
        backing_store_url: Some("memcached://localhost:11211".into()),
        ..CacheSettings::in_memory()
    };
    assert!(matches!(
        CacheBackend::new(&settings),
        Err(CacheError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_unreachable_redis_degrades_to_miss() -> Result<()> {
    let store = RedisStore::new(
        "redis://127.0.0.1:1",
        RedisConnectionConfig {
            connection_timeout_secs: 1,
            response_timeout_secs: 1,
            reconnection_retries: 0,
            initial_connection_retries: 1,
            initial_retry_delay_ms: 10,
            ..RedisConnectionConfig::default()
        },
    )?;
    assert!(!store.is_connected().await);

    let cache = ResilientCache::with_store(store);
    let key = CacheKey::sleep(unique_subject("unreachable"), day());
    assert_eq!(cache.get::<String>(&key).await, None);
    assert!(cache.try_get::<String>(&key).await.is_err());
    Ok(())
}
