// ABOUTME: Main library entry point for the runctl wellness API resilience layer
// ABOUTME: Rate limiting, retries, caching, and metrics around a rate-limited wellness API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # runctl
//!
//! Resilience layer used by the runctl data services to call a rate-limited,
//! occasionally unreliable wellness API (sleep, stress, body battery).
//!
//! ## Components
//!
//! - **Rate limiting**: keyed token buckets with non-blocking acquire and a
//!   cancellable wait
//! - **Retry**: exponential backoff driven by a retryable / non-retryable
//!   failure taxonomy
//! - **Cache**: TTL cache with gzip compression of large payloads, backed by
//!   an in-memory LRU or Redis
//! - **Metrics**: injected sink interface with a no-op default
//! - **Middleware**: explicit layers composing the above around one API call
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use chrono::NaiveDate;
//! use runctl::cache::DataKind;
//! use runctl::config::ResilienceConfig;
//! use runctl::errors::{ApiError, AppResult};
//! use runctl::metrics::TracingMetrics;
//! use runctl::wellness::{WellnessClient, WellnessService};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! struct StubClient;
//!
//! #[async_trait]
//! impl WellnessClient for StubClient {
//!     async fn fetch(&self, kind: DataKind, subject_id: &str, date: NaiveDate) -> Result<Value, ApiError> {
//!         Ok(json!({ "kind": kind.name(), "subject": subject_id, "date": date }))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ResilienceConfig::from_env();
//!     let service = WellnessService::from_config(StubClient, &config, Arc::new(TracingMetrics))?;
//!
//!     let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap_or_default();
//!     let cancel = CancellationToken::new();
//!     match service.sleep("athlete-1", date, &cancel).await {
//!         Ok(sleep) => println!("sleep: {sleep}"),
//!         Err(e) => eprintln!("sleep fetch failed: {e}"),
//!     }
//!     Ok(())
//! }
//! ```

/// Resilient cache with pluggable stores
pub mod cache;

/// Configuration loaded from the environment
pub mod config;

/// Structured logging setup
pub mod logging;

/// Metrics sink interface and provided sinks
pub mod metrics;

/// Composable resilience layers
pub mod middleware;

/// Token bucket rate limiting
pub mod rate_limiting;

/// Retry orchestration with failure classification
pub mod retry;

/// Wellness data service
pub mod wellness;

/// Application constants and configuration values
pub use runctl_core::constants;

/// Error types and failure classification
pub use runctl_core::errors;
