// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Default values for the cache, rate limiter, and retry orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped by the component that consumes them. Configuration
//! types in the main crate use these as their `Default` values and as the
//! fallback when an environment variable is missing or unparsable.

/// Cache-related constants (TTL, compression, capacity)
pub mod cache;
/// Token bucket rate limiting defaults
pub mod rate_limiting;
/// Retry and backoff defaults
pub mod retry;

/// Redis connection tuning
pub mod redis {
    /// Connection timeout in seconds
    pub const CONNECTION_TIMEOUT_SECS: u64 = 5;
    /// Response timeout in seconds
    pub const RESPONSE_TIMEOUT_SECS: u64 = 3;
    /// Reconnection attempts after a dropped connection
    pub const RECONNECTION_RETRIES: usize = 3;
    /// Exponent base for reconnection backoff
    pub const RETRY_EXPONENT_BASE: u64 = 2;
    /// Maximum delay between reconnection attempts in milliseconds
    pub const MAX_RETRY_DELAY_MS: u64 = 5_000;
    /// Attempts for the initial connection at startup
    pub const INITIAL_CONNECTION_RETRIES: u32 = 3;
    /// First delay of the initial connection backoff in milliseconds
    pub const INITIAL_RETRY_DELAY_MS: u64 = 500;
}

/// Service identity used by structured logging
pub mod service_names {
    /// Default service name
    pub const RUNCTL: &str = "runctl";
}
