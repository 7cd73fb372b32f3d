// ABOUTME: Retry and exponential backoff defaults for wellness API calls
// ABOUTME: Attempt budget, delay bounds, and growth factor
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Total attempts, including the first call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry in seconds
pub const DEFAULT_INITIAL_DELAY_SECS: f64 = 1.0;

/// Upper bound for any single backoff delay in seconds
pub const DEFAULT_MAX_DELAY_SECS: f64 = 60.0;

/// Multiplier applied to the delay after each failed attempt
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Label reported to metrics when a call gives up after all attempts
pub const RETRIES_EXHAUSTED_LABEL: &str = "retries_exhausted";
