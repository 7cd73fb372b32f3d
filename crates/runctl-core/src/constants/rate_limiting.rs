// ABOUTME: Token bucket rate limiting defaults for the wellness API
// ABOUTME: Sustained rate, burst capacity, and polling cadence for waiting callers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Sustained requests per minute per resource key
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Bucket capacity (burst) per resource key
pub const DEFAULT_BURST_LIMIT: u32 = 10;

/// Cooldown advertised by the upstream API after throttling (informational)
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

/// Interval between acquire attempts while waiting for a credit
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Credits withdrawn by a single API call
pub const DEFAULT_REQUEST_COST: u32 = 1;
