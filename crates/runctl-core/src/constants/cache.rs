// ABOUTME: Cache-related constants for TTL, compression, capacity, and cleanup intervals
// ABOUTME: Shared by the in-memory and Redis cache stores
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Default maximum cache entries for the in-memory store
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// Default cleanup interval in seconds for expired entries
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300; // 5 minutes

/// Sleep data cache TTL - nightly data settles slowly after sync
pub const TTL_SLEEP_SECS: u64 = 3_600; // 1 hour

/// Stress data cache TTL
pub const TTL_STRESS_SECS: u64 = 1_800; // 30 minutes

/// Body battery cache TTL
pub const TTL_BODY_BATTERY_SECS: u64 = 1_800; // 30 minutes

/// Payloads whose serialized form is larger than this are compressed
pub const DEFAULT_COMPRESSION_THRESHOLD_BYTES: usize = 1_024;

/// Upper bound on the decompressed size of one cached payload
pub const MAX_DECOMPRESSED_BYTES: usize = 16 * 1_024 * 1_024; // 16 MiB

/// Leading bytes of every gzip stream, used to detect compressed payloads
pub const COMPRESSED_PAYLOAD_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Sleep cache key template
pub const SLEEP_KEY_TEMPLATE: &str = "sleep:{subject_id}:{date}";

/// Stress cache key template
pub const STRESS_KEY_TEMPLATE: &str = "stress:{subject_id}:{date}";

/// Body battery cache key template
pub const BODY_BATTERY_KEY_TEMPLATE: &str = "body_battery:{subject_id}:{date}";

/// Cache key prefix for namespacing inside a shared Redis instance
pub const CACHE_KEY_PREFIX: &str = "runctl:cache:";

/// Backing store URL scheme selecting the in-memory store
pub const MEMORY_STORE_SCHEME: &str = "memory://";
