// ABOUTME: Metrics sink interface for cache, API, retry, and rate limit events
// ABOUTME: Injected into every component with a no-op default, plus recording and tracing sinks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Metrics Sink
//!
//! The resilience layer does not store metrics. Components call out to an
//! injected [`MetricsSink`]; every method defaults to a no-op so a sink only
//! overrides the events it cares about, and the layer works unchanged when
//! observability is not wired up.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Receiver of resilience layer events
pub trait MetricsSink: Send + Sync {
    /// A cache lookup found a usable value
    fn cache_hit(&self) {}
    /// A cache lookup found nothing usable
    fn cache_miss(&self) {}
    /// A cache operation failed (`get`, `set`, `delete`)
    fn cache_error(&self, _operation: &str, _error_type: &str) {}
    /// Serialized size of a value written to the cache
    fn cache_value_size(&self, _key: &str, _bytes: usize) {}
    /// An API call is about to be made
    fn api_request(&self, _endpoint: &str) {}
    /// Latency of a successful API call
    fn api_latency(&self, _endpoint: &str, _seconds: f64) {}
    /// An API call failed
    fn api_error(&self, _endpoint: &str, _error_type: &str) {}
    /// A failed call is about to be re-invoked
    fn retry_attempt(&self, _endpoint: &str) {}
    /// A call succeeded after at least one retry
    fn retry_success(&self, _endpoint: &str) {}
    /// A caller found the rate limit bucket empty
    fn rate_limit_hit(&self, _endpoint: &str) {}
    /// Credits left in the bucket after an acquire
    fn rate_limit_remaining(&self, _endpoint: &str, _value: f64) {}
}

/// Shared handle to a metrics sink
pub type SharedMetrics = Arc<dyn MetricsSink>;

/// Sink that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {}

/// Shared no-op sink, used wherever no sink was injected
#[must_use]
pub fn noop() -> SharedMetrics {
    Arc::new(NoopMetrics)
}

/// Sink that emits every event as a structured `tracing` debug event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn cache_hit(&self) {
        debug!(target: "runctl::metrics", event = "cache_hit");
    }

    fn cache_miss(&self) {
        debug!(target: "runctl::metrics", event = "cache_miss");
    }

    fn cache_error(&self, operation: &str, error_type: &str) {
        debug!(target: "runctl::metrics", event = "cache_error", operation, error_type);
    }

    fn cache_value_size(&self, key: &str, bytes: usize) {
        debug!(target: "runctl::metrics", event = "cache_value_size", key, bytes);
    }

    fn api_request(&self, endpoint: &str) {
        debug!(target: "runctl::metrics", event = "api_request", endpoint);
    }

    fn api_latency(&self, endpoint: &str, seconds: f64) {
        debug!(target: "runctl::metrics", event = "api_latency", endpoint, seconds);
    }

    fn api_error(&self, endpoint: &str, error_type: &str) {
        debug!(target: "runctl::metrics", event = "api_error", endpoint, error_type);
    }

    fn retry_attempt(&self, endpoint: &str) {
        debug!(target: "runctl::metrics", event = "retry_attempt", endpoint);
    }

    fn retry_success(&self, endpoint: &str) {
        debug!(target: "runctl::metrics", event = "retry_success", endpoint);
    }

    fn rate_limit_hit(&self, endpoint: &str) {
        debug!(target: "runctl::metrics", event = "rate_limit_hit", endpoint);
    }

    fn rate_limit_remaining(&self, endpoint: &str, value: f64) {
        debug!(target: "runctl::metrics", event = "rate_limit_remaining", endpoint, value);
    }
}

/// Thread-safe sink that keeps counters, observations, and gauges in memory
///
/// Series are addressed by event name plus an optional label, rendered as
/// `name{label}` (for example `retry_attempt{sleep}`). Unlabelled events use
/// the bare name.
///
/// Meant for tests and local inspection. Each observation series keeps only
/// its most recent [`InMemoryMetrics::MAX_OBSERVATIONS_PER_SERIES`] values,
/// but the number of series grows with the distinct labels seen
/// (`cache_value_size` is labelled per cache key); call [`reset`] or use an
/// exporting sink in long-running processes.
///
/// [`reset`]: InMemoryMetrics::reset
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: DashMap<String, u64>,
    observations: DashMap<String, VecDeque<f64>>,
    gauges: DashMap<String, f64>,
}

impl InMemoryMetrics {
    /// Observations retained per series; older values are dropped first
    pub const MAX_OBSERVATIONS_PER_SERIES: usize = 1_024;

    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, zero if never incremented
    #[must_use]
    pub fn counter(&self, name: &str, label: Option<&str>) -> u64 {
        self.counters
            .get(&series(name, label))
            .map_or(0, |value| *value)
    }

    /// Retained observations for a histogram series, oldest first
    #[must_use]
    pub fn observations(&self, name: &str, label: Option<&str>) -> Vec<f64> {
        self.observations
            .get(&series(name, label))
            .map(|values| values.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Last value set on a gauge
    #[must_use]
    pub fn gauge(&self, name: &str, label: Option<&str>) -> Option<f64> {
        self.gauges.get(&series(name, label)).map(|value| *value)
    }

    /// Drop everything recorded so far
    pub fn reset(&self) {
        self.counters.clear();
        self.observations.clear();
        self.gauges.clear();
    }

    fn increment(&self, name: &str, label: Option<&str>) {
        *self.counters.entry(series(name, label)).or_insert(0) += 1;
    }

    fn observe(&self, name: &str, label: Option<&str>, value: f64) {
        let mut values = self.observations.entry(series(name, label)).or_default();
        if values.len() >= Self::MAX_OBSERVATIONS_PER_SERIES {
            values.pop_front();
        }
        values.push_back(value);
    }
}

fn series(name: &str, label: Option<&str>) -> String {
    label.map_or_else(|| name.to_owned(), |label| format!("{name}{{{label}}}"))
}

impl MetricsSink for InMemoryMetrics {
    fn cache_hit(&self) {
        self.increment("cache_hit", None);
    }

    fn cache_miss(&self) {
        self.increment("cache_miss", None);
    }

    fn cache_error(&self, operation: &str, error_type: &str) {
        self.increment("cache_error", Some(&format!("{operation}:{error_type}")));
    }

    #[allow(clippy::cast_precision_loss)]
    fn cache_value_size(&self, key: &str, bytes: usize) {
        self.observe("cache_value_size", Some(key), bytes as f64);
    }

    fn api_request(&self, endpoint: &str) {
        self.increment("api_request", Some(endpoint));
    }

    fn api_latency(&self, endpoint: &str, seconds: f64) {
        self.observe("api_latency", Some(endpoint), seconds);
    }

    fn api_error(&self, endpoint: &str, error_type: &str) {
        self.increment("api_error", Some(&format!("{endpoint}:{error_type}")));
    }

    fn retry_attempt(&self, endpoint: &str) {
        self.increment("retry_attempt", Some(endpoint));
    }

    fn retry_success(&self, endpoint: &str) {
        self.increment("retry_success", Some(endpoint));
    }

    fn rate_limit_hit(&self, endpoint: &str) {
        self.increment("rate_limit_hit", Some(endpoint));
    }

    fn rate_limit_remaining(&self, endpoint: &str, value: f64) {
        self.gauges
            .insert(series("rate_limit_remaining", Some(endpoint)), value);
    }
}
