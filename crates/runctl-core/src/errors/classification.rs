// ABOUTME: Retryable and non-retryable failure taxonomy for wellness API calls
// ABOUTME: Every failure is mapped to exactly one ErrorClass before a retry decision
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Failure Classification
//!
//! Classification happens once, at the boundary where a failure is first
//! observed, through the [`Classify`] trait. Nothing deeper in the call stack
//! inspects error messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Failures that may succeed when the same call is attempted again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryableKind {
    /// Connection refused/reset or timeout
    Network,
    /// Upstream signalled HTTP 429 or quota exhaustion
    RateLimited,
}

/// Failures that will fail again no matter how often they are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonRetryableKind {
    /// Credentials rejected or access forbidden
    Authentication,
    /// Request or response data malformed
    Validation,
    /// Anything not recognized; never guessed to be retryable
    Unexpected,
}

/// Classified failure used by the retry orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Re-attempting could plausibly succeed
    Retryable(RetryableKind),
    /// Fail fast
    NonRetryable(NonRetryableKind),
}

impl ErrorClass {
    /// Connection or timeout failure
    pub const NETWORK: Self = Self::Retryable(RetryableKind::Network);
    /// Upstream throttling
    pub const RATE_LIMITED: Self = Self::Retryable(RetryableKind::RateLimited);
    /// Rejected credentials
    pub const AUTHENTICATION: Self = Self::NonRetryable(NonRetryableKind::Authentication);
    /// Malformed data
    pub const VALIDATION: Self = Self::NonRetryable(NonRetryableKind::Validation);
    /// Unrecognized failure
    pub const UNEXPECTED: Self = Self::NonRetryable(NonRetryableKind::Unexpected);

    /// Whether the orchestrator may re-invoke the operation
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// Stable label used for metrics and structured logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Retryable(kind) => kind.label(),
            Self::NonRetryable(kind) => kind.label(),
        }
    }
}

impl RetryableKind {
    /// Stable label used for metrics and structured logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::RateLimited => "rate_limited",
        }
    }
}

impl NonRetryableKind {
    /// Stable label used for metrics and structured logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Validation => "validation",
            Self::Unexpected => "unexpected",
        }
    }
}

impl From<RetryableKind> for ErrorClass {
    fn from(kind: RetryableKind) -> Self {
        Self::Retryable(kind)
    }
}

impl From<NonRetryableKind> for ErrorClass {
    fn from(kind: NonRetryableKind) -> Self {
        Self::NonRetryable(kind)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for RetryableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for NonRetryableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a failure into the [`ErrorClass`] taxonomy
pub trait Classify {
    /// Classify this failure
    fn classify(&self) -> ErrorClass;

    /// Minimum wait the upstream asked for before the next attempt
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl<T: Classify + ?Sized> Classify for &T {
    fn classify(&self) -> ErrorClass {
        (**self).classify()
    }

    fn retry_after(&self) -> Option<Duration> {
        (**self).retry_after()
    }
}

impl<T: Classify + ?Sized> Classify for Box<T> {
    fn classify(&self) -> ErrorClass {
        (**self).classify()
    }

    fn retry_after(&self) -> Option<Duration> {
        (**self).retry_after()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_retryable_classes_allow_retry() {
        assert!(ErrorClass::NETWORK.is_retryable());
        assert!(ErrorClass::RATE_LIMITED.is_retryable());
        assert!(!ErrorClass::AUTHENTICATION.is_retryable());
        assert!(!ErrorClass::VALIDATION.is_retryable());
        assert!(!ErrorClass::UNEXPECTED.is_retryable());
    }

    #[test]
    fn test_labels_are_snake_case() {
        assert_eq!(ErrorClass::RATE_LIMITED.to_string(), "rate_limited");
        assert_eq!(ErrorClass::AUTHENTICATION.label(), "authentication");
    }
}
