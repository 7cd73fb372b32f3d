// ABOUTME: Typed failures a wellness API client reports to the resilience layer
// ABOUTME: Classifies transport, throttling, auth, and data failures without message sniffing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::classification::{Classify, ErrorClass};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single wellness API call
///
/// Clients construct the variant that matches what they observed; the
/// resilience layer never inspects the message text.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Connection refused, reset, or dropped
    #[error("connection failed: {0}")]
    Connection(String),
    /// No response within the client's deadline
    #[error("request timed out: {0}")]
    Timeout(String),
    /// Upstream returned HTTP 429 or reported quota exhaustion
    #[error("rate limit exceeded (HTTP 429)")]
    RateLimited {
        /// Delay suggested by the upstream `Retry-After` header
        retry_after: Option<Duration>,
    },
    /// Credentials rejected or expired
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Request parameters or response payload malformed
    #[error("validation failed: {0}")]
    Validation(String),
    /// Any other HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body or reason
        message: String,
    },
    /// Failure with no further structure
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Build an error from an HTTP status code
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Classify an HTTP status code
    ///
    /// 429 is throttling, 408/504 are timeouts, 401/403 are auth failures and
    /// 400/422 are malformed requests. Everything else, including other 5xx,
    /// is unexpected.
    #[must_use]
    pub const fn classify_status(status: u16) -> ErrorClass {
        match status {
            429 => ErrorClass::RATE_LIMITED,
            408 | 504 => ErrorClass::NETWORK,
            401 | 403 => ErrorClass::AUTHENTICATION,
            400 | 422 => ErrorClass::VALIDATION,
            _ => ErrorClass::UNEXPECTED,
        }
    }
}

impl Classify for ApiError {
    fn classify(&self) -> ErrorClass {
        match self {
            Self::Connection(_) | Self::Timeout(_) => ErrorClass::NETWORK,
            Self::RateLimited { .. } => ErrorClass::RATE_LIMITED,
            Self::Authentication(_) => ErrorClass::AUTHENTICATION,
            Self::Validation(_) => ErrorClass::VALIDATION,
            Self::Http { status, .. } => Self::classify_status(*status),
            Self::Other(_) => ErrorClass::UNEXPECTED,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<io::Error> for ApiError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout(error.to_string()),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Self::Connection(error.to_string()),
            _ => Self::Other(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Validation(error.to_string())
    }
}
