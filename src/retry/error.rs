// ABOUTME: Terminal outcomes of a retried operation
// ABOUTME: Separates exhausted retryable failures from fatal ones and from cancellation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{ErrorClass, NonRetryableKind, RetryableKind};
use thiserror::Error;

/// Why a retried operation gave up
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    #[error("operation failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made, equal to the policy's `max_attempts`
        attempts: u32,
        /// Class of the last failure
        kind: RetryableKind,
        /// Last failure observed
        last: E,
    },
    /// A non-retryable error ended the operation
    #[error("{source}")]
    Fatal {
        /// Attempts made, including the failing one
        attempts: u32,
        /// Class of the failure
        kind: NonRetryableKind,
        /// The failure, surfaced as-is
        source: E,
    },
    /// The caller cancelled before the operation finished
    #[error("operation cancelled after {attempts} attempts")]
    Cancelled {
        /// Attempts started before cancellation
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Attempts made before giving up
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Fatal { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// Class of the failure that ended the operation, `None` if cancelled
    #[must_use]
    pub const fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Exhausted { kind, .. } => Some(ErrorClass::Retryable(*kind)),
            Self::Fatal { kind, .. } => Some(ErrorClass::NonRetryable(*kind)),
            Self::Cancelled { .. } => None,
        }
    }

    /// Whether the caller cancelled the operation
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Last underlying failure, if any attempt completed
    #[must_use]
    pub const fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Fatal { source, .. } => Some(source),
            Self::Cancelled { .. } => None,
        }
    }

    /// Consume and return the last underlying failure
    pub fn into_last_error(self) -> Option<E> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Fatal { source, .. } => Some(source),
            Self::Cancelled { .. } => None,
        }
    }
}
