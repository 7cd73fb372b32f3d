// ABOUTME: Interface to the external wellness API client
// ABOUTME: Implementations fetch one day of raw JSON for a data kind and report typed failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::cache::DataKind;
use crate::errors::ApiError;
use chrono::NaiveDate;
use serde_json::Value;

/// Raw access to the wellness API
///
/// Authentication, HTTP transport, and endpoint layout belong to the
/// implementation. Failures must be reported as the [`ApiError`] variant
/// matching what was observed so the retry layer can classify them.
#[async_trait::async_trait]
pub trait WellnessClient: Send + Sync {
    /// Fetch the raw payload of `kind` for `subject_id` on `date`
    ///
    /// # Errors
    ///
    /// Returns the transport, throttling, auth, or data failure observed
    async fn fetch(
        &self,
        kind: DataKind,
        subject_id: &str,
        date: NaiveDate,
    ) -> Result<Value, ApiError>;
}
