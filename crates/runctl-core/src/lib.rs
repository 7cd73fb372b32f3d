// ABOUTME: Core types and constants for the runctl API resilience layer
// ABOUTME: Foundation crate with error handling, failure classification, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # runctl Core
//!
//! Foundation crate shared by the resilience layer. It changes rarely, so the
//! main crate gets incremental compilation benefits.
//!
//! ## Modules
//!
//! - **errors**: `AppError` / `ErrorCode`, the typed wellness `ApiError`, and the
//!   retryable / non-retryable `ErrorClass` taxonomy
//! - **constants**: default values for caching, rate limiting, and retries

/// Unified error handling and failure classification
pub mod errors;

/// Default values organized by domain
pub mod constants;
