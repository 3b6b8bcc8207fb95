// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for burrow.
//!
//! - A pre-configured client carrying the `burrow/<version>` User-Agent
//! - HTTPS enforcement for collaborator URLs
//! - Retry with exponential backoff for transient failures

mod client;
mod retry;

pub use client::{builder, new_client, new_client_with_timeout, require_https, user_agent, InsecureUrl};
pub use retry::{is_retryable_status, retry, RetryConfig, RetryableError};
