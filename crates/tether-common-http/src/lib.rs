// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for tether.
//!
//! This crate provides:
//! - A pre-configured HTTP client with a consistent User-Agent and timeout
//! - [`HttpError`], the one error shape every remote call is normalized into
//! - Retry logic with exponential backoff, `Retry-After` support and
//!   cancellation
//! - Rate-limit header parsing and proactive pacing

mod client;
mod error;
mod rate_limit;
mod retry;

pub use client::{
	builder, builder_with_user_agent, new_client, new_client_with_timeout, read_json, send,
	user_agent, DEFAULT_TIMEOUT,
};
pub use error::{is_retryable_status, Cancelled, HttpError, TransportKind};
pub use rate_limit::{
	pacing_delay, parse_rate_limit_headers, parse_rate_limit_headers_at, should_slow_down,
	wait_if_approaching_limit, RateLimitInfo, DEFAULT_SLOW_DOWN_THRESHOLD,
};
pub use retry::{
	parse_retry_after, parse_retry_after_at, retry, retry_with_cancel, RetryConfig, RetryableError,
};
