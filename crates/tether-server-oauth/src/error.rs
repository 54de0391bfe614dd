// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use tether_common_http::{is_retryable_status, HttpError, RetryableError};
use tether_integrations_core::IntegrationKind;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
	#[error("integration kind {0} does not support OAuth; it is configured with an API key")]
	Unsupported(IntegrationKind),

	#[error("OAuth for {kind} is not configured: missing {field}")]
	NotConfigured {
		kind: IntegrationKind,
		field: &'static str,
	},

	#[error("token endpoint returned HTTP {status}: {body}")]
	TokenEndpoint { status: u16, body: String },

	#[error("provider rejected the request: {0}")]
	Provider(String),

	#[error("invalid OAuth URL: {0}")]
	InvalidUrl(String),

	#[error("failed to parse token response: {0}")]
	Parse(String),

	#[error(transparent)]
	Http(#[from] HttpError),
}

impl RetryableError for OAuthError {
	fn is_retryable(&self) -> bool {
		match self {
			OAuthError::TokenEndpoint { status, .. } => is_retryable_status(*status),
			OAuthError::Http(e) => e.is_retryable(),
			_ => false,
		}
	}

	fn retry_after(&self) -> Option<Duration> {
		match self {
			OAuthError::Http(e) => e.retry_after(),
			_ => None,
		}
	}
}
