// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Error types for GitHub App client.

use std::time::Duration;

use tether_common_http::{is_retryable_status, Cancelled, HttpError, RetryableError};
use thiserror::Error;

/// Errors that can occur when interacting with the GitHub App API.
#[derive(Debug, Error)]
pub enum GithubAppError {
	/// Transport or undecodable response.
	#[error(transparent)]
	Http(#[from] HttpError),

	/// Invalid token, assertion or app configuration.
	#[error("Unauthorized or invalid app configuration")]
	Unauthorized,

	#[error("Forbidden or insufficient permissions")]
	Forbidden,

	#[error("Rate limit exceeded")]
	RateLimited { retry_after: Option<Duration> },

	/// GitHub API returned an error.
	#[error("GitHub API error: {status} - {message}")]
	ApiError { status: u16, message: String },

	#[error("Invalid response from GitHub: {0}")]
	InvalidResponse(String),

	#[error("Configuration error: {0}")]
	Config(String),

	/// The configured private key could not be parsed.
	#[error("Invalid private key: {0}")]
	KeyParse(String),

	#[error("Failed to sign app assertion: {0}")]
	Signing(String),

	#[error("Invalid webhook signature")]
	InvalidWebhookSignature,
}

impl RetryableError for GithubAppError {
	fn is_retryable(&self) -> bool {
		match self {
			GithubAppError::Http(e) => e.is_retryable(),
			GithubAppError::RateLimited { .. } => true,
			GithubAppError::ApiError { status, .. } => is_retryable_status(*status),
			_ => false,
		}
	}

	fn retry_after(&self) -> Option<Duration> {
		match self {
			GithubAppError::Http(e) => e.retry_after(),
			GithubAppError::RateLimited { retry_after } => *retry_after,
			_ => None,
		}
	}
}

impl From<Cancelled> for GithubAppError {
	fn from(cancelled: Cancelled) -> Self {
		GithubAppError::Http(cancelled.into())
	}
}

impl GithubAppError {
	pub fn api_error(status: u16, message: impl Into<String>) -> Self {
		Self::ApiError {
			status,
			message: message.into(),
		}
	}

	/// HTTP status behind this error, when there is one.
	pub fn status(&self) -> Option<u16> {
		match self {
			GithubAppError::Http(e) => e.status(),
			GithubAppError::Unauthorized => Some(401),
			GithubAppError::Forbidden => Some(403),
			GithubAppError::RateLimited { .. } => Some(429),
			GithubAppError::ApiError { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Map a non-success GitHub response to an error.
///
/// GitHub reports secondary rate limits as 403 with a "rate limit" message,
/// so those become [`GithubAppError::RateLimited`] as well.
pub(crate) fn map_github_error(
	status: u16,
	body: &str,
	retry_after: Option<Duration>,
) -> GithubAppError {
	match status {
		401 => GithubAppError::Unauthorized,
		403 if body.to_ascii_lowercase().contains("rate limit") => {
			GithubAppError::RateLimited { retry_after }
		}
		403 => GithubAppError::Forbidden,
		429 => GithubAppError::RateLimited { retry_after },
		_ => GithubAppError::api_error(status, body),
	}
}

/// Route a non-success [`HttpError`] through [`map_github_error`]; transport
/// and decode failures pass through unchanged.
pub(crate) fn from_http_error(err: HttpError) -> GithubAppError {
	match err {
		HttpError::Status {
			status,
			body,
			retry_after,
		} => map_github_error(status, &body, retry_after),
		other => GithubAppError::Http(other),
	}
}
