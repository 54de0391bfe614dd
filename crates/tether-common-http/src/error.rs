// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Normalized error for remote HTTP calls.
//!
//! Every remote call made by tether ends in either a response with a status
//! code or a transport failure. [`HttpError`] carries exactly that, so retry
//! classification reads one field instead of probing error shapes.

use std::error::Error as _;
use std::io;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::Response;
use thiserror::Error;

use crate::retry::{parse_retry_after, RetryableError};

const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// True for the status codes the retry executor treats as transient.
pub fn is_retryable_status(status: u16) -> bool {
	RETRYABLE_STATUSES.contains(&status)
}

/// Network-level failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
	Timeout,
	Connect,
	Reset,
	Other,
}

/// Marker returned when a cancellation token fires during a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

#[derive(Debug, Error)]
pub enum HttpError {
	#[error("HTTP {status}: {body}")]
	Status {
		status: u16,
		body: String,
		retry_after: Option<Duration>,
	},

	#[error("transport error ({kind:?}): {message}")]
	Transport { kind: TransportKind, message: String },

	#[error("failed to decode response: {0}")]
	Decode(String),

	#[error("operation cancelled")]
	Cancelled,
}

impl HttpError {
	/// Build a status error from a non-2xx response, consuming its body.
	pub async fn from_response(response: Response) -> Self {
		let status = response.status().as_u16();
		let retry_after = response
			.headers()
			.get(RETRY_AFTER)
			.and_then(|v| v.to_str().ok())
			.and_then(parse_retry_after);
		let body = response.text().await.unwrap_or_default();

		HttpError::Status {
			status,
			body,
			retry_after,
		}
	}

	pub fn status(&self) -> Option<u16> {
		match self {
			HttpError::Status { status, .. } => Some(*status),
			_ => None,
		}
	}
}

impl From<Cancelled> for HttpError {
	fn from(_: Cancelled) -> Self {
		HttpError::Cancelled
	}
}

impl From<reqwest::Error> for HttpError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_decode() {
			return HttpError::Decode(err.to_string());
		}

		if let Some(status) = err.status() {
			return HttpError::Status {
				status: status.as_u16(),
				body: err.to_string(),
				retry_after: None,
			};
		}

		let kind = if err.is_timeout() {
			TransportKind::Timeout
		} else if err.is_connect() {
			TransportKind::Connect
		} else if is_connection_reset(&err) {
			TransportKind::Reset
		} else {
			TransportKind::Other
		};

		HttpError::Transport {
			kind,
			message: err.to_string(),
		}
	}
}

fn is_connection_reset(err: &reqwest::Error) -> bool {
	let mut source = err.source();
	while let Some(cause) = source {
		if let Some(io_err) = cause.downcast_ref::<io::Error>() {
			return matches!(
				io_err.kind(),
				io::ErrorKind::ConnectionReset
					| io::ErrorKind::ConnectionAborted
					| io::ErrorKind::BrokenPipe
					| io::ErrorKind::UnexpectedEof
			);
		}
		source = cause.source();
	}
	false
}

impl RetryableError for HttpError {
	fn is_retryable(&self) -> bool {
		match self {
			HttpError::Status { status, .. } => is_retryable_status(*status),
			HttpError::Transport { kind, .. } => matches!(
				kind,
				TransportKind::Timeout | TransportKind::Connect | TransportKind::Reset
			),
			HttpError::Decode(_) | HttpError::Cancelled => false,
		}
	}

	fn retry_after(&self) -> Option<Duration> {
		match self {
			HttpError::Status { retry_after, .. } => *retry_after,
			_ => None,
		}
	}
}
