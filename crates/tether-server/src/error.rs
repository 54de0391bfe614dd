// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use tether_server_db::DbError;
use tether_server_oauth::OAuthError;
use tether_server_sync::SyncError;
use tether_server_webhooks::WebhookError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Database error: {0}")]
	Db(#[from] DbError),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Invalid request: {0}")]
	BadRequest(String),

	/// Authentication failed. The reason is logged, never returned.
	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Upstream error: {0}")]
	UpstreamError(String),

	#[error("Service unavailable: {0}")]
	ServiceUnavailable(String),

	#[error("Internal error: {0}")]
	Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	fn new(error: &str, message: impl Into<String>) -> Self {
		Self {
			error: error.to_string(),
			message: message.into(),
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, body) = match &self {
			ServerError::Db(e) => {
				tracing::error!(error = %e, "database error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse::new("database_error", "A database error occurred"),
				)
			}
			ServerError::NotFound(msg) => (
				StatusCode::NOT_FOUND,
				ErrorResponse::new("not_found", msg.clone()),
			),
			ServerError::BadRequest(msg) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse::new("bad_request", msg.clone()),
			),
			ServerError::Unauthorized(msg) => {
				tracing::warn!(reason = %msg, "unauthorized");
				(
					StatusCode::UNAUTHORIZED,
					ErrorResponse::new("unauthorized", "Unauthorized"),
				)
			}
			ServerError::Conflict(msg) => (
				StatusCode::CONFLICT,
				ErrorResponse::new("conflict", msg.clone()),
			),
			ServerError::UpstreamError(msg) => {
				tracing::warn!(error = %msg, "upstream error");
				(
					StatusCode::BAD_GATEWAY,
					ErrorResponse::new("upstream_error", msg.clone()),
				)
			}
			ServerError::ServiceUnavailable(msg) => {
				tracing::warn!(error = %msg, "service unavailable");
				(
					StatusCode::SERVICE_UNAVAILABLE,
					ErrorResponse::new("service_unavailable", msg.clone()),
				)
			}
			ServerError::Internal(msg) => {
				tracing::error!(error = %msg, "internal error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse::new("internal_error", "An internal error occurred"),
				)
			}
		};

		(status, Json(body)).into_response()
	}
}

impl From<OAuthError> for ServerError {
	fn from(e: OAuthError) -> Self {
		match e {
			OAuthError::Unsupported(_) => ServerError::BadRequest(e.to_string()),
			OAuthError::NotConfigured { .. } => ServerError::ServiceUnavailable(e.to_string()),
			OAuthError::InvalidUrl(_) => ServerError::Internal(e.to_string()),
			OAuthError::TokenEndpoint { .. }
			| OAuthError::Provider(_)
			| OAuthError::Parse(_)
			| OAuthError::Http(_) => ServerError::UpstreamError(e.to_string()),
		}
	}
}

impl From<SyncError> for ServerError {
	fn from(e: SyncError) -> Self {
		match e {
			SyncError::IntegrationNotFound(id) => ServerError::NotFound(format!("Integration not found: {id}")),
			SyncError::Inactive(_) => ServerError::Conflict(e.to_string()),
			SyncError::MissingCredentials(_) | SyncError::UnsupportedKind { .. } => {
				ServerError::BadRequest(e.to_string())
			}
			SyncError::Db(db) => ServerError::Db(db),
			SyncError::OAuth(oauth) => oauth.into(),
			SyncError::Github(_) | SyncError::InvalidPayload(_) => {
				ServerError::UpstreamError(e.to_string())
			}
		}
	}
}

impl From<WebhookError> for ServerError {
	fn from(e: WebhookError) -> Self {
		match e {
			WebhookError::MissingSignature | WebhookError::InvalidSignature => {
				ServerError::Unauthorized(e.to_string())
			}
			WebhookError::InvalidPayload(_) => ServerError::BadRequest(e.to_string()),
			WebhookError::Sync(sync) => sync.into(),
			WebhookError::Db(db) => ServerError::Db(db),
			WebhookError::Link(_) => ServerError::Internal(e.to_string()),
		}
	}
}
