// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use tether_server_db::DbError;
use tether_server_linking::LinkError;
use tether_server_sync::SyncError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebhookError>;

#[derive(Error, Debug)]
pub enum WebhookError {
	#[error("missing webhook signature")]
	MissingSignature,

	#[error("invalid webhook signature")]
	InvalidSignature,

	#[error("invalid webhook payload: {0}")]
	InvalidPayload(#[from] serde_json::Error),

	#[error("sync error: {0}")]
	Sync(#[from] SyncError),

	#[error("link error: {0}")]
	Link(#[from] LinkError),

	#[error("db error: {0}")]
	Db(#[from] DbError),
}

impl WebhookError {
	/// Whether the delivery was rejected before anything was read from it.
	pub fn is_authenticity_failure(&self) -> bool {
		matches!(
			self,
			WebhookError::MissingSignature | WebhookError::InvalidSignature
		)
	}
}
