// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use tether_integrations_core::IntegrationKind;
use tether_server_db::DbError;
use tether_server_github_app::GithubAppError;
use tether_server_oauth::OAuthError;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
	#[error("integration not found: {0}")]
	IntegrationNotFound(Uuid),

	#[error("integration is inactive: {0}")]
	Inactive(Uuid),

	#[error("integration {id} is of kind {kind}, which has nothing to sync")]
	UnsupportedKind { id: Uuid, kind: IntegrationKind },

	#[error("integration {0} has no stored access token")]
	MissingCredentials(Uuid),

	#[error("github error: {0}")]
	Github(#[from] GithubAppError),

	#[error("oauth error: {0}")]
	OAuth(#[from] OAuthError),

	#[error("db error: {0}")]
	Db(#[from] DbError),

	#[error("invalid payload: {0}")]
	InvalidPayload(#[from] serde_json::Error),
}
