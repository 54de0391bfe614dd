// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! OAuth connect flow, GitHub App install redirect, repository project
//! mappings and manual sync trigger.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Redirect},
	Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_integrations_core::{ExternalType, HealthStatus, Integration, IntegrationKind};
use uuid::Uuid;

use crate::{error::ServerError, state::AppState};

fn parse_kind(raw: &str) -> Result<IntegrationKind, ServerError> {
	raw
		.parse()
		.map_err(|_| ServerError::NotFound(format!("Unknown integration kind: {raw}")))
}

/// GET /api/integrations/{kind}/authorize
///
/// Redirects to the provider's consent page with a fresh `state`.
pub async fn authorize(
	State(state): State<AppState>,
	Path(kind): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
	let kind = parse_kind(&kind)?;
	let oauth_state = state.oauth_states.issue(kind).await;

	match state.oauth.build_authorize_url(kind, &oauth_state) {
		Ok(url) => {
			tracing::info!(kind = %kind, "oauth_authorize: redirecting to provider");
			Ok(Redirect::to(&url))
		}
		Err(e) => {
			state.oauth_states.consume(&oauth_state, kind).await;
			Err(e.into())
		}
	}
}

/// GET /api/integrations/github/install
///
/// Redirects to the GitHub App installation page. Installing the app sends an
/// `installation` webhook that creates the integration.
pub async fn install(
	State(state): State<AppState>,
	Path(kind): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
	let kind = parse_kind(&kind)?;
	if kind != IntegrationKind::Github {
		return Err(ServerError::BadRequest(format!(
			"{kind} has no app to install"
		)));
	}
	let url = state.app_install_url.as_deref().ok_or_else(|| {
		ServerError::ServiceUnavailable("GitHub App is not configured".to_string())
	})?;

	tracing::info!("app_install: redirecting to GitHub");
	Ok(Redirect::to(url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
	pub code: Option<String>,
	pub state: Option<String>,
	pub error: Option<String>,
	pub error_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntegrationResponse {
	pub id: Uuid,
	pub kind: IntegrationKind,
	pub is_active: bool,
	pub health: HealthStatus,
	pub token_expires_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
}

impl From<&Integration> for IntegrationResponse {
	fn from(integration: &Integration) -> Self {
		Self {
			id: integration.id,
			kind: integration.kind,
			is_active: integration.is_active,
			health: integration.health,
			token_expires_at: integration.token_expires_at,
			created_at: integration.created_at,
		}
	}
}

/// GET /api/integrations/{kind}/callback
///
/// Validates `state`, exchanges the code and stores a new integration holding
/// the tokens.
pub async fn callback(
	State(state): State<AppState>,
	Path(kind): Path<String>,
	Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, ServerError> {
	let kind = parse_kind(&kind)?;

	if let Some(error) = params.error {
		tracing::warn!(kind = %kind, error = %error, "oauth_callback: provider returned an error");
		let message = params.error_description.unwrap_or(error);
		return Err(ServerError::BadRequest(format!("Authorization failed: {message}")));
	}

	let (Some(code), Some(oauth_state)) = (params.code, params.state) else {
		return Err(ServerError::BadRequest(
			"Missing code or state parameter".to_string(),
		));
	};

	if !state.oauth_states.consume(&oauth_state, kind).await {
		tracing::warn!(kind = %kind, "oauth_callback: unknown or expired state");
		return Err(ServerError::BadRequest("Invalid or expired state".to_string()));
	}

	let tokens = state.oauth.exchange_code_for_tokens(kind, &code).await?;

	let mut integration = Integration::new(kind);
	integration.token_expires_at = tokens.expires_at(Utc::now());
	integration.access_token = Some(tokens.access_token);
	integration.refresh_token = tokens.refresh_token;
	state.integrations.create_integration(&integration).await?;

	tracing::info!(kind = %kind, integration_id = %integration.id, "oauth_callback: integration created");

	Ok((
		StatusCode::CREATED,
		Json(IntegrationResponse::from(&integration)),
	))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
	pub integration_id: Uuid,
	pub repositories: usize,
	pub issues: usize,
	pub pull_requests: usize,
	pub commits: usize,
	pub skipped: usize,
	pub failed: usize,
	pub health: HealthStatus,
}

/// POST /api/integrations/{id}/sync
pub async fn trigger_sync(
	State(state): State<AppState>,
	Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServerError> {
	tracing::info!(integration_id = %id, "trigger_sync: manual sync requested");
	let report = state.sync.sync_integration(id).await?;

	Ok(Json(SyncResponse {
		integration_id: id,
		repositories: report.count(ExternalType::Repository),
		issues: report.count(ExternalType::Issue),
		pull_requests: report.count(ExternalType::PullRequest),
		commits: report.count(ExternalType::Commit),
		skipped: report.skipped,
		failed: report.failed,
		health: report.health(),
	}))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetProjectRequest {
	pub project_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepositoryProjectResponse {
	pub integration_id: Uuid,
	pub repository: String,
	pub project_key: String,
}

/// Load an integration whose repositories can be mapped to projects.
async fn syncable_integration(state: &AppState, id: Uuid) -> Result<Integration, ServerError> {
	let integration = state
		.integrations
		.get_integration(id)
		.await?
		.ok_or_else(|| ServerError::NotFound(format!("Integration not found: {id}")))?;
	if !integration.kind.supports_sync() {
		return Err(ServerError::BadRequest(format!(
			"{} integrations have no repositories",
			integration.kind
		)));
	}
	Ok(integration)
}

/// PUT /api/integrations/{id}/repositories/{owner}/{name}/project
///
/// Map a repository to the project whose issues `#NUMBER` references in it
/// may close.
pub async fn set_repository_project(
	State(state): State<AppState>,
	Path((id, owner, name)): Path<(Uuid, String, String)>,
	Json(request): Json<SetProjectRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let project_key = request.project_key.trim();
	if project_key.is_empty() {
		return Err(ServerError::BadRequest("project_key must not be empty".to_string()));
	}

	let integration = syncable_integration(&state, id).await?;
	let repository = format!("{owner}/{name}");
	state
		.integrations
		.set_repository_project(integration.id, &repository, Some(project_key))
		.await?;

	tracing::info!(
		integration_id = %id,
		repository = %repository,
		project_key = %project_key,
		"repository_project: mapped"
	);

	Ok(Json(RepositoryProjectResponse {
		integration_id: id,
		repository,
		project_key: project_key.to_string(),
	}))
}

/// DELETE /api/integrations/{id}/repositories/{owner}/{name}/project
pub async fn clear_repository_project(
	State(state): State<AppState>,
	Path((id, owner, name)): Path<(Uuid, String, String)>,
) -> Result<impl IntoResponse, ServerError> {
	let integration = syncable_integration(&state, id).await?;
	let repository = format!("{owner}/{name}");
	state
		.integrations
		.set_repository_project(integration.id, &repository, None)
		.await?;

	tracing::info!(integration_id = %id, repository = %repository, "repository_project: cleared");
	Ok(StatusCode::NO_CONTENT)
}
