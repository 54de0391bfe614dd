// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Credential resolution for both auth models.

use std::sync::Arc;

use chrono::Utc;
use tether_common_config::SecretString;
use tether_integrations_core::{AuthModel, Integration};
use tether_server_db::IntegrationStore;
use tether_server_github_app::GithubAppClient;
use tether_server_oauth::OAuthRegistry;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};

/// Stored OAuth tokens are refreshed when they expire within this window.
pub const OAUTH_REFRESH_BUFFER: chrono::Duration = chrono::Duration::minutes(5);

/// What a sync call authenticates with.
#[derive(Debug, Clone)]
pub enum Credential {
	/// App installation; the token comes from the installation-token cache on
	/// each call.
	Installation(i64),
	/// Per-user OAuth access token.
	Bearer(SecretString),
}

#[derive(Clone)]
pub struct CredentialResolver {
	github: GithubAppClient,
	oauth: Arc<OAuthRegistry>,
	integrations: Arc<dyn IntegrationStore>,
}

impl CredentialResolver {
	pub fn new(
		github: GithubAppClient,
		oauth: Arc<OAuthRegistry>,
		integrations: Arc<dyn IntegrationStore>,
	) -> Self {
		Self {
			github,
			oauth,
			integrations,
		}
	}

	/// Resolve a usable credential. Installation tokens are fetched up front
	/// so a broken app configuration fails here rather than per repository.
	#[instrument(skip(self, integration), fields(integration_id = %integration.id))]
	pub async fn resolve(&self, integration: &Integration) -> Result<Credential> {
		if !integration.kind.supports_sync() {
			return Err(SyncError::UnsupportedKind {
				id: integration.id,
				kind: integration.kind,
			});
		}
		match integration.auth_model() {
			AuthModel::AppInstallation(installation_id) => {
				self.github.get_installation_token(installation_id).await?;
				Ok(Credential::Installation(installation_id))
			}
			AuthModel::OAuth => self.resolve_oauth(integration).await,
		}
	}

	async fn resolve_oauth(&self, integration: &Integration) -> Result<Credential> {
		let access_token = integration
			.access_token
			.clone()
			.filter(|t| !t.is_empty())
			.ok_or(SyncError::MissingCredentials(integration.id))?;

		if !integration.token_expires_within(Utc::now(), OAUTH_REFRESH_BUFFER) {
			debug!("Using stored OAuth access token");
			return Ok(Credential::Bearer(access_token));
		}

		let Some(refresh_token) = integration.refresh_token.as_ref() else {
			warn!(
				integration_id = %integration.id,
				"OAuth access token is expiring and no refresh token is stored"
			);
			return Ok(Credential::Bearer(access_token));
		};

		let tokens = self
			.oauth
			.refresh_access_token(integration.kind, refresh_token)
			.await?;
		let expires_at = tokens.expires_at(Utc::now());

		self
			.integrations
			.update_tokens(
				integration.id,
				&tokens.access_token,
				tokens.refresh_token.as_ref(),
				expires_at,
			)
			.await?;

		info!(integration_id = %integration.id, "Refreshed OAuth access token");
		Ok(Credential::Bearer(tokens.access_token))
	}
}
