// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared handler state and its construction from [`ServerConfig`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tether_integrations_core::IntegrationKind;
use tether_server_config::{OAuthConfig, ServerConfig, SyncConfig};
use tether_server_db::{
	ExternalDataRepository, IntegrationRepository, IntegrationStore, IssueRepository, SqlitePool,
};
use tether_server_github_app::{GithubAppClient, GithubAppConfig, InstallationTokenCache};
use tether_server_linking::{BroadcastEventBus, Linker};
use tether_server_oauth::{OAuthKindSettings, OAuthRegistry, OAuthStateStore};
use tether_server_sync::{CredentialResolver, SyncOptions, Synchronizer};
use tether_server_webhooks::WebhookDispatcher;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub integrations: Arc<dyn IntegrationStore>,
	pub sync: Arc<Synchronizer>,
	pub dispatcher: WebhookDispatcher,
	pub oauth: Arc<OAuthRegistry>,
	pub oauth_states: Arc<OAuthStateStore>,
	pub events: BroadcastEventBus,
	pub webhooks_enabled: bool,
	/// Where users install the GitHub App; `None` when no app is set up.
	pub app_install_url: Option<String>,
}

impl AppState {
	/// Wire repositories, the synchronizer and the dispatcher around the
	/// given clients.
	pub fn new(
		pool: SqlitePool,
		github: GithubAppClient,
		oauth: OAuthRegistry,
		options: SyncOptions,
	) -> Self {
		let integrations: Arc<dyn IntegrationStore> = Arc::new(IntegrationRepository::new(pool.clone()));
		let external = Arc::new(ExternalDataRepository::new(pool.clone()));
		let issues = Arc::new(IssueRepository::new(pool.clone()));
		let events = BroadcastEventBus::default();
		let oauth = Arc::new(oauth);

		let credentials = CredentialResolver::new(github.clone(), oauth.clone(), integrations.clone());
		let sync = Arc::new(
			Synchronizer::new(integrations.clone(), external.clone(), credentials, github.clone())
				.with_options(options),
		);
		let linker = Linker::new(issues, external, Arc::new(events.clone()));
		let dispatcher = WebhookDispatcher::new(sync.clone(), linker, integrations.clone());

		Self {
			pool,
			integrations,
			sync,
			dispatcher,
			oauth,
			oauth_states: Arc::new(OAuthStateStore::default()),
			events,
			webhooks_enabled: github.config().webhook_secret().is_some(),
			app_install_url: github
				.config()
				.is_configured()
				.then(|| github.installation_url()),
		}
	}
}

/// Build the application state from configuration. Retries on outbound
/// calls abort once `cancel` fires.
pub fn build_state(
	config: &ServerConfig,
	pool: SqlitePool,
	cancel: CancellationToken,
) -> Result<AppState, ServerError> {
	let http_client = tether_common_http::new_client_with_timeout(config.sync.request_timeout())
		.map_err(|e| ServerError::Internal(format!("Failed to create HTTP client: {e}")))?;

	let github = GithubAppClient::new(github_app_config(config), InstallationTokenCache::new())
		.map_err(|e| ServerError::Internal(e.to_string()))?
		.with_http_client(http_client.clone())
		.with_cancellation(cancel);

	let oauth = OAuthRegistry::new(
		&oauth_settings(&config.oauth),
		Some(&config.http.base_url),
		http_client,
	)
	.with_retry_config(config.sync.retry_config());

	Ok(AppState::new(pool, github, oauth, sync_options(&config.sync)))
}

fn github_app_config(config: &ServerConfig) -> GithubAppConfig {
	let app_config = match &config.github_app {
		Some(app) => {
			let mut app_config = GithubAppConfig::new(app.app_id(), app.private_key_pem())
				.with_base_url(app.base_url())
				.with_app_slug(app.app_slug());
			if let Some(secret) = app.webhook_secret() {
				app_config = app_config.with_webhook_secret(secret);
			}
			app_config
		}
		None => {
			warn!("GitHub App not configured; webhooks will be rejected and installations cannot sync");
			GithubAppConfig::new(0, "")
		}
	};

	app_config
		.with_retry_config(config.sync.retry_config())
		.with_slow_down_threshold(config.sync.slow_down_threshold)
}

/// Configuration keys OAuth settings by kind name; unknown names are skipped.
fn oauth_settings(config: &OAuthConfig) -> BTreeMap<IntegrationKind, OAuthKindSettings> {
	let mut settings = BTreeMap::new();
	for (name, provider) in &config.providers {
		let Ok(kind) = name.parse::<IntegrationKind>() else {
			warn!(kind = %name, "Ignoring OAuth settings for unknown integration kind");
			continue;
		};
		settings.insert(
			kind,
			OAuthKindSettings {
				client_id: provider.client_id.clone(),
				client_secret: provider.client_secret.clone(),
				redirect_uri: provider.redirect_uri.clone(),
				authorize_url: provider.authorize_url.clone(),
				token_url: provider.token_url.clone(),
				scopes: provider.scopes.clone(),
			},
		);
	}
	settings
}

fn sync_options(config: &SyncConfig) -> SyncOptions {
	SyncOptions {
		per_page: config.per_page,
		max_pages: config.max_pages,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tether_common_config::SecretString;
	use tether_server_config::OAuthProviderConfig;

	#[test]
	fn oauth_settings_are_keyed_by_kind() {
		let mut config = OAuthConfig::default();
		config.providers.insert(
			"gitlab".to_string(),
			OAuthProviderConfig {
				client_id: Some("gl-id".to_string()),
				client_secret: Some(SecretString::from("gl-secret")),
				..OAuthProviderConfig::default()
			},
		);
		config
			.providers
			.insert("bitbucket".to_string(), OAuthProviderConfig::default());

		let settings = oauth_settings(&config);
		assert_eq!(settings.len(), 1);
		let gitlab = &settings[&IntegrationKind::Gitlab];
		assert_eq!(gitlab.client_id.as_deref(), Some("gl-id"));
	}

	#[tokio::test]
	async fn state_builds_from_default_config() {
		let pool = tether_server_db::create_pool("sqlite::memory:").await.unwrap();
		let state = build_state(&ServerConfig::default(), pool, CancellationToken::new()).unwrap();
		assert!(!state.webhooks_enabled);
		assert!(state.app_install_url.is_none());
		assert!(state.oauth.config_for(IntegrationKind::Github).is_ok());
	}
}
