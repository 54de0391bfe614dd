// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App client: signed assertions, installation tokens and
//! installation revocation.

use std::future::Future;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use tether_common_config::SecretString;
use tether_common_http::{read_json, retry, send, RetryConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use crate::cache::{CachedInstallationToken, InstallationTokenCache};
use crate::config::GithubAppConfig;
use crate::error::{from_http_error, GithubAppError};
use crate::jwt::generate_signed_assertion;
use crate::types::AccessTokenResponse;
use crate::webhook;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Client for the GitHub App API.
///
/// Installation tokens live in the injected [`InstallationTokenCache`];
/// clones of the client share it.
#[derive(Clone)]
pub struct GithubAppClient {
	http_client: Client,
	config: GithubAppConfig,
	token_cache: InstallationTokenCache,
	cancel: Option<CancellationToken>,
}

impl GithubAppClient {
	pub fn new(
		config: GithubAppConfig,
		token_cache: InstallationTokenCache,
	) -> Result<Self, GithubAppError> {
		let http_client = tether_common_http::new_client()
			.map_err(|e| GithubAppError::Config(format!("Failed to create HTTP client: {e}")))?;

		info!(
			app_id = config.app_id(),
			base_url = %config.base_url(),
			"Created GitHub App client"
		);

		Ok(Self {
			http_client,
			config,
			token_cache,
			cancel: None,
		})
	}

	/// Abort listing retries as soon as `token` fires.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancel = Some(token);
		self
	}

	/// Use `client` for every request, e.g. one built with a request timeout.
	pub fn with_http_client(mut self, client: Client) -> Self {
		self.http_client = client;
		self
	}

	pub fn config(&self) -> &GithubAppConfig {
		&self.config
	}

	pub fn retry_config(&self) -> &RetryConfig {
		&self.config.retry_config
	}

	pub fn token_cache(&self) -> &InstallationTokenCache {
		&self.token_cache
	}

	/// URL users visit to install the app.
	pub fn installation_url(&self) -> String {
		self.config.installation_url()
	}

	pub(crate) fn api_url(&self, path: &str) -> Result<Url, GithubAppError> {
		self
			.config
			.base_url()
			.join(path)
			.map_err(|e| GithubAppError::Config(format!("Invalid URL: {e}")))
	}

	/// Attach bearer auth and the GitHub API headers.
	pub(crate) fn authorized(&self, request: RequestBuilder, bearer: &str) -> RequestBuilder {
		request
			.header("Authorization", format!("Bearer {bearer}"))
			.header("Accept", GITHUB_ACCEPT)
			.header("X-GitHub-Api-Version", GITHUB_API_VERSION)
	}

	pub(crate) fn http_client(&self) -> &Client {
		&self.http_client
	}

	pub(crate) fn cancellation(&self) -> Option<&CancellationToken> {
		self.cancel.as_ref()
	}

	/// Get an installation token, reusing the cached one while it has more
	/// than five minutes left.
	///
	/// Concurrent callers for the same installation wait on one fetch.
	#[instrument(skip(self))]
	pub async fn get_installation_token(
		&self,
		installation_id: i64,
	) -> Result<SecretString, GithubAppError> {
		if let Some(token) = self.token_cache.get_valid(installation_id, Utc::now()).await {
			trace!(installation_id, "Using cached installation token");
			return Ok(token);
		}

		let lock = self.token_cache.lock_for(installation_id).await;
		let _guard = lock.lock().await;

		if let Some(token) = self.token_cache.get_valid(installation_id, Utc::now()).await {
			trace!(installation_id, "Using cached installation token (post-lock)");
			return Ok(token);
		}

		debug!(installation_id, "Fetching new installation token");
		let fetched = retry(&self.config.retry_config, || {
			self.fetch_installation_token(installation_id)
		})
		.await?;

		let token = fetched.token.clone();
		self.token_cache.insert(installation_id, fetched).await;

		info!(installation_id, "Installation token refreshed");
		Ok(token)
	}

	async fn fetch_installation_token(
		&self,
		installation_id: i64,
	) -> Result<CachedInstallationToken, GithubAppError> {
		let assertion = generate_signed_assertion(self.config.app_id(), self.config.private_key_pem())?;
		let url = self.api_url(&format!("app/installations/{installation_id}/access_tokens"))?;

		let request = self.authorized(self.http_client.post(url), &assertion);
		let response = send(request).await.map_err(from_http_error)?;

		let body: AccessTokenResponse = read_json(response).await?;
		let expires_at = DateTime::parse_from_rfc3339(&body.expires_at)
			.map_err(|e| {
				GithubAppError::InvalidResponse(format!(
					"Invalid expires_at '{}': {e}",
					body.expires_at
				))
			})?
			.with_timezone(&Utc);

		Ok(CachedInstallationToken::new(body.token, expires_at))
	}

	/// Run `f` with an installation token. If `f` fails with
	/// [`GithubAppError::Unauthorized`], the cached token is dropped and `f`
	/// runs once more with a fresh one.
	pub async fn execute_with_installation_token<F, Fut, T>(
		&self,
		installation_id: i64,
		mut f: F,
	) -> Result<T, GithubAppError>
	where
		F: FnMut(SecretString) -> Fut,
		Fut: Future<Output = Result<T, GithubAppError>>,
	{
		let token = self.get_installation_token(installation_id).await?;

		match f(token).await {
			Err(GithubAppError::Unauthorized) => {
				info!(installation_id, "Got 401, refreshing installation token");
				self.token_cache.invalidate(installation_id).await;
				let fresh = self.get_installation_token(installation_id).await?;
				f(fresh).await
			}
			other => other,
		}
	}

	/// Revoke an installation and evict its cached token. An installation
	/// that is already gone (404) counts as revoked.
	#[instrument(skip(self))]
	pub async fn delete_installation(&self, installation_id: i64) -> Result<(), GithubAppError> {
		let result = retry(&self.config.retry_config, || {
			self.delete_installation_once(installation_id)
		})
		.await;

		match result {
			Ok(()) => {}
			Err(GithubAppError::ApiError { status: 404, .. }) => {
				info!(installation_id, "Installation already deleted");
			}
			Err(e) => return Err(e),
		}

		self.token_cache.invalidate(installation_id).await;
		Ok(())
	}

	async fn delete_installation_once(&self, installation_id: i64) -> Result<(), GithubAppError> {
		let assertion = generate_signed_assertion(self.config.app_id(), self.config.private_key_pem())?;
		let url = self.api_url(&format!("app/installations/{installation_id}"))?;

		let request = self.authorized(self.http_client.delete(url), &assertion);
		send(request)
			.await
			.map(|_| ())
			.map_err(from_http_error)
	}

	/// Check a webhook payload against the configured secret. Without a
	/// configured secret nothing verifies.
	pub fn verify_webhook_signature(&self, payload: &[u8], signature_header: &str) -> bool {
		let Some(secret) = self.config.webhook_secret() else {
			warn!("No webhook secret configured, rejecting webhook");
			return false;
		};
		webhook::verify_webhook_signature(secret, signature_header, payload).is_ok()
	}
}
