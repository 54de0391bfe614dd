// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tether_common_config::SecretString;
use tether_common_http::{retry, HttpError, RetryConfig};
use tether_integrations_core::IntegrationKind;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{provider_defaults, redirect_uri_for, OAuthKindSettings, OAuthProviderConfig};
use crate::error::OAuthError;

/// Tokens returned by a provider's token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthTokens {
	pub access_token: SecretString,
	pub refresh_token: Option<SecretString>,
	pub expires_in: Option<i64>,
	pub token_type: Option<String>,
	pub scope: Option<String>,
}

impl OAuthTokens {
	pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
		self
			.expires_in
			.map(|secs| now + chrono::Duration::seconds(secs))
	}
}

#[derive(Deserialize)]
struct TokenResponseBody {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	scope: Option<String>,
}

/// OAuth provider configuration for every kind, plus the token-endpoint
/// client.
#[derive(Debug, Clone)]
pub struct OAuthRegistry {
	providers: HashMap<IntegrationKind, OAuthProviderConfig>,
	http_client: reqwest::Client,
	retry_config: RetryConfig,
}

impl OAuthRegistry {
	/// Build configuration for every OAuth-capable kind. Kinds with missing
	/// client credentials are kept (with empty strings) and logged.
	#[instrument(skip_all, name = "OAuthRegistry::new")]
	pub fn new(
		settings: &BTreeMap<IntegrationKind, OAuthKindSettings>,
		public_base_url: Option<&str>,
		http_client: reqwest::Client,
	) -> Self {
		let empty = OAuthKindSettings::default();
		let mut providers = HashMap::new();

		for kind in IntegrationKind::ALL {
			let Some(defaults) = provider_defaults(kind) else {
				continue;
			};
			let kind_settings = settings.get(&kind).unwrap_or(&empty);

			let client_id = kind_settings.client_id.clone().unwrap_or_default();
			let client_secret = kind_settings
				.client_secret
				.clone()
				.unwrap_or_else(|| SecretString::from(""));

			if client_id.is_empty() || client_secret.is_empty() {
				warn!(kind = %kind, "OAuth client credentials not configured; flow will fail until set");
			}

			let config = OAuthProviderConfig {
				kind,
				client_id,
				client_secret,
				authorize_url: kind_settings
					.authorize_url
					.clone()
					.unwrap_or_else(|| defaults.authorize_url.to_string()),
				token_url: kind_settings
					.token_url
					.clone()
					.unwrap_or_else(|| defaults.token_url.to_string()),
				scopes: kind_settings
					.scopes
					.clone()
					.unwrap_or_else(|| defaults.scopes.iter().map(|s| s.to_string()).collect()),
				redirect_uri: redirect_uri_for(
					kind,
					kind_settings.redirect_uri.as_deref(),
					public_base_url,
				),
				extra_authorize_params: defaults.extra_authorize_params.to_vec(),
			};
			providers.insert(kind, config);
		}

		Self {
			providers,
			http_client,
			retry_config: RetryConfig::default(),
		}
	}

	pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
		self.retry_config = retry_config;
		self
	}

	/// Static configuration for a kind. Fails for kinds without OAuth.
	pub fn config_for(&self, kind: IntegrationKind) -> Result<&OAuthProviderConfig, OAuthError> {
		self
			.providers
			.get(&kind)
			.ok_or(OAuthError::Unsupported(kind))
	}

	/// Configuration for a kind whose flow is about to start: every required
	/// field must be present.
	fn ready_config(&self, kind: IntegrationKind) -> Result<&OAuthProviderConfig, OAuthError> {
		let config = self.config_for(kind)?;
		if let Some(field) = config.missing_field() {
			return Err(OAuthError::NotConfigured { kind, field });
		}
		Ok(config)
	}

	#[instrument(skip(self, state))]
	pub fn build_authorize_url(&self, kind: IntegrationKind, state: &str) -> Result<String, OAuthError> {
		let config = self.ready_config(kind)?;
		let mut url =
			Url::parse(&config.authorize_url).map_err(|e| OAuthError::InvalidUrl(e.to_string()))?;

		{
			let mut query = url.query_pairs_mut();
			query
				.append_pair("client_id", &config.client_id)
				.append_pair("redirect_uri", &config.redirect_uri)
				.append_pair("response_type", "code")
				.append_pair("scope", &config.scopes_string())
				.append_pair("state", state);
			for (key, value) in &config.extra_authorize_params {
				query.append_pair(key, value);
			}
		}

		Ok(url.to_string())
	}

	#[instrument(skip(self, code))]
	pub async fn exchange_code_for_tokens(
		&self,
		kind: IntegrationKind,
		code: &str,
	) -> Result<OAuthTokens, OAuthError> {
		let config = self.ready_config(kind)?;
		debug!("exchanging authorization code for tokens");

		let form = [
			("grant_type", "authorization_code"),
			("client_id", config.client_id.as_str()),
			("client_secret", config.client_secret.expose().as_str()),
			("code", code),
			("redirect_uri", config.redirect_uri.as_str()),
		];
		retry(&self.retry_config, || self.post_token_form(config, &form)).await
	}

	#[instrument(skip(self, refresh_token))]
	pub async fn refresh_access_token(
		&self,
		kind: IntegrationKind,
		refresh_token: &SecretString,
	) -> Result<OAuthTokens, OAuthError> {
		let config = self.ready_config(kind)?;
		debug!("refreshing access token");

		let form = [
			("grant_type", "refresh_token"),
			("client_id", config.client_id.as_str()),
			("client_secret", config.client_secret.expose().as_str()),
			("refresh_token", refresh_token.expose().as_str()),
		];
		retry(&self.retry_config, || self.post_token_form(config, &form)).await
	}

	async fn post_token_form(
		&self,
		config: &OAuthProviderConfig,
		form: &[(&str, &str)],
	) -> Result<OAuthTokens, OAuthError> {
		let response = self
			.http_client
			.post(&config.token_url)
			.header("Accept", "application/json")
			.form(form)
			.send()
			.await
			.map_err(HttpError::from)?;

		let status = response.status();
		let body = response.text().await.map_err(HttpError::from)?;

		if !status.is_success() {
			return Err(OAuthError::TokenEndpoint {
				status: status.as_u16(),
				body,
			});
		}

		parse_token_body(&body)
	}
}

/// Parse a 2xx token response. Some providers report errors with a 200 and
/// an `error` field.
fn parse_token_body(body: &str) -> Result<OAuthTokens, OAuthError> {
	let value: serde_json::Value =
		serde_json::from_str(body).map_err(|e| OAuthError::Parse(e.to_string()))?;

	if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
		let message = value
			.get("error_description")
			.and_then(|d| d.as_str())
			.unwrap_or(error);
		return Err(OAuthError::Provider(message.to_string()));
	}

	let parsed: TokenResponseBody =
		serde_json::from_value(value).map_err(|e| OAuthError::Parse(e.to_string()))?;

	Ok(OAuthTokens {
		access_token: SecretString::new(parsed.access_token),
		refresh_token: parsed
			.refresh_token
			.filter(|t| !t.is_empty())
			.map(SecretString::new),
		expires_in: parsed.expires_in,
		token_type: parsed.token_type,
		scope: parsed.scope,
	})
}
