// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tether_common_config::SecretString;
use tether_integrations_core::IntegrationKind;

/// Callback route prefix; the full path is `{prefix}/{kind}/callback`.
pub const CALLBACK_PATH_PREFIX: &str = "/api/integrations";

/// Per-kind settings as supplied by process configuration. Everything is
/// optional; gaps are filled from built-in provider defaults.
#[derive(Debug, Clone, Default)]
pub struct OAuthKindSettings {
	pub client_id: Option<String>,
	pub client_secret: Option<SecretString>,
	pub redirect_uri: Option<String>,
	pub authorize_url: Option<String>,
	pub token_url: Option<String>,
	pub scopes: Option<Vec<String>>,
}

/// Resolved provider configuration for one integration kind.
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
	pub kind: IntegrationKind,
	pub client_id: String,
	pub client_secret: SecretString,
	pub authorize_url: String,
	pub token_url: String,
	pub scopes: Vec<String>,
	pub redirect_uri: String,
	/// Kind-specific query parameters added to the authorize URL.
	pub extra_authorize_params: Vec<(&'static str, &'static str)>,
}

impl OAuthProviderConfig {
	/// Scopes joined with the provider's separator.
	pub fn scopes_string(&self) -> String {
		let separator = match self.kind {
			IntegrationKind::Slack => ",",
			_ => " ",
		};
		self.scopes.join(separator)
	}

	/// Name of the first required field that is empty.
	pub fn missing_field(&self) -> Option<&'static str> {
		if self.client_id.is_empty() {
			Some("client_id")
		} else if self.client_secret.is_empty() {
			Some("client_secret")
		} else if self.redirect_uri.is_empty() {
			Some("redirect_uri")
		} else {
			None
		}
	}
}

pub(crate) struct ProviderDefaults {
	pub authorize_url: &'static str,
	pub token_url: &'static str,
	pub scopes: &'static [&'static str],
	pub extra_authorize_params: &'static [(&'static str, &'static str)],
}

/// Built-in endpoints per kind. `None` for kinds without OAuth.
pub(crate) fn provider_defaults(kind: IntegrationKind) -> Option<ProviderDefaults> {
	let defaults = match kind {
		IntegrationKind::Github => ProviderDefaults {
			authorize_url: "https://github.com/login/oauth/authorize",
			token_url: "https://github.com/login/oauth/access_token",
			scopes: &["repo", "read:user", "read:org"],
			extra_authorize_params: &[],
		},
		IntegrationKind::Gitlab => ProviderDefaults {
			authorize_url: "https://gitlab.com/oauth/authorize",
			token_url: "https://gitlab.com/oauth/token",
			scopes: &["read_api", "read_user"],
			extra_authorize_params: &[],
		},
		IntegrationKind::Slack => ProviderDefaults {
			authorize_url: "https://slack.com/oauth/v2/authorize",
			token_url: "https://slack.com/api/oauth.v2.access",
			scopes: &["channels:read", "chat:write", "users:read"],
			extra_authorize_params: &[],
		},
		IntegrationKind::Jira => ProviderDefaults {
			authorize_url: "https://auth.atlassian.com/authorize",
			token_url: "https://auth.atlassian.com/oauth/token",
			scopes: &["read:jira-work", "write:jira-work", "offline_access"],
			extra_authorize_params: &[("audience", "api.atlassian.com"), ("prompt", "consent")],
		},
		IntegrationKind::Google => ProviderDefaults {
			authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
			token_url: "https://oauth2.googleapis.com/token",
			scopes: &[
				"openid",
				"email",
				"https://www.googleapis.com/auth/drive.readonly",
			],
			extra_authorize_params: &[("access_type", "offline"), ("prompt", "consent")],
		},
		IntegrationKind::Linear => return None,
	};
	Some(defaults)
}

/// Redirect URI for a kind: explicit override, else the public base URL plus
/// the callback path. Empty when neither is configured.
pub fn redirect_uri_for(
	kind: IntegrationKind,
	override_uri: Option<&str>,
	public_base_url: Option<&str>,
) -> String {
	if let Some(uri) = override_uri.filter(|u| !u.is_empty()) {
		return uri.to_string();
	}

	match public_base_url.filter(|u| !u.is_empty()) {
		Some(base) => format!(
			"{}{CALLBACK_PATH_PREFIX}/{}/callback",
			base.trim_end_matches('/'),
			kind.as_str()
		),
		None => String::new(),
	}
}
