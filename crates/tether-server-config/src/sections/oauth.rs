// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OAuth client settings per integration kind.
//!
//! ```toml
//! [oauth.github]
//! client_id = "Iv1.abc"
//! client_secret = "..."
//! ```
//!
//! Missing client credentials are not an error here; the OAuth flow for that
//! kind fails when it is started.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tether_common_config::SecretString;

/// Kinds read from the environment as `TETHER_SERVER_<KIND>_CLIENT_ID` and
/// friends.
pub const OAUTH_KINDS: [&str; 5] = ["github", "gitlab", "slack", "jira", "google"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthProviderConfigLayer {
	pub client_id: Option<String>,
	#[serde(skip_serializing)]
	pub client_secret: Option<SecretString>,
	/// Overrides the callback derived from the public base URL.
	pub redirect_uri: Option<String>,
	pub authorize_url: Option<String>,
	pub token_url: Option<String>,
	pub scopes: Option<Vec<String>>,
}

impl OAuthProviderConfigLayer {
	pub fn merge(&mut self, other: OAuthProviderConfigLayer) {
		if other.client_id.is_some() {
			self.client_id = other.client_id;
		}
		if other.client_secret.is_some() {
			self.client_secret = other.client_secret;
		}
		if other.redirect_uri.is_some() {
			self.redirect_uri = other.redirect_uri;
		}
		if other.authorize_url.is_some() {
			self.authorize_url = other.authorize_url;
		}
		if other.token_url.is_some() {
			self.token_url = other.token_url;
		}
		if other.scopes.is_some() {
			self.scopes = other.scopes;
		}
	}

	fn is_empty(&self) -> bool {
		self.client_id.is_none()
			&& self.client_secret.is_none()
			&& self.redirect_uri.is_none()
			&& self.authorize_url.is_none()
			&& self.token_url.is_none()
			&& self.scopes.is_none()
	}

	pub fn finalize(self) -> OAuthProviderConfig {
		OAuthProviderConfig {
			client_id: self.client_id.filter(|s| !s.is_empty()),
			client_secret: self.client_secret.filter(|s| !s.is_empty()),
			redirect_uri: self.redirect_uri.filter(|s| !s.is_empty()),
			authorize_url: self.authorize_url.filter(|s| !s.is_empty()),
			token_url: self.token_url.filter(|s| !s.is_empty()),
			scopes: self.scopes,
		}
	}
}

/// Resolved settings for one kind. Unset fields fall back to the provider's
/// built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct OAuthProviderConfig {
	pub client_id: Option<String>,
	pub client_secret: Option<SecretString>,
	pub redirect_uri: Option<String>,
	pub authorize_url: Option<String>,
	pub token_url: Option<String>,
	pub scopes: Option<Vec<String>>,
}

impl OAuthProviderConfig {
	pub fn has_client_credentials(&self) -> bool {
		self.client_id.is_some() && self.client_secret.is_some()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthConfigLayer {
	/// Keyed by lowercase kind name.
	#[serde(flatten)]
	pub providers: BTreeMap<String, OAuthProviderConfigLayer>,
}

impl OAuthConfigLayer {
	pub fn merge(&mut self, other: OAuthConfigLayer) {
		for (kind, layer) in other.providers {
			match self.providers.get_mut(&kind) {
				Some(existing) => existing.merge(layer),
				None => {
					self.providers.insert(kind, layer);
				}
			}
		}
	}

	pub fn finalize(self) -> OAuthConfig {
		OAuthConfig {
			providers: self
				.providers
				.into_iter()
				.filter(|(_, layer)| !layer.is_empty())
				.map(|(kind, layer)| (kind.to_ascii_lowercase(), layer.finalize()))
				.collect(),
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
	pub providers: BTreeMap<String, OAuthProviderConfig>,
}

impl OAuthConfig {
	pub fn provider(&self, kind: &str) -> Option<&OAuthProviderConfig> {
		self.providers.get(kind)
	}
}
