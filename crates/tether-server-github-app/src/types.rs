// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App API and webhook payload types.

use serde::{Deserialize, Serialize};

/// GitHub App installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
	pub id: i64,
	pub account: InstallationAccount,
	/// "all" or "selected"
	#[serde(default)]
	pub repository_selection: Option<String>,
	#[serde(default)]
	pub suspended_at: Option<String>,
}

/// Account (user or organization) that installed the app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationAccount {
	pub id: i64,
	pub login: String,
	/// "User" or "Organization"
	#[serde(rename = "type")]
	pub account_type: String,
}

/// Response from `POST /app/installations/{id}/access_tokens`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
	pub token: String,
	/// RFC 3339 timestamp
	pub expires_at: String,
}

/// Repository entry in installation webhook payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookRepository {
	pub id: i64,
	pub name: String,
	pub full_name: String,
	#[serde(default)]
	pub private: bool,
}

/// Payload of the `installation` webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationWebhookPayload {
	/// created, deleted, suspend, unsuspend, new_permissions_accepted
	pub action: String,
	pub installation: Installation,
	#[serde(default)]
	pub repositories: Vec<WebhookRepository>,
}

/// Payload of the `installation_repositories` webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationRepositoriesWebhookPayload {
	/// added or removed
	pub action: String,
	pub installation: Installation,
	#[serde(default)]
	pub repositories_added: Vec<WebhookRepository>,
	#[serde(default)]
	pub repositories_removed: Vec<WebhookRepository>,
}

impl InstallationWebhookPayload {
	pub fn repository_names(&self) -> Vec<String> {
		self.repositories.iter().map(|r| r.full_name.clone()).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn installation_event_parses() {
		let payload: InstallationWebhookPayload = serde_json::from_value(json!({
			"action": "created",
			"installation": {
				"id": 42,
				"account": {"id": 7, "login": "acme", "type": "Organization"},
				"repository_selection": "selected"
			},
			"repositories": [
				{"id": 1, "name": "api", "full_name": "acme/api", "private": true},
				{"id": 2, "name": "web", "full_name": "acme/web"}
			]
		}))
		.unwrap();

		assert_eq!(payload.installation.id, 42);
		assert_eq!(payload.installation.account.account_type, "Organization");
		assert_eq!(payload.repository_names(), vec!["acme/api", "acme/web"]);
		assert!(payload.installation.suspended_at.is_none());
	}

	#[test]
	fn installation_repositories_event_defaults_missing_lists() {
		let payload: InstallationRepositoriesWebhookPayload = serde_json::from_value(json!({
			"action": "removed",
			"installation": {
				"id": 42,
				"account": {"id": 7, "login": "acme", "type": "User"}
			},
			"repositories_removed": [{"id": 1, "name": "api", "full_name": "acme/api"}]
		}))
		.unwrap();

		assert!(payload.repositories_added.is_empty());
		assert_eq!(payload.repositories_removed[0].full_name, "acme/api");
	}
}
