// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_common_config::SecretString;
use uuid::Uuid;

use crate::kind::IntegrationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Error,
}

impl HealthStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			HealthStatus::Healthy => "healthy",
			HealthStatus::Degraded => "degraded",
			HealthStatus::Error => "error",
		}
	}
}

impl std::str::FromStr for HealthStatus {
	type Err = ();
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"healthy" => Ok(HealthStatus::Healthy),
			"degraded" => Ok(HealthStatus::Degraded),
			"error" => Ok(HealthStatus::Error),
			_ => Err(()),
		}
	}
}

/// Which credential provider serves an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthModel {
	/// Per-user OAuth access/refresh token pair stored on the integration.
	OAuth,
	/// App installation; tokens are minted on demand and never stored.
	AppInstallation(i64),
}

/// A configured connection to one remote account or installation.
///
/// Tokens are wrapped in [`SecretString`] so serializing an integration for
/// an API response never discloses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
	pub id: Uuid,
	pub kind: IntegrationKind,
	pub is_active: bool,
	pub health: HealthStatus,
	pub installation_id: Option<i64>,
	pub account_type: Option<String>,
	pub account_login: Option<String>,
	pub access_token: Option<SecretString>,
	pub refresh_token: Option<SecretString>,
	pub token_expires_at: Option<DateTime<Utc>>,
	/// Tracked remote repositories as `owner/name`.
	pub repositories: Vec<String>,
	/// Repository (`owner/name`) to internal project key.
	pub repository_projects: BTreeMap<String, String>,
	pub last_sync_at: Option<DateTime<Utc>>,
	pub last_error_at: Option<DateTime<Utc>>,
	pub last_error_message: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Integration {
	pub fn new(kind: IntegrationKind) -> Self {
		let now = Utc::now();
		Self {
			id: Uuid::new_v4(),
			kind,
			is_active: true,
			health: HealthStatus::Healthy,
			installation_id: None,
			account_type: None,
			account_login: None,
			access_token: None,
			refresh_token: None,
			token_expires_at: None,
			repositories: Vec::new(),
			repository_projects: BTreeMap::new(),
			last_sync_at: None,
			last_error_at: None,
			last_error_message: None,
			created_at: now,
			updated_at: now,
		}
	}

	/// An integration created from an app installation event.
	pub fn for_installation(kind: IntegrationKind, installation_id: i64) -> Self {
		Self {
			installation_id: Some(installation_id),
			..Self::new(kind)
		}
	}

	pub fn auth_model(&self) -> AuthModel {
		match self.installation_id {
			Some(id) => AuthModel::AppInstallation(id),
			None => AuthModel::OAuth,
		}
	}

	/// Project key registered for a repository, if any. Repository names
	/// compare case-insensitively.
	pub fn project_key_for(&self, repository: &str) -> Option<&str> {
		self
			.repository_projects
			.get(&repository_key(repository))
			.map(String::as_str)
	}

	/// Register `project_key` for a repository, or clear the mapping with
	/// `None`.
	pub fn set_project_key(&mut self, repository: &str, project_key: Option<&str>) {
		let key = repository_key(repository);
		match project_key {
			Some(project_key) => {
				self.repository_projects.insert(key, project_key.to_string());
			}
			None => {
				self.repository_projects.remove(&key);
			}
		}
	}

	/// Add repositories, skipping any already tracked. Order of first
	/// appearance is kept.
	pub fn add_repositories<I, S>(&mut self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		for name in names {
			let name = name.into();
			if !self.repositories.contains(&name) {
				self.repositories.push(name);
			}
		}
	}

	pub fn remove_repositories<I, S>(&mut self, names: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let removed: Vec<String> = names.into_iter().map(|s| s.as_ref().to_string()).collect();
		self.repositories.retain(|r| !removed.contains(r));
		for name in &removed {
			self.repository_projects.remove(&repository_key(name));
		}
	}

	/// True when the stored OAuth access token expires within `buffer` of
	/// `now`. Integrations without an expiry never report expired.
	pub fn token_expires_within(&self, now: DateTime<Utc>, buffer: chrono::Duration) -> bool {
		match self.token_expires_at {
			Some(expires_at) => expires_at <= now + buffer,
			None => false,
		}
	}
}

/// Key under which a repository's project mapping is stored. GitHub matches
/// `owner/name` case-insensitively.
pub fn repository_key(repository: &str) -> String {
	repository.to_ascii_lowercase()
}
