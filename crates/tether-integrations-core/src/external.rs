// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `source` value recorded on records normalized from the GitHub API.
pub const SOURCE_GITHUB: &str = "github";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalType {
	Repository,
	Issue,
	PullRequest,
	Commit,
	/// PR linked to an issue by branch name.
	PrIssueLink,
	/// Commit mentioning an issue key.
	CommitIssueLink,
	/// Audit record for an issue closed by a commit message.
	MagicWordClose,
}

impl ExternalType {
	pub fn as_str(&self) -> &'static str {
		match self {
			ExternalType::Repository => "repository",
			ExternalType::Issue => "issue",
			ExternalType::PullRequest => "pull_request",
			ExternalType::Commit => "commit",
			ExternalType::PrIssueLink => "pr_issue_link",
			ExternalType::CommitIssueLink => "commit_issue_link",
			ExternalType::MagicWordClose => "magic_word_close",
		}
	}
}

impl std::fmt::Display for ExternalType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for ExternalType {
	type Err = ();
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"repository" => Ok(ExternalType::Repository),
			"issue" => Ok(ExternalType::Issue),
			"pull_request" => Ok(ExternalType::PullRequest),
			"commit" => Ok(ExternalType::Commit),
			"pr_issue_link" => Ok(ExternalType::PrIssueLink),
			"commit_issue_link" => Ok(ExternalType::CommitIssueLink),
			"magic_word_close" => Ok(ExternalType::MagicWordClose),
			_ => Err(()),
		}
	}
}

/// Type-specific fields of a normalized record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityMetadata {
	Repository {
		full_name: String,
		stars: u64,
		language: Option<String>,
		private: bool,
		default_branch: Option<String>,
	},
	Issue {
		number: u64,
		state: String,
		labels: Vec<String>,
		assignees: Vec<String>,
		milestone: Option<String>,
		repository: Option<String>,
	},
	PullRequest {
		number: u64,
		state: String,
		head: String,
		base: String,
		mergeable: Option<bool>,
		merged: bool,
		repository: Option<String>,
	},
	Commit {
		sha: String,
		author: Option<String>,
		committer: Option<String>,
		authored_at: Option<String>,
		repository: Option<String>,
	},
	Link {
		issue_id: Uuid,
		issue_key: String,
		/// PR id or commit sha the link originates from.
		source_ref: String,
		/// Exact matched text for magic-word closes.
		matched: Option<String>,
		actor: Option<String>,
	},
}

/// Canonical shape every remote entity is mapped into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
	pub title: String,
	pub content: String,
	pub author: Option<String>,
	pub source: String,
	pub url: Option<String>,
	pub metadata: EntityMetadata,
}

impl NormalizedRecord {
	/// Text fed to the search index: title, then content.
	pub fn search_text(&self) -> String {
		if self.content.is_empty() {
			self.title.clone()
		} else {
			format!("{}\n{}", self.title, self.content)
		}
	}
}

/// One stored remote entity. At most one row exists per
/// `(integration_id, external_id, external_type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalData {
	pub id: Uuid,
	pub integration_id: Uuid,
	pub external_id: String,
	pub external_type: ExternalType,
	pub raw: serde_json::Value,
	pub mapped: NormalizedRecord,
	pub search_text: String,
	pub last_sync_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl ExternalData {
	pub fn new(
		integration_id: Uuid,
		external_id: impl Into<String>,
		external_type: ExternalType,
		raw: serde_json::Value,
		mapped: NormalizedRecord,
	) -> Self {
		let now = Utc::now();
		let search_text = mapped.search_text();
		Self {
			id: Uuid::new_v4(),
			integration_id,
			external_id: external_id.into(),
			external_type,
			raw,
			mapped,
			search_text,
			last_sync_at: now,
			created_at: now,
			updated_at: now,
		}
	}

	/// Search projection, keyed identically to the record itself.
	pub fn search_entry(&self) -> SearchIndexEntry {
		SearchIndexEntry {
			integration_id: self.integration_id,
			external_id: self.external_id.clone(),
			content_type: self.external_type,
			title: self.mapped.title.clone(),
			content: self.mapped.content.clone(),
			metadata: self.mapped.metadata.clone(),
			updated_at: self.last_sync_at,
		}
	}
}

/// Denormalized projection of [`ExternalData`] for full-text lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexEntry {
	pub integration_id: Uuid,
	pub external_id: String,
	pub content_type: ExternalType,
	pub title: String,
	pub content: String,
	pub metadata: EntityMetadata,
	pub updated_at: DateTime<Utc>,
}
