// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Typed webhook payloads for the repository-scoped events tether consumes.

use serde::Deserialize;
use tether_integrations_core::{
	RemoteCommit, RemoteCommitDetail, RemoteGitActor, RemoteIssue, RemotePullRequest,
	RemoteRepository, RemoteUser,
};

/// Value of the `X-GitHub-Event` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
	Issues,
	PullRequest,
	Push,
	Installation,
	InstallationRepositories,
	Ping,
	Other,
}

impl EventKind {
	pub fn parse(header: &str) -> Self {
		match header {
			"issues" => EventKind::Issues,
			"pull_request" => EventKind::PullRequest,
			"push" => EventKind::Push,
			"installation" => EventKind::Installation,
			"installation_repositories" => EventKind::InstallationRepositories,
			"ping" => EventKind::Ping,
			_ => EventKind::Other,
		}
	}
}

/// Actions on issues and pull requests that are stored.
pub const HANDLED_ACTIONS: [&str; 4] = ["opened", "closed", "reopened", "edited"];

#[derive(Debug, Clone, Deserialize)]
pub struct InstallationRef {
	pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
	pub action: String,
	pub issue: RemoteIssue,
	pub repository: RemoteRepository,
	#[serde(default)]
	pub installation: Option<InstallationRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
	pub action: String,
	pub pull_request: RemotePullRequest,
	pub repository: RemoteRepository,
	#[serde(default)]
	pub installation: Option<InstallationRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
	#[serde(rename = "ref")]
	pub git_ref: String,
	pub repository: RemoteRepository,
	#[serde(default)]
	pub commits: Vec<PushCommit>,
	#[serde(default)]
	pub installation: Option<InstallationRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushActor {
	pub name: String,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub username: Option<String>,
}

/// A commit as it appears inside a push payload. The shape differs from the
/// REST listing, so it is converted before storage.
#[derive(Debug, Clone, Deserialize)]
pub struct PushCommit {
	pub id: String,
	pub message: String,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub timestamp: Option<String>,
	pub author: PushActor,
	#[serde(default)]
	pub committer: Option<PushActor>,
}

impl PushCommit {
	pub fn to_remote(&self) -> RemoteCommit {
		let actor = |a: &PushActor| RemoteGitActor {
			name: a.name.clone(),
			email: a.email.clone(),
			date: self.timestamp.clone(),
		};
		RemoteCommit {
			sha: self.id.clone(),
			html_url: self.url.clone(),
			commit: RemoteCommitDetail {
				message: self.message.clone(),
				author: Some(actor(&self.author)),
				committer: self.committer.as_ref().map(actor),
			},
			author: self.author.username.clone().map(|login| RemoteUser { login, id: None }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn event_kinds() {
		assert_eq!(EventKind::parse("pull_request"), EventKind::PullRequest);
		assert_eq!(EventKind::parse("installation_repositories"), EventKind::InstallationRepositories);
		assert_eq!(EventKind::parse("workflow_run"), EventKind::Other);
	}

	#[test]
	fn push_commit_converts_to_remote_commit() {
		let commit: PushCommit = serde_json::from_value(json!({
			"id": "0123456789abcdef",
			"message": "Fixes API-1\n\nbody",
			"url": "https://github.com/acme/api/commit/0123456789abcdef",
			"timestamp": "2025-01-02T03:04:05Z",
			"author": {"name": "Ada", "email": "ada@example.com", "username": "ada"},
			"committer": {"name": "GitHub", "email": "noreply@github.com"}
		}))
		.unwrap();

		let remote = commit.to_remote();
		assert_eq!(remote.sha, "0123456789abcdef");
		assert_eq!(remote.headline(), "Fixes API-1");
		assert_eq!(remote.committer_name(), Some("GitHub"));
		assert_eq!(remote.author.unwrap().login, "ada");
	}

	#[test]
	fn push_without_commits() {
		let event: PushEvent = serde_json::from_value(json!({
			"ref": "refs/tags/v1",
			"repository": {
				"id": 1,
				"name": "api",
				"full_name": "acme/api",
				"html_url": "https://github.com/acme/api"
			}
		}))
		.unwrap();
		assert!(event.commits.is_empty());
		assert!(event.installation.is_none());
	}
}
