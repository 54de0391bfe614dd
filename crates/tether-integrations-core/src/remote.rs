// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Remote-host payloads and their normalization.
//!
//! Each entity kind has its own struct and its own `normalize` arm, so adding
//! a kind is a compile error until it is mapped.

use serde::{Deserialize, Serialize};

use crate::external::{EntityMetadata, ExternalType, NormalizedRecord, SOURCE_GITHUB};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteUser {
	pub login: String,
	#[serde(default)]
	pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteLabel {
	pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMilestone {
	pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRepository {
	pub id: i64,
	pub name: String,
	pub full_name: String,
	#[serde(default)]
	pub description: Option<String>,
	pub html_url: String,
	#[serde(default)]
	pub private: bool,
	#[serde(default)]
	pub stargazers_count: u64,
	#[serde(default)]
	pub language: Option<String>,
	#[serde(default)]
	pub default_branch: Option<String>,
	#[serde(default)]
	pub owner: Option<RemoteUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteIssue {
	pub id: i64,
	pub number: u64,
	pub title: String,
	#[serde(default)]
	pub body: Option<String>,
	pub state: String,
	pub html_url: String,
	#[serde(default)]
	pub user: Option<RemoteUser>,
	#[serde(default)]
	pub labels: Vec<RemoteLabel>,
	#[serde(default)]
	pub assignees: Vec<RemoteUser>,
	#[serde(default)]
	pub milestone: Option<RemoteMilestone>,
	/// Present when the "issue" is really a pull request.
	#[serde(default)]
	pub pull_request: Option<serde_json::Value>,
}

impl RemoteIssue {
	pub fn is_pull_request(&self) -> bool {
		self.pull_request.is_some()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBranchRef {
	#[serde(rename = "ref")]
	pub ref_name: String,
	pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePullRequest {
	pub id: i64,
	pub number: u64,
	pub title: String,
	#[serde(default)]
	pub body: Option<String>,
	pub state: String,
	pub html_url: String,
	#[serde(default)]
	pub user: Option<RemoteUser>,
	pub head: RemoteBranchRef,
	pub base: RemoteBranchRef,
	#[serde(default)]
	pub mergeable: Option<bool>,
	#[serde(default)]
	pub merged: Option<bool>,
	#[serde(default)]
	pub merged_at: Option<String>,
}

impl RemotePullRequest {
	pub fn is_merged(&self) -> bool {
		self.merged.unwrap_or(false) || self.merged_at.is_some()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteGitActor {
	pub name: String,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCommitDetail {
	pub message: String,
	#[serde(default)]
	pub author: Option<RemoteGitActor>,
	#[serde(default)]
	pub committer: Option<RemoteGitActor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCommit {
	pub sha: String,
	#[serde(default)]
	pub html_url: Option<String>,
	pub commit: RemoteCommitDetail,
	/// Host account of the author, when the email is linked to one.
	#[serde(default)]
	pub author: Option<RemoteUser>,
}

impl RemoteCommit {
	/// First line of the commit message.
	pub fn headline(&self) -> &str {
		self.commit.message.lines().next().unwrap_or_default()
	}

	pub fn short_sha(&self) -> &str {
		let end = self.sha.len().min(7);
		&self.sha[..end]
	}

	pub fn committer_name(&self) -> Option<&str> {
		self
			.commit
			.committer
			.as_ref()
			.or(self.commit.author.as_ref())
			.map(|a| a.name.as_str())
	}
}

/// A remote entity of one of the synchronized kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEntity {
	Repository(RemoteRepository),
	Issue(RemoteIssue),
	PullRequest(RemotePullRequest),
	Commit(RemoteCommit),
}

impl RemoteEntity {
	pub fn external_type(&self) -> ExternalType {
		match self {
			RemoteEntity::Repository(_) => ExternalType::Repository,
			RemoteEntity::Issue(_) => ExternalType::Issue,
			RemoteEntity::PullRequest(_) => ExternalType::PullRequest,
			RemoteEntity::Commit(_) => ExternalType::Commit,
		}
	}

	/// Stable remote identifier: numeric id for repositories, issues and PRs,
	/// sha for commits.
	pub fn external_id(&self) -> String {
		match self {
			RemoteEntity::Repository(r) => r.id.to_string(),
			RemoteEntity::Issue(i) => i.id.to_string(),
			RemoteEntity::PullRequest(p) => p.id.to_string(),
			RemoteEntity::Commit(c) => c.sha.clone(),
		}
	}

	/// Map into the canonical record. `repository` is the `owner/name` the
	/// entity was fetched from, when known.
	pub fn normalize(&self, repository: Option<&str>) -> NormalizedRecord {
		match self {
			RemoteEntity::Repository(r) => normalize_repository(r),
			RemoteEntity::Issue(i) => normalize_issue(i, repository),
			RemoteEntity::PullRequest(p) => normalize_pull_request(p, repository),
			RemoteEntity::Commit(c) => normalize_commit(c, repository),
		}
	}
}

fn normalize_repository(repo: &RemoteRepository) -> NormalizedRecord {
	NormalizedRecord {
		title: repo.full_name.clone(),
		content: repo.description.clone().unwrap_or_default(),
		author: repo.owner.as_ref().map(|o| o.login.clone()),
		source: SOURCE_GITHUB.to_string(),
		url: Some(repo.html_url.clone()),
		metadata: EntityMetadata::Repository {
			full_name: repo.full_name.clone(),
			stars: repo.stargazers_count,
			language: repo.language.clone(),
			private: repo.private,
			default_branch: repo.default_branch.clone(),
		},
	}
}

fn normalize_issue(issue: &RemoteIssue, repository: Option<&str>) -> NormalizedRecord {
	NormalizedRecord {
		title: issue.title.clone(),
		content: issue.body.clone().unwrap_or_default(),
		author: issue.user.as_ref().map(|u| u.login.clone()),
		source: SOURCE_GITHUB.to_string(),
		url: Some(issue.html_url.clone()),
		metadata: EntityMetadata::Issue {
			number: issue.number,
			state: issue.state.clone(),
			labels: issue.labels.iter().map(|l| l.name.clone()).collect(),
			assignees: issue.assignees.iter().map(|a| a.login.clone()).collect(),
			milestone: issue.milestone.as_ref().map(|m| m.title.clone()),
			repository: repository.map(str::to_string),
		},
	}
}

fn normalize_pull_request(pr: &RemotePullRequest, repository: Option<&str>) -> NormalizedRecord {
	NormalizedRecord {
		title: pr.title.clone(),
		content: pr.body.clone().unwrap_or_default(),
		author: pr.user.as_ref().map(|u| u.login.clone()),
		source: SOURCE_GITHUB.to_string(),
		url: Some(pr.html_url.clone()),
		metadata: EntityMetadata::PullRequest {
			number: pr.number,
			state: pr.state.clone(),
			head: pr.head.ref_name.clone(),
			base: pr.base.ref_name.clone(),
			mergeable: pr.mergeable,
			merged: pr.is_merged(),
			repository: repository.map(str::to_string),
		},
	}
}

fn normalize_commit(commit: &RemoteCommit, repository: Option<&str>) -> NormalizedRecord {
	let author_name = commit.commit.author.as_ref().map(|a| a.name.clone());
	NormalizedRecord {
		title: commit.headline().to_string(),
		content: commit.commit.message.clone(),
		author: commit
			.author
			.as_ref()
			.map(|u| u.login.clone())
			.or_else(|| author_name.clone()),
		source: SOURCE_GITHUB.to_string(),
		url: commit.html_url.clone(),
		metadata: EntityMetadata::Commit {
			sha: commit.sha.clone(),
			author: author_name,
			committer: commit.commit.committer.as_ref().map(|c| c.name.clone()),
			authored_at: commit.commit.author.as_ref().and_then(|a| a.date.clone()),
			repository: repository.map(str::to_string),
		},
	}
}
