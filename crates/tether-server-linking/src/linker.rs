// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Resolve issue references from commits and pull requests and apply their
//! side effects.

use std::sync::Arc;

use serde_json::Value;
use tether_integrations_core::{
	EntityMetadata, ExternalData, ExternalType, Issue, IssueStatus, NormalizedRecord,
	RemoteCommit, RemotePullRequest, SOURCE_GITHUB,
};
use tether_server_db::{ExternalDataStore, IssueStore};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::events::{EventBus, LinkEvent};
use crate::magic_words::{
	extract_issue_key_from_branch, extract_issue_keys, parse_magic_words_from_commit,
	split_issue_key, MagicWordAction,
};

#[derive(Clone)]
pub struct Linker {
	issues: Arc<dyn IssueStore>,
	external: Arc<dyn ExternalDataStore>,
	events: Arc<dyn EventBus>,
}

impl Linker {
	pub fn new(
		issues: Arc<dyn IssueStore>,
		external: Arc<dyn ExternalDataStore>,
		events: Arc<dyn EventBus>,
	) -> Self {
		Self {
			issues,
			external,
			events,
		}
	}

	/// Look up `PROJ-123`. Keys without a numeric suffix are simply not
	/// found.
	pub async fn find_issue_by_key(&self, key: &str) -> Result<Option<Issue>> {
		let Some((project, number)) = split_issue_key(key) else {
			debug!(key, "Not an issue key");
			return Ok(None);
		};
		Ok(self.issues.find_issue(project, number).await?)
	}

	/// Close the issues a commit message names with a close verb. Returns the
	/// keys of the issues actually closed.
	///
	/// A bare `#123` is only resolved against `project_key`, the project
	/// explicitly mapped to the commit's repository. Without a mapping it is
	/// skipped.
	#[instrument(skip(self, commit), fields(sha = %commit.short_sha()))]
	pub async fn handle_commit_magic_words(
		&self,
		integration_id: Uuid,
		commit: &RemoteCommit,
		project_key: Option<&str>,
		committer_name: &str,
	) -> Result<Vec<String>> {
		let mut closed = Vec::new();

		for found in parse_magic_words_from_commit(&commit.commit.message) {
			if found.action != MagicWordAction::Close {
				continue;
			}

			let key = match (found.bare_number(), project_key) {
				(Some(number), Some(project)) => format!("{}-{number}", project.to_uppercase()),
				(Some(_), None) => {
					warn!(
						security = true,
						integration_id = %integration_id,
						sha = %commit.short_sha(),
						reference = %found.issue_key,
						"security: ignoring bare issue number from a repository without a project mapping"
					);
					continue;
				}
				(None, _) => found.issue_key.clone(),
			};

			let Some(mut issue) = self.find_issue_by_key(&key).await? else {
				debug!(key = %key, "Issue not found, skipping");
				continue;
			};
			if issue.status.is_done() {
				debug!(key = %key, "Issue already done, skipping");
				continue;
			}

			issue.status = IssueStatus::Done;
			self.issues.save_issue(&issue).await?;

			let record = NormalizedRecord {
				title: format!("{} closed by {}", issue.key(), commit.short_sha()),
				content: commit.headline().to_string(),
				author: Some(committer_name.to_string()),
				source: SOURCE_GITHUB.to_string(),
				url: commit.html_url.clone(),
				metadata: EntityMetadata::Link {
					issue_id: issue.id,
					issue_key: issue.key(),
					source_ref: commit.sha.clone(),
					matched: Some(found.raw_match.clone()),
					actor: Some(committer_name.to_string()),
				},
			};
			self
				.record_link(
					integration_id,
					ExternalType::MagicWordClose,
					format!("{}:{}", commit.sha, issue.id),
					serde_json::to_value(commit)?,
					record,
				)
				.await?;

			self.events.emit(LinkEvent::CommitClosedIssue {
				issue_id: issue.id,
				issue_key: issue.key(),
				commit_sha: commit.short_sha().to_string(),
				commit_url: commit.html_url.clone(),
				committer: committer_name.to_string(),
			});

			info!(issue = %issue.key(), sha = %commit.short_sha(), "Closed issue from commit message");
			closed.push(issue.key());
		}

		Ok(closed)
	}

	/// Link a pull request to the issue its source branch names. The issue is
	/// not changed.
	#[instrument(skip(self, pr), fields(pr = pr.number, branch = %pr.head.ref_name))]
	pub async fn link_pr_to_issue(
		&self,
		integration_id: Uuid,
		pr: &RemotePullRequest,
	) -> Result<Option<Issue>> {
		let Some(issue) = self.issue_for_branch(&pr.head.ref_name).await? else {
			return Ok(None);
		};

		let record = NormalizedRecord {
			title: format!("#{} linked to {}", pr.number, issue.key()),
			content: pr.title.clone(),
			author: pr.user.as_ref().map(|u| u.login.clone()),
			source: SOURCE_GITHUB.to_string(),
			url: Some(pr.html_url.clone()),
			metadata: EntityMetadata::Link {
				issue_id: issue.id,
				issue_key: issue.key(),
				source_ref: pr.id.to_string(),
				matched: Some(pr.head.ref_name.clone()),
				actor: pr.user.as_ref().map(|u| u.login.clone()),
			},
		};
		self
			.record_link(
				integration_id,
				ExternalType::PrIssueLink,
				format!("{}:{}", pr.id, issue.id),
				serde_json::to_value(pr)?,
				record,
			)
			.await?;

		info!(issue = %issue.key(), pr = pr.number, "Linked pull request to issue");
		Ok(Some(issue))
	}

	/// Mark the branch's issue done once its pull request is merged. Returns
	/// the issue when it changed.
	#[instrument(skip(self, pr), fields(pr = pr.number, branch = %pr.head.ref_name))]
	pub async fn handle_pr_merged(&self, pr: &RemotePullRequest) -> Result<Option<Issue>> {
		if !pr.is_merged() {
			debug!("Pull request closed without merge");
			return Ok(None);
		}

		let Some(mut issue) = self.issue_for_branch(&pr.head.ref_name).await? else {
			return Ok(None);
		};
		if issue.status.is_done() {
			return Ok(None);
		}

		issue.status = IssueStatus::Done;
		self.issues.save_issue(&issue).await?;
		info!(issue = %issue.key(), pr = pr.number, "Closed issue from merged pull request");
		Ok(Some(issue))
	}

	/// Record a link for every `PROJECT-NUMBER` key a commit mentions, without
	/// changing any issue. Returns the keys linked.
	#[instrument(skip(self, commit), fields(sha = %commit.short_sha()))]
	pub async fn link_commit_to_issues(
		&self,
		integration_id: Uuid,
		commit: &RemoteCommit,
	) -> Result<Vec<String>> {
		let mut linked = Vec::new();

		for key in extract_issue_keys(&commit.commit.message) {
			let Some(issue) = self.find_issue_by_key(&key).await? else {
				continue;
			};

			let record = NormalizedRecord {
				title: format!("{} referenced by {}", issue.key(), commit.short_sha()),
				content: commit.headline().to_string(),
				author: commit.committer_name().map(str::to_string),
				source: SOURCE_GITHUB.to_string(),
				url: commit.html_url.clone(),
				metadata: EntityMetadata::Link {
					issue_id: issue.id,
					issue_key: issue.key(),
					source_ref: commit.sha.clone(),
					matched: None,
					actor: commit.committer_name().map(str::to_string),
				},
			};
			self
				.record_link(
					integration_id,
					ExternalType::CommitIssueLink,
					format!("{}:{}", commit.sha, issue.id),
					serde_json::to_value(commit)?,
					record,
				)
				.await?;
			linked.push(issue.key());
		}

		Ok(linked)
	}

	async fn issue_for_branch(&self, branch: &str) -> Result<Option<Issue>> {
		let Some(key) = extract_issue_key_from_branch(branch) else {
			debug!(branch, "No issue key in branch name");
			return Ok(None);
		};
		self.find_issue_by_key(&key).await
	}

	async fn record_link(
		&self,
		integration_id: Uuid,
		external_type: ExternalType,
		external_id: String,
		raw: Value,
		record: NormalizedRecord,
	) -> Result<()> {
		let data = ExternalData::new(integration_id, external_id, external_type, raw, record);
		self.external.upsert_external_data(&data).await?;
		Ok(())
	}
}
