// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Authenticate an inbound delivery, then route it by event type.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tether_integrations_core::{Integration, RemoteEntity};
use tether_server_db::IntegrationStore;
use tether_server_github_app::{InstallationRepositoriesWebhookPayload, InstallationWebhookPayload};
use tether_server_linking::Linker;
use tether_server_sync::Synchronizer;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, WebhookError};
use crate::events::{
	EventKind, InstallationRef, IssuesEvent, PullRequestEvent, PushEvent, HANDLED_ACTIONS,
};

/// One inbound delivery, as received.
#[derive(Debug, Clone, Copy)]
pub struct WebhookRequest<'a> {
	/// `X-GitHub-Event`.
	pub event: &'a str,
	/// `X-GitHub-Delivery`, used for logging only.
	pub delivery_id: Option<&'a str>,
	/// `X-Hub-Signature-256`.
	pub signature: Option<&'a str>,
	pub body: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
	Issue {
		external_id: String,
	},
	PullRequest {
		external_id: String,
		linked_issue: Option<String>,
		closed_issue: Option<String>,
	},
	Push {
		stored: usize,
		closed_issues: Vec<String>,
	},
	Installation {
		integration_id: Option<Uuid>,
	},
	Pong,
	Ignored {
		event: String,
		action: Option<String>,
	},
}

#[derive(Clone)]
pub struct WebhookDispatcher {
	sync: Arc<Synchronizer>,
	linker: Linker,
	integrations: Arc<dyn IntegrationStore>,
}

impl WebhookDispatcher {
	pub fn new(
		sync: Arc<Synchronizer>,
		linker: Linker,
		integrations: Arc<dyn IntegrationStore>,
	) -> Self {
		Self {
			sync,
			linker,
			integrations,
		}
	}

	/// Verify the signature over the raw body, then apply the event.
	///
	/// Nothing is parsed or stored unless the signature verifies.
	#[instrument(
		skip(self, request),
		fields(event = request.event, delivery = request.delivery_id.unwrap_or("-"))
	)]
	pub async fn dispatch(&self, request: WebhookRequest<'_>) -> Result<DispatchOutcome> {
		let Some(signature) = request.signature else {
			warn!("webhook: missing signature header");
			return Err(WebhookError::MissingSignature);
		};
		if !self
			.sync
			.github()
			.verify_webhook_signature(request.body, signature)
		{
			warn!("webhook: signature verification failed");
			return Err(WebhookError::InvalidSignature);
		}

		let value: Value = serde_json::from_slice(request.body)?;
		match EventKind::parse(request.event) {
			EventKind::Issues => self.on_issues(value).await,
			EventKind::PullRequest => self.on_pull_request(value).await,
			EventKind::Push => self.on_push(value).await,
			EventKind::Installation => {
				let payload: InstallationWebhookPayload = serde_json::from_value(value)?;
				let integration = self.sync.handle_installation_event(&payload).await?;
				Ok(DispatchOutcome::Installation {
					integration_id: integration.map(|i| i.id),
				})
			}
			EventKind::InstallationRepositories => {
				let payload: InstallationRepositoriesWebhookPayload = serde_json::from_value(value)?;
				let integration = self
					.sync
					.handle_installation_repositories_event(&payload)
					.await?;
				Ok(DispatchOutcome::Installation {
					integration_id: integration.map(|i| i.id),
				})
			}
			EventKind::Ping => {
				debug!("webhook: ping");
				Ok(DispatchOutcome::Pong)
			}
			EventKind::Other => {
				debug!("webhook: ignoring event");
				Ok(ignored(request.event, &value))
			}
		}
	}

	async fn on_issues(&self, value: Value) -> Result<DispatchOutcome> {
		let (event, raw): (IssuesEvent, Value) = split_payload(value, "issue")?;
		if !HANDLED_ACTIONS.contains(&event.action.as_str()) {
			debug!(action = %event.action, "webhook: unhandled issues action");
			return Ok(ignored_action("issues", &event.action));
		}
		if event.issue.is_pull_request() {
			return Ok(ignored_action("issues", &event.action));
		}
		let Some(integration) = self.integration_for(event.installation.as_ref()).await? else {
			return Ok(ignored_action("issues", &event.action));
		};

		let data = self
			.sync
			.upsert_entity(
				integration.id,
				&RemoteEntity::Issue(event.issue),
				raw,
				Some(&event.repository.full_name),
			)
			.await?;
		info!(
			integration_id = %integration.id,
			action = %event.action,
			external_id = %data.external_id,
			"webhook: stored issue"
		);
		Ok(DispatchOutcome::Issue {
			external_id: data.external_id,
		})
	}

	async fn on_pull_request(&self, value: Value) -> Result<DispatchOutcome> {
		let (event, raw): (PullRequestEvent, Value) = split_payload(value, "pull_request")?;
		if !HANDLED_ACTIONS.contains(&event.action.as_str()) {
			debug!(action = %event.action, "webhook: unhandled pull_request action");
			return Ok(ignored_action("pull_request", &event.action));
		}
		let Some(integration) = self.integration_for(event.installation.as_ref()).await? else {
			return Ok(ignored_action("pull_request", &event.action));
		};

		let pr = event.pull_request;
		let data = self
			.sync
			.upsert_entity(
				integration.id,
				&RemoteEntity::PullRequest(pr.clone()),
				raw,
				Some(&event.repository.full_name),
			)
			.await?;

		let (linked_issue, closed_issue) = if event.action == "closed" {
			let closed = self.linker.handle_pr_merged(&pr).await?;
			(None, closed.map(|issue| issue.key()))
		} else {
			let linked = self.linker.link_pr_to_issue(integration.id, &pr).await?;
			(linked.map(|issue| issue.key()), None)
		};

		info!(
			integration_id = %integration.id,
			action = %event.action,
			pr = pr.number,
			"webhook: stored pull request"
		);
		Ok(DispatchOutcome::PullRequest {
			external_id: data.external_id,
			linked_issue,
			closed_issue,
		})
	}

	/// Store each pushed commit and apply its close verbs. A failing commit is
	/// logged and skipped. Commits are stored in the REST shape so webhook and
	/// sync rows for the same commit carry the same raw data.
	async fn on_push(&self, value: Value) -> Result<DispatchOutcome> {
		let event: PushEvent = serde_json::from_value(value)?;
		let Some(integration) = self.integration_for(event.installation.as_ref()).await? else {
			return Ok(ignored_action("push", ""));
		};

		let repository = event.repository.full_name.as_str();
		let project_key = integration.project_key_for(repository);
		let mut stored = 0;
		let mut closed_issues = Vec::new();

		for commit in &event.commits {
			let remote = commit.to_remote();
			let raw = serde_json::to_value(&remote)?;

			match self
				.sync
				.upsert_entity(
					integration.id,
					&RemoteEntity::Commit(remote.clone()),
					raw,
					Some(repository),
				)
				.await
			{
				Ok(_) => stored += 1,
				Err(e) => {
					warn!(sha = %remote.short_sha(), error = %e, "webhook: failed to store commit");
					continue;
				}
			}

			let committer = remote.committer_name().unwrap_or("unknown").to_string();
			match self
				.linker
				.handle_commit_magic_words(integration.id, &remote, project_key, &committer)
				.await
			{
				Ok(closed) => closed_issues.extend(closed),
				Err(e) => {
					warn!(sha = %remote.short_sha(), error = %e, "webhook: magic word handling failed");
				}
			}
		}

		info!(
			integration_id = %integration.id,
			repo = %repository,
			git_ref = %event.git_ref,
			stored,
			closed = closed_issues.len(),
			"webhook: processed push"
		);
		Ok(DispatchOutcome::Push {
			stored,
			closed_issues,
		})
	}

	/// The active integration a repository event belongs to.
	async fn integration_for(
		&self,
		installation: Option<&InstallationRef>,
	) -> Result<Option<Integration>> {
		let Some(installation) = installation else {
			debug!("webhook: event without installation, ignoring");
			return Ok(None);
		};

		match self.integrations.find_by_installation(installation.id).await? {
			Some(integration) if integration.is_active => Ok(Some(integration)),
			Some(integration) => {
				debug!(integration_id = %integration.id, "webhook: integration inactive, ignoring");
				Ok(None)
			}
			None => {
				info!(installation_id = installation.id, "webhook: unknown installation, ignoring");
				Ok(None)
			}
		}
	}
}

/// Deserialize the event and keep the untouched `field` object as the raw
/// payload.
fn split_payload<T: DeserializeOwned>(value: Value, field: &str) -> Result<(T, Value)> {
	let raw = value.get(field).cloned().unwrap_or(Value::Null);
	let event = serde_json::from_value(value)?;
	Ok((event, raw))
}

fn ignored(event: &str, value: &Value) -> DispatchOutcome {
	DispatchOutcome::Ignored {
		event: event.to_string(),
		action: value
			.get("action")
			.and_then(Value::as_str)
			.map(str::to_string),
	}
}

fn ignored_action(event: &str, action: &str) -> DispatchOutcome {
	DispatchOutcome::Ignored {
		event: event.to_string(),
		action: (!action.is_empty()).then(|| action.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::collections::BTreeMap;
	use tether_integrations_core::{ExternalType, IntegrationKind, IssueStatus, RemoteCommit};
	use tether_server_db::{create_pool, ExternalDataRepository, IntegrationRepository, IssueRepository};
	use tether_server_github_app::{
		compute_webhook_signature, GithubAppClient, GithubAppConfig, InstallationTokenCache,
	};
	use tether_server_linking::BroadcastEventBus;
	use tether_server_oauth::OAuthRegistry;
	use tether_server_sync::CredentialResolver;

	const SECRET: &str = "hook-secret";

	struct Harness {
		dispatcher: WebhookDispatcher,
		integrations: IntegrationRepository,
		external: ExternalDataRepository,
		issues: IssueRepository,
	}

	async fn harness() -> Harness {
		let pool = create_pool("sqlite::memory:").await.unwrap();
		let integrations = IntegrationRepository::new(pool.clone());
		let external = ExternalDataRepository::new(pool.clone());
		let issues = IssueRepository::new(pool);

		let github = GithubAppClient::new(
			GithubAppConfig::new(1, "unused").with_webhook_secret(SECRET),
			InstallationTokenCache::new(),
		)
		.unwrap();
		let oauth = OAuthRegistry::new(
			&BTreeMap::new(),
			None,
			tether_common_http::new_client().unwrap(),
		);
		let integration_store: Arc<dyn IntegrationStore> = Arc::new(integrations.clone());
		let credentials =
			CredentialResolver::new(github.clone(), Arc::new(oauth), integration_store.clone());
		let sync = Synchronizer::new(
			integration_store.clone(),
			Arc::new(external.clone()),
			credentials,
			github,
		);
		let linker = Linker::new(
			Arc::new(issues.clone()),
			Arc::new(external.clone()),
			Arc::new(BroadcastEventBus::default()),
		);

		Harness {
			dispatcher: WebhookDispatcher::new(Arc::new(sync), linker, integration_store),
			integrations,
			external,
			issues,
		}
	}

	async fn seed_integration(h: &Harness) -> Integration {
		let mut integration = Integration::for_installation(IntegrationKind::Github, 42);
		integration.add_repositories(["acme/api"]);
		integration
			.repository_projects
			.insert("acme/api".to_string(), "API".to_string());
		h.integrations.create_integration(&integration).await.unwrap();
		integration
	}

	async fn send(h: &Harness, event: &str, body: &Value) -> Result<DispatchOutcome> {
		let body = serde_json::to_vec(body).unwrap();
		let signature = compute_webhook_signature(SECRET, &body);
		h.dispatcher
			.dispatch(WebhookRequest {
				event,
				delivery_id: Some("delivery-1"),
				signature: Some(&signature),
				body: &body,
			})
			.await
	}

	fn repository() -> Value {
		json!({
			"id": 1,
			"name": "api",
			"full_name": "acme/api",
			"html_url": "https://github.com/acme/api"
		})
	}

	fn issues_event(action: &str) -> Value {
		json!({
			"action": action,
			"issue": {
				"id": 555,
				"number": 3,
				"title": "Crash on login",
				"state": "open",
				"html_url": "https://github.com/acme/api/issues/3"
			},
			"repository": repository(),
			"installation": {"id": 42}
		})
	}

	fn installation_created() -> Value {
		json!({
			"action": "created",
			"installation": {
				"id": 42,
				"account": {"id": 7, "login": "acme", "type": "Organization"}
			},
			"repositories": [{"id": 1, "name": "api", "full_name": "acme/api"}]
		})
	}

	#[tokio::test]
	async fn missing_signature_is_rejected() {
		let h = harness().await;
		let body = serde_json::to_vec(&installation_created()).unwrap();
		let err = h
			.dispatcher
			.dispatch(WebhookRequest {
				event: "installation",
				delivery_id: None,
				signature: None,
				body: &body,
			})
			.await
			.unwrap_err();
		assert!(matches!(err, WebhookError::MissingSignature));
		assert!(h.integrations.find_by_installation(42).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn tampered_body_is_rejected_before_any_mutation() {
		let h = harness().await;
		let body = serde_json::to_vec(&installation_created()).unwrap();
		let signature = compute_webhook_signature(SECRET, &body);
		let mut tampered = body.clone();
		tampered.extend_from_slice(b" ");

		let err = h
			.dispatcher
			.dispatch(WebhookRequest {
				event: "installation",
				delivery_id: None,
				signature: Some(&signature),
				body: &tampered,
			})
			.await
			.unwrap_err();
		assert!(err.is_authenticity_failure());
		assert!(h.integrations.find_by_installation(42).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn installation_created_creates_integration() {
		let h = harness().await;
		let outcome = send(&h, "installation", &installation_created()).await.unwrap();
		let stored = h.integrations.find_by_installation(42).await.unwrap().unwrap();
		assert_eq!(
			outcome,
			DispatchOutcome::Installation {
				integration_id: Some(stored.id)
			}
		);
		assert_eq!(stored.repositories, vec!["acme/api"]);
	}

	#[tokio::test]
	async fn issue_opened_is_stored_and_labeled_is_ignored() {
		let h = harness().await;
		let integration = seed_integration(&h).await;

		let outcome = send(&h, "issues", &issues_event("opened")).await.unwrap();
		assert_eq!(
			outcome,
			DispatchOutcome::Issue {
				external_id: "555".to_string()
			}
		);

		let outcome = send(&h, "issues", &issues_event("labeled")).await.unwrap();
		assert!(matches!(outcome, DispatchOutcome::Ignored { .. }));

		let stored = h
			.external
			.list_external_data(integration.id, Some(ExternalType::Issue))
			.await
			.unwrap();
		assert_eq!(stored.len(), 1);
		assert_eq!(stored[0].raw["title"], "Crash on login");
	}

	#[tokio::test]
	async fn unknown_installation_is_ignored() {
		let h = harness().await;
		let outcome = send(&h, "issues", &issues_event("opened")).await.unwrap();
		assert_eq!(
			outcome,
			DispatchOutcome::Ignored {
				event: "issues".to_string(),
				action: Some("opened".to_string())
			}
		);
	}

	#[tokio::test]
	async fn push_stores_commits_and_closes_mapped_issue() {
		let h = harness().await;
		let integration = seed_integration(&h).await;
		let project = h
			.issues
			.create_project("API", Uuid::new_v4(), "API")
			.await
			.unwrap();
		h.issues
			.create_issue(&project, 7, "Token refresh", IssueStatus::InProgress)
			.await
			.unwrap();

		let body = json!({
			"ref": "refs/heads/main",
			"repository": repository(),
			"installation": {"id": 42},
			"commits": [
				{
					"id": "1111111111111111111111111111111111111111",
					"message": "Fixes #7",
					"url": "https://github.com/acme/api/commit/1111111",
					"author": {"name": "Ada", "username": "ada"}
				},
				{
					"id": "2222222222222222222222222222222222222222",
					"message": "Tidy imports",
					"author": {"name": "Ada"}
				}
			]
		});

		let outcome = send(&h, "push", &body).await.unwrap();
		assert_eq!(
			outcome,
			DispatchOutcome::Push {
				stored: 2,
				closed_issues: vec!["API-7".to_string()]
			}
		);

		let issue = h.issues.find_issue("API", 7).await.unwrap().unwrap();
		assert_eq!(issue.status, IssueStatus::Done);
		let commits = h
			.external
			.list_external_data(integration.id, Some(ExternalType::Commit))
			.await
			.unwrap();
		assert_eq!(commits.len(), 2);
		for stored in &commits {
			let remote: RemoteCommit = serde_json::from_value(stored.raw.clone()).unwrap();
			assert_eq!(remote.sha, stored.external_id);
			assert!(stored.raw.get("commit").is_some());
		}
	}

	#[tokio::test]
	async fn push_from_unmapped_repository_does_not_close_bare_numbers() {
		let h = harness().await;
		let mut integration = Integration::for_installation(IntegrationKind::Github, 42);
		integration.add_repositories(["acme/web"]);
		h.integrations.create_integration(&integration).await.unwrap();
		let project = h
			.issues
			.create_project("API", Uuid::new_v4(), "API")
			.await
			.unwrap();
		h.issues
			.create_issue(&project, 7, "Token refresh", IssueStatus::Todo)
			.await
			.unwrap();

		let body = json!({
			"ref": "refs/heads/main",
			"repository": {
				"id": 2,
				"name": "web",
				"full_name": "acme/web",
				"html_url": "https://github.com/acme/web"
			},
			"installation": {"id": 42},
			"commits": [{
				"id": "3333333333333333333333333333333333333333",
				"message": "fixes #7",
				"author": {"name": "Mallory"}
			}]
		});

		let outcome = send(&h, "push", &body).await.unwrap();
		assert_eq!(
			outcome,
			DispatchOutcome::Push {
				stored: 1,
				closed_issues: vec![]
			}
		);
		let issue = h.issues.find_issue("API", 7).await.unwrap().unwrap();
		assert_eq!(issue.status, IssueStatus::Todo);
	}

	#[tokio::test]
	async fn merged_pull_request_closes_branch_issue() {
		let h = harness().await;
		seed_integration(&h).await;
		let project = h
			.issues
			.create_project("API", Uuid::new_v4(), "API")
			.await
			.unwrap();
		h.issues
			.create_issue(&project, 12, "SSO", IssueStatus::InReview)
			.await
			.unwrap();

		let pr_event = |action: &str, merged: bool| {
			let state = if merged { "closed" } else { "open" };
			json!({
				"action": action,
				"pull_request": {
					"id": 9001,
					"number": 4,
					"title": "Add SSO",
					"state": state,
					"html_url": "https://github.com/acme/api/pull/4",
					"head": {"ref": "feature/API-12-sso", "sha": "abc"},
					"base": {"ref": "main", "sha": "def"},
					"merged": merged
				},
				"repository": repository(),
				"installation": {"id": 42}
			})
		};

		let opened = send(&h, "pull_request", &pr_event("opened", false)).await.unwrap();
		assert_eq!(
			opened,
			DispatchOutcome::PullRequest {
				external_id: "9001".to_string(),
				linked_issue: Some("API-12".to_string()),
				closed_issue: None
			}
		);

		let closed = send(&h, "pull_request", &pr_event("closed", true)).await.unwrap();
		assert_eq!(
			closed,
			DispatchOutcome::PullRequest {
				external_id: "9001".to_string(),
				linked_issue: None,
				closed_issue: Some("API-12".to_string())
			}
		);
		let issue = h.issues.find_issue("API", 12).await.unwrap().unwrap();
		assert_eq!(issue.status, IssueStatus::Done);
	}

	#[tokio::test]
	async fn ping_and_other_events() {
		let h = harness().await;
		assert_eq!(
			send(&h, "ping", &json!({"zen": "Keep it logically awesome."}))
				.await
				.unwrap(),
			DispatchOutcome::Pong
		);
		assert_eq!(
			send(&h, "star", &json!({"action": "created"})).await.unwrap(),
			DispatchOutcome::Ignored {
				event: "star".to_string(),
				action: Some("created".to_string())
			}
		);
	}
}
