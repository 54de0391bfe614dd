// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Pull repositories, issues, pull requests and commits from GitHub and store
//! them as [`ExternalData`].
//!
//! A failed listing or an unparsable item is counted and skipped; only
//! integration lookup and credential resolution abort a call.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tether_integrations_core::{
	AuthModel, EntityMetadata, ExternalData, ExternalType, HealthStatus, Integration, RemoteCommit,
	RemoteEntity, RemoteIssue, RemotePullRequest, RemoteRepository,
};
use tether_server_db::{ExternalDataStore, IntegrationStore};
use tether_server_github_app::{GithubAppClient, GithubAppError, ListOutcome, Listing};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::credentials::{Credential, CredentialResolver};
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
	pub per_page: u32,
	pub max_pages: u32,
}

impl Default for SyncOptions {
	fn default() -> Self {
		Self {
			per_page: 100,
			max_pages: 50,
		}
	}
}

/// What one sync call stored and what it had to leave behind.
#[derive(Debug, Default)]
pub struct SyncReport {
	pub stored: Vec<ExternalData>,
	/// Items deliberately not stored, e.g. pull requests in an issue listing.
	pub skipped: usize,
	pub failed: usize,
}

impl SyncReport {
	pub fn merge(&mut self, other: SyncReport) {
		self.stored.extend(other.stored);
		self.skipped += other.skipped;
		self.failed += other.failed;
	}

	pub fn count(&self, external_type: ExternalType) -> usize {
		self
			.stored
			.iter()
			.filter(|d| d.external_type == external_type)
			.count()
	}

	pub fn health(&self) -> HealthStatus {
		if self.failed == 0 {
			HealthStatus::Healthy
		} else {
			HealthStatus::Degraded
		}
	}
}

#[derive(Clone)]
pub struct Synchronizer {
	pub(crate) integrations: Arc<dyn IntegrationStore>,
	external: Arc<dyn ExternalDataStore>,
	credentials: CredentialResolver,
	pub(crate) github: GithubAppClient,
	options: SyncOptions,
}

impl Synchronizer {
	pub fn new(
		integrations: Arc<dyn IntegrationStore>,
		external: Arc<dyn ExternalDataStore>,
		credentials: CredentialResolver,
		github: GithubAppClient,
	) -> Self {
		Self {
			integrations,
			external,
			credentials,
			github,
			options: SyncOptions::default(),
		}
	}

	pub fn with_options(mut self, options: SyncOptions) -> Self {
		self.options = options;
		self
	}

	pub fn github(&self) -> &GithubAppClient {
		&self.github
	}

	/// Sync everything for one integration: repositories, then issues, pull
	/// requests and commits of each tracked repository. With no tracked
	/// repositories the ones just discovered are used.
	#[instrument(skip(self), fields(integration_id = %integration_id))]
	pub async fn sync_integration(&self, integration_id: Uuid) -> Result<SyncReport> {
		let integration = self.load(integration_id).await?;
		if !integration.is_active {
			return Err(SyncError::Inactive(integration_id));
		}
		let credential = self.credential_for(&integration).await?;

		let mut report = self.repositories_with(&integration, &credential).await;

		let repositories = if integration.repositories.is_empty() {
			discovered_repositories(&report)
		} else {
			integration.repositories.clone()
		};

		for repository in &repositories {
			report.merge(self.issues_with(&integration, &credential, repository).await);
			report.merge(
				self
					.pull_requests_with(&integration, &credential, repository)
					.await,
			);
			report.merge(self.commits_with(&integration, &credential, repository).await);
		}

		self.finish(&integration, &report).await?;
		info!(
			integration_id = %integration_id,
			repositories = repositories.len(),
			stored = report.stored.len(),
			skipped = report.skipped,
			failed = report.failed,
			"Integration sync complete"
		);
		Ok(report)
	}

	#[instrument(skip(self), fields(integration_id = %integration_id))]
	pub async fn sync_repositories(&self, integration_id: Uuid) -> Result<SyncReport> {
		let integration = self.load(integration_id).await?;
		let credential = self.credential_for(&integration).await?;
		let report = self.repositories_with(&integration, &credential).await;
		self.finish(&integration, &report).await?;
		Ok(report)
	}

	#[instrument(skip(self), fields(integration_id = %integration_id, repo = %repository))]
	pub async fn sync_issues(&self, integration_id: Uuid, repository: &str) -> Result<SyncReport> {
		let integration = self.load(integration_id).await?;
		let credential = self.credential_for(&integration).await?;
		let report = self.issues_with(&integration, &credential, repository).await;
		self.finish(&integration, &report).await?;
		Ok(report)
	}

	#[instrument(skip(self), fields(integration_id = %integration_id, repo = %repository))]
	pub async fn sync_pull_requests(
		&self,
		integration_id: Uuid,
		repository: &str,
	) -> Result<SyncReport> {
		let integration = self.load(integration_id).await?;
		let credential = self.credential_for(&integration).await?;
		let report = self
			.pull_requests_with(&integration, &credential, repository)
			.await;
		self.finish(&integration, &report).await?;
		Ok(report)
	}

	#[instrument(skip(self), fields(integration_id = %integration_id, repo = %repository))]
	pub async fn sync_commits(&self, integration_id: Uuid, repository: &str) -> Result<SyncReport> {
		let integration = self.load(integration_id).await?;
		let credential = self.credential_for(&integration).await?;
		let report = self.commits_with(&integration, &credential, repository).await;
		self.finish(&integration, &report).await?;
		Ok(report)
	}

	/// Store one entity and its search projection. Re-storing the same
	/// entity updates the existing row.
	pub async fn upsert_entity(
		&self,
		integration_id: Uuid,
		entity: &RemoteEntity,
		raw: Value,
		repository: Option<&str>,
	) -> Result<ExternalData> {
		let mut data = ExternalData::new(
			integration_id,
			entity.external_id(),
			entity.external_type(),
			raw,
			entity.normalize(repository),
		);
		data.id = self.external.upsert_external_data(&data).await?;
		self.external.upsert_search_entry(&data.search_entry()).await?;

		debug!(
			integration_id = %integration_id,
			external_type = %data.external_type,
			external_id = %data.external_id,
			"Stored external entity"
		);
		Ok(data)
	}

	/// Load an integration that can be synced. Kinds other than GitHub are
	/// rejected before any credential is resolved or sent anywhere.
	async fn load(&self, integration_id: Uuid) -> Result<Integration> {
		let integration = self
			.integrations
			.get_integration(integration_id)
			.await?
			.ok_or(SyncError::IntegrationNotFound(integration_id))?;
		if !integration.kind.supports_sync() {
			return Err(SyncError::UnsupportedKind {
				id: integration_id,
				kind: integration.kind,
			});
		}
		Ok(integration)
	}

	/// Resolve credentials, marking the integration unhealthy when that fails.
	async fn credential_for(&self, integration: &Integration) -> Result<Credential> {
		match self.credentials.resolve(integration).await {
			Ok(credential) => Ok(credential),
			Err(e) => {
				error!(integration_id = %integration.id, error = %e, "Failed to resolve credentials");
				if let Err(db_err) = self
					.integrations
					.record_error(integration.id, HealthStatus::Error, &e.to_string(), Utc::now())
					.await
				{
					warn!(integration_id = %integration.id, error = %db_err, "Failed to record sync error");
				}
				Err(e)
			}
		}
	}

	async fn finish(&self, integration: &Integration, report: &SyncReport) -> Result<()> {
		let now = Utc::now();
		let health = report.health();
		self
			.integrations
			.touch_sync(integration.id, now, health)
			.await?;

		if report.failed > 0 {
			let message = format!("{} item(s) failed to sync", report.failed);
			self
				.integrations
				.record_error(integration.id, health, &message, now)
				.await?;
		}
		Ok(())
	}

	async fn fetch(
		&self,
		credential: &Credential,
		listing: &Listing,
	) -> std::result::Result<ListOutcome, GithubAppError> {
		let client = &self.github;
		let SyncOptions {
			per_page,
			max_pages,
		} = self.options;

		match credential {
			Credential::Installation(installation_id) => {
				client
					.execute_with_installation_token(*installation_id, move |token| async move {
						client
							.list_all(token.expose(), listing, per_page, max_pages)
							.await
					})
					.await
			}
			Credential::Bearer(token) => {
				client
					.list_all(token.expose(), listing, per_page, max_pages)
					.await
			}
		}
	}

	/// Fetch a listing and store every item `into_entity` accepts.
	async fn sync_listing<T, F>(
		&self,
		integration: &Integration,
		credential: &Credential,
		listing: Listing,
		repository: Option<&str>,
		into_entity: F,
	) -> SyncReport
	where
		T: DeserializeOwned,
		F: Fn(T) -> Option<RemoteEntity>,
	{
		let mut report = SyncReport::default();

		let items = match self.fetch(credential, &listing).await {
			Ok(ListOutcome { items, error, .. }) => {
				if let Some(e) = error {
					warn!(
						integration_id = %integration.id,
						listing = ?listing,
						kept = items.len(),
						error = %e,
						"Listing ended early, storing fetched items"
					);
					report.failed += 1;
				}
				items
			}
			Err(e) => {
				warn!(
					integration_id = %integration.id,
					listing = ?listing,
					error = %e,
					"Failed to fetch listing, continuing"
				);
				report.failed += 1;
				return report;
			}
		};

		for raw in items {
			let parsed = match serde_json::from_value::<T>(raw.clone()) {
				Ok(parsed) => parsed,
				Err(e) => {
					warn!(listing = ?listing, error = %e, "Skipping unparsable item");
					report.failed += 1;
					continue;
				}
			};

			let Some(entity) = into_entity(parsed) else {
				report.skipped += 1;
				continue;
			};

			match self
				.upsert_entity(integration.id, &entity, raw, repository)
				.await
			{
				Ok(data) => report.stored.push(data),
				Err(e) => {
					warn!(
						external_id = %entity.external_id(),
						error = %e,
						"Failed to store entity, continuing"
					);
					report.failed += 1;
				}
			}
		}

		report
	}

	async fn repositories_with(&self, integration: &Integration, credential: &Credential) -> SyncReport {
		let listing = match integration.auth_model() {
			AuthModel::AppInstallation(_) => Listing::InstallationRepositories,
			AuthModel::OAuth => Listing::UserRepositories,
		};
		self
			.sync_listing(integration, credential, listing, None, |repo: RemoteRepository| {
				Some(RemoteEntity::Repository(repo))
			})
			.await
	}

	/// Issue listings also return pull requests; those are skipped.
	async fn issues_with(
		&self,
		integration: &Integration,
		credential: &Credential,
		repository: &str,
	) -> SyncReport {
		let listing = Listing::Issues {
			repository: repository.to_string(),
		};
		self
			.sync_listing(
				integration,
				credential,
				listing,
				Some(repository),
				|issue: RemoteIssue| {
					if issue.is_pull_request() {
						None
					} else {
						Some(RemoteEntity::Issue(issue))
					}
				},
			)
			.await
	}

	async fn pull_requests_with(
		&self,
		integration: &Integration,
		credential: &Credential,
		repository: &str,
	) -> SyncReport {
		let listing = Listing::PullRequests {
			repository: repository.to_string(),
		};
		self
			.sync_listing(
				integration,
				credential,
				listing,
				Some(repository),
				|pr: RemotePullRequest| Some(RemoteEntity::PullRequest(pr)),
			)
			.await
	}

	async fn commits_with(
		&self,
		integration: &Integration,
		credential: &Credential,
		repository: &str,
	) -> SyncReport {
		let listing = Listing::Commits {
			repository: repository.to_string(),
		};
		self
			.sync_listing(
				integration,
				credential,
				listing,
				Some(repository),
				|commit: RemoteCommit| Some(RemoteEntity::Commit(commit)),
			)
			.await
	}
}

fn discovered_repositories(report: &SyncReport) -> Vec<String> {
	report
		.stored
		.iter()
		.filter_map(|d| match &d.mapped.metadata {
			EntityMetadata::Repository { full_name, .. } => Some(full_name.clone()),
			_ => None,
		})
		.collect()
}
