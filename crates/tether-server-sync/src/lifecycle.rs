// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App installation lifecycle: `installation` and
//! `installation_repositories` events mutate the integration they belong to.

use tether_integrations_core::{Integration, IntegrationKind};
use tether_server_github_app::{InstallationRepositoriesWebhookPayload, InstallationWebhookPayload};
use tracing::{debug, info, instrument};

use crate::engine::Synchronizer;
use crate::error::Result;

impl Synchronizer {
	/// Apply an `installation` event. Returns the affected integration, or
	/// `None` when the event referred to an unknown installation or an
	/// action that changes nothing.
	#[instrument(
		skip(self, payload),
		fields(installation_id = payload.installation.id, action = %payload.action)
	)]
	pub async fn handle_installation_event(
		&self,
		payload: &InstallationWebhookPayload,
	) -> Result<Option<Integration>> {
		let installation_id = payload.installation.id;
		let existing = self
			.integrations
			.find_by_installation(installation_id)
			.await?;

		match payload.action.as_str() {
			"created" => {
				let account = &payload.installation.account;
				let integration = match existing {
					Some(mut integration) => {
						integration.is_active = true;
						integration.account_login = Some(account.login.clone());
						integration.account_type = Some(account.account_type.clone());
						integration.add_repositories(payload.repository_names());
						self.integrations.update_integration(&integration).await?;
						info!(integration_id = %integration.id, "Reactivated installation integration");
						integration
					}
					None => {
						let mut integration =
							Integration::for_installation(IntegrationKind::Github, installation_id);
						integration.account_login = Some(account.login.clone());
						integration.account_type = Some(account.account_type.clone());
						integration.add_repositories(payload.repository_names());
						self.integrations.create_integration(&integration).await?;
						info!(
							integration_id = %integration.id,
							account = %account.login,
							repositories = integration.repositories.len(),
							"Created installation integration"
						);
						integration
					}
				};
				Ok(Some(integration))
			}
			"deleted" | "suspend" | "unsuspend" => {
				if payload.action == "deleted" {
					self.github.token_cache().invalidate(installation_id).await;
				}

				let Some(mut integration) = existing else {
					info!(installation_id, "No integration for installation, ignoring");
					return Ok(None);
				};

				integration.is_active = payload.action == "unsuspend";
				self
					.integrations
					.set_active(integration.id, integration.is_active)
					.await?;
				info!(
					integration_id = %integration.id,
					active = integration.is_active,
					"Installation state changed"
				);
				Ok(Some(integration))
			}
			other => {
				debug!(action = other, "Unhandled installation action");
				Ok(None)
			}
		}
	}

	/// Apply an `installation_repositories` event: `added` merges without
	/// duplicates, `removed` takes the set difference and drops the project
	/// mapping of each removed repository.
	#[instrument(
		skip(self, payload),
		fields(installation_id = payload.installation.id, action = %payload.action)
	)]
	pub async fn handle_installation_repositories_event(
		&self,
		payload: &InstallationRepositoriesWebhookPayload,
	) -> Result<Option<Integration>> {
		let Some(mut integration) = self
			.integrations
			.find_by_installation(payload.installation.id)
			.await?
		else {
			info!(
				installation_id = payload.installation.id,
				"No integration for installation, ignoring"
			);
			return Ok(None);
		};

		let unmapped: Vec<&str> = payload
			.repositories_removed
			.iter()
			.map(|r| r.full_name.as_str())
			.filter(|name| integration.project_key_for(name).is_some())
			.collect();

		integration.add_repositories(payload.repositories_added.iter().map(|r| r.full_name.clone()));
		integration.remove_repositories(payload.repositories_removed.iter().map(|r| &r.full_name));

		self
			.integrations
			.set_repositories(integration.id, &integration.repositories)
			.await?;
		for repository in unmapped {
			self
				.integrations
				.set_repository_project(integration.id, repository, None)
				.await?;
			debug!(integration_id = %integration.id, repository, "Dropped project mapping");
		}
		info!(
			integration_id = %integration.id,
			repositories = integration.repositories.len(),
			"Updated tracked repositories"
		);
		Ok(Some(integration))
	}
}
