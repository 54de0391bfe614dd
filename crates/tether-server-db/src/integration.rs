// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use tether_common_config::SecretString;
use tether_integrations_core::{repository_key, HealthStatus, Integration};
use uuid::Uuid;

use crate::convert::{parse_enum, parse_opt_ts, parse_ts, parse_uuid};
use crate::error::{conflict_or, DbError};

#[async_trait]
pub trait IntegrationStore: Send + Sync {
	async fn create_integration(&self, integration: &Integration) -> Result<(), DbError>;
	async fn get_integration(&self, id: Uuid) -> Result<Option<Integration>, DbError>;
	async fn find_by_installation(
		&self,
		installation_id: i64,
	) -> Result<Option<Integration>, DbError>;
	async fn list_active_integrations(&self) -> Result<Vec<Integration>, DbError>;
	async fn update_integration(&self, integration: &Integration) -> Result<(), DbError>;
	async fn update_tokens(
		&self,
		id: Uuid,
		access_token: &SecretString,
		refresh_token: Option<&SecretString>,
		expires_at: Option<DateTime<Utc>>,
	) -> Result<(), DbError>;
	async fn touch_sync(
		&self,
		id: Uuid,
		at: DateTime<Utc>,
		health: HealthStatus,
	) -> Result<(), DbError>;
	async fn record_error(
		&self,
		id: Uuid,
		health: HealthStatus,
		message: &str,
		at: DateTime<Utc>,
	) -> Result<(), DbError>;
	async fn set_active(&self, id: Uuid, active: bool) -> Result<(), DbError>;
	async fn set_repositories(&self, id: Uuid, repositories: &[String]) -> Result<(), DbError>;
	async fn set_repository_project(
		&self,
		id: Uuid,
		repository: &str,
		project_key: Option<&str>,
	) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct IntegrationRepository {
	pool: SqlitePool,
}

const SELECT_COLUMNS: &str = r#"
	SELECT id, kind, is_active, health, installation_id, account_type, account_login,
		access_token, refresh_token, token_expires_at, repositories, repository_projects,
		last_sync_at, last_error_at, last_error_message, created_at, updated_at
	FROM integrations
"#;

fn secret_str(secret: &Option<SecretString>) -> Option<&str> {
	secret.as_ref().map(|s| s.expose().as_str())
}

impl IntegrationRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn check_updated(result: sqlx::sqlite::SqliteQueryResult, id: Uuid) -> Result<(), DbError> {
		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("Integration {id} not found")));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self, integration), fields(integration_id = %integration.id, kind = %integration.kind))]
	pub async fn create_integration(&self, integration: &Integration) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO integrations (
				id, kind, is_active, health, installation_id, account_type, account_login,
				access_token, refresh_token, token_expires_at, repositories, repository_projects,
				last_sync_at, last_error_at, last_error_message, created_at, updated_at
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(integration.id.to_string())
		.bind(integration.kind.as_str())
		.bind(integration.is_active)
		.bind(integration.health.as_str())
		.bind(integration.installation_id)
		.bind(&integration.account_type)
		.bind(&integration.account_login)
		.bind(secret_str(&integration.access_token))
		.bind(secret_str(&integration.refresh_token))
		.bind(integration.token_expires_at.map(|t| t.to_rfc3339()))
		.bind(serde_json::to_string(&integration.repositories)?)
		.bind(serde_json::to_string(&integration.repository_projects)?)
		.bind(integration.last_sync_at.map(|t| t.to_rfc3339()))
		.bind(integration.last_error_at.map(|t| t.to_rfc3339()))
		.bind(&integration.last_error_message)
		.bind(integration.created_at.to_rfc3339())
		.bind(integration.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| conflict_or(e, "Integration"))?;

		Ok(())
	}

	#[tracing::instrument(skip(self), fields(integration_id = %id))]
	pub async fn get_integration(&self, id: Uuid) -> Result<Option<Integration>, DbError> {
		let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_integration(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn find_by_installation(
		&self,
		installation_id: i64,
	) -> Result<Option<Integration>, DbError> {
		let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE installation_id = ?"))
			.bind(installation_id)
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_integration(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_active_integrations(&self) -> Result<Vec<Integration>, DbError> {
		let rows = sqlx::query(&format!(
			"{SELECT_COLUMNS} WHERE is_active = 1 ORDER BY created_at ASC"
		))
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_integration).collect()
	}

	/// Overwrite every mutable column from `integration`.
	#[tracing::instrument(skip(self, integration), fields(integration_id = %integration.id))]
	pub async fn update_integration(&self, integration: &Integration) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			UPDATE integrations
			SET is_active = ?, health = ?, installation_id = ?, account_type = ?, account_login = ?,
				access_token = ?, refresh_token = ?, token_expires_at = ?, repositories = ?,
				repository_projects = ?, last_sync_at = ?, last_error_at = ?, last_error_message = ?,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(integration.is_active)
		.bind(integration.health.as_str())
		.bind(integration.installation_id)
		.bind(&integration.account_type)
		.bind(&integration.account_login)
		.bind(secret_str(&integration.access_token))
		.bind(secret_str(&integration.refresh_token))
		.bind(integration.token_expires_at.map(|t| t.to_rfc3339()))
		.bind(serde_json::to_string(&integration.repositories)?)
		.bind(serde_json::to_string(&integration.repository_projects)?)
		.bind(integration.last_sync_at.map(|t| t.to_rfc3339()))
		.bind(integration.last_error_at.map(|t| t.to_rfc3339()))
		.bind(&integration.last_error_message)
		.bind(Utc::now().to_rfc3339())
		.bind(integration.id.to_string())
		.execute(&self.pool)
		.await
		.map_err(|e| conflict_or(e, "Integration"))?;

		Self::check_updated(result, integration.id)
	}

	#[tracing::instrument(skip(self, access_token, refresh_token), fields(integration_id = %id))]
	pub async fn update_tokens(
		&self,
		id: Uuid,
		access_token: &SecretString,
		refresh_token: Option<&SecretString>,
		expires_at: Option<DateTime<Utc>>,
	) -> Result<(), DbError> {
		// A refresh response without a new refresh token keeps the old one.
		let result = sqlx::query(
			r#"
			UPDATE integrations
			SET access_token = ?, refresh_token = COALESCE(?, refresh_token), token_expires_at = ?,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(access_token.expose().as_str())
		.bind(refresh_token.map(|s| s.expose().as_str()))
		.bind(expires_at.map(|t| t.to_rfc3339()))
		.bind(Utc::now().to_rfc3339())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		Self::check_updated(result, id)
	}

	#[tracing::instrument(skip(self), fields(integration_id = %id))]
	pub async fn touch_sync(
		&self,
		id: Uuid,
		at: DateTime<Utc>,
		health: HealthStatus,
	) -> Result<(), DbError> {
		let result = sqlx::query(
			"UPDATE integrations SET last_sync_at = ?, health = ?, updated_at = ? WHERE id = ?",
		)
		.bind(at.to_rfc3339())
		.bind(health.as_str())
		.bind(Utc::now().to_rfc3339())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		Self::check_updated(result, id)
	}

	#[tracing::instrument(skip(self, message), fields(integration_id = %id))]
	pub async fn record_error(
		&self,
		id: Uuid,
		health: HealthStatus,
		message: &str,
		at: DateTime<Utc>,
	) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			UPDATE integrations
			SET health = ?, last_error_at = ?, last_error_message = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(health.as_str())
		.bind(at.to_rfc3339())
		.bind(message)
		.bind(Utc::now().to_rfc3339())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		Self::check_updated(result, id)
	}

	#[tracing::instrument(skip(self), fields(integration_id = %id))]
	pub async fn set_active(&self, id: Uuid, active: bool) -> Result<(), DbError> {
		let result = sqlx::query("UPDATE integrations SET is_active = ?, updated_at = ? WHERE id = ?")
			.bind(active)
			.bind(Utc::now().to_rfc3339())
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		Self::check_updated(result, id)
	}

	#[tracing::instrument(skip(self, repositories), fields(integration_id = %id, count = repositories.len()))]
	pub async fn set_repositories(&self, id: Uuid, repositories: &[String]) -> Result<(), DbError> {
		let result =
			sqlx::query("UPDATE integrations SET repositories = ?, updated_at = ? WHERE id = ?")
				.bind(serde_json::to_string(repositories)?)
				.bind(Utc::now().to_rfc3339())
				.bind(id.to_string())
				.execute(&self.pool)
				.await?;

		Self::check_updated(result, id)
	}

	/// Map a repository to a project key, or drop the mapping with `None`.
	#[tracing::instrument(skip(self), fields(integration_id = %id))]
	pub async fn set_repository_project(
		&self,
		id: Uuid,
		repository: &str,
		project_key: Option<&str>,
	) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;

		let row = sqlx::query("SELECT repository_projects FROM integrations WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&mut *tx)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("Integration {id} not found")))?;
		let stored: String = row.get("repository_projects");
		let mut projects = serde_json::from_str::<BTreeMap<String, String>>(&stored)?;

		let key = repository_key(repository);
		match project_key {
			Some(project_key) => {
				projects.insert(key, project_key.to_string());
			}
			None => {
				projects.remove(&key);
			}
		}

		sqlx::query("UPDATE integrations SET repository_projects = ?, updated_at = ? WHERE id = ?")
			.bind(serde_json::to_string(&projects)?)
			.bind(Utc::now().to_rfc3339())
			.bind(id.to_string())
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;
		Ok(())
	}
}

#[async_trait]
impl IntegrationStore for IntegrationRepository {
	async fn create_integration(&self, integration: &Integration) -> Result<(), DbError> {
		self.create_integration(integration).await
	}

	async fn get_integration(&self, id: Uuid) -> Result<Option<Integration>, DbError> {
		self.get_integration(id).await
	}

	async fn find_by_installation(
		&self,
		installation_id: i64,
	) -> Result<Option<Integration>, DbError> {
		self.find_by_installation(installation_id).await
	}

	async fn list_active_integrations(&self) -> Result<Vec<Integration>, DbError> {
		self.list_active_integrations().await
	}

	async fn update_integration(&self, integration: &Integration) -> Result<(), DbError> {
		self.update_integration(integration).await
	}

	async fn update_tokens(
		&self,
		id: Uuid,
		access_token: &SecretString,
		refresh_token: Option<&SecretString>,
		expires_at: Option<DateTime<Utc>>,
	) -> Result<(), DbError> {
		self
			.update_tokens(id, access_token, refresh_token, expires_at)
			.await
	}

	async fn touch_sync(
		&self,
		id: Uuid,
		at: DateTime<Utc>,
		health: HealthStatus,
	) -> Result<(), DbError> {
		self.touch_sync(id, at, health).await
	}

	async fn record_error(
		&self,
		id: Uuid,
		health: HealthStatus,
		message: &str,
		at: DateTime<Utc>,
	) -> Result<(), DbError> {
		self.record_error(id, health, message, at).await
	}

	async fn set_active(&self, id: Uuid, active: bool) -> Result<(), DbError> {
		self.set_active(id, active).await
	}

	async fn set_repositories(&self, id: Uuid, repositories: &[String]) -> Result<(), DbError> {
		self.set_repositories(id, repositories).await
	}

	async fn set_repository_project(
		&self,
		id: Uuid,
		repository: &str,
		project_key: Option<&str>,
	) -> Result<(), DbError> {
		self
			.set_repository_project(id, repository, project_key)
			.await
	}
}

fn row_to_integration(row: &sqlx::sqlite::SqliteRow) -> Result<Integration, DbError> {
	let id: String = row.get("id");
	let kind: String = row.get("kind");
	let health: String = row.get("health");
	let access_token: Option<String> = row.get("access_token");
	let refresh_token: Option<String> = row.get("refresh_token");
	let repositories: String = row.get("repositories");
	let repository_projects: String = row.get("repository_projects");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(Integration {
		id: parse_uuid(&id)?,
		kind: parse_enum(&kind, "integration kind")?,
		is_active: row.get("is_active"),
		health: parse_enum(&health, "health status")?,
		installation_id: row.get("installation_id"),
		account_type: row.get("account_type"),
		account_login: row.get("account_login"),
		access_token: access_token.map(SecretString::new),
		refresh_token: refresh_token.map(SecretString::new),
		token_expires_at: parse_opt_ts(row.get("token_expires_at"))?,
		repositories: serde_json::from_str::<Vec<String>>(&repositories)?,
		repository_projects: serde_json::from_str::<BTreeMap<String, String>>(&repository_projects)?,
		last_sync_at: parse_opt_ts(row.get("last_sync_at"))?,
		last_error_at: parse_opt_ts(row.get("last_error_at"))?,
		last_error_message: row.get("last_error_message"),
		created_at: parse_ts(&created_at)?,
		updated_at: parse_ts(&updated_at)?,
	})
}
