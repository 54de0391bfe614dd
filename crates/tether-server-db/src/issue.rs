// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Minimal project and issue tables backing the linking engine.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use tether_integrations_core::{Issue, IssueStatus, ProjectRef};
use uuid::Uuid;

use crate::convert::{parse_enum, parse_ts, parse_uuid};
use crate::error::{conflict_or, DbError};

#[async_trait]
pub trait IssueStore: Send + Sync {
	/// Look up `PROJECT-NUMBER`. The project key match is case-insensitive.
	async fn find_issue(&self, project_key: &str, number: i64) -> Result<Option<Issue>, DbError>;
	async fn save_issue(&self, issue: &Issue) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct IssueRepository {
	pool: SqlitePool,
}

impl IssueRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, name))]
	pub async fn create_project(
		&self,
		key: &str,
		organization_id: Uuid,
		name: &str,
	) -> Result<ProjectRef, DbError> {
		let project = ProjectRef {
			id: Uuid::new_v4(),
			key: key.to_ascii_uppercase(),
			organization_id,
		};

		sqlx::query(
			r#"
			INSERT INTO projects (id, key, organization_id, name, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(project.id.to_string())
		.bind(&project.key)
		.bind(project.organization_id.to_string())
		.bind(name)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| conflict_or(e, "Project"))?;

		Ok(project)
	}

	#[tracing::instrument(skip(self, project, title), fields(project = %project.key))]
	pub async fn create_issue(
		&self,
		project: &ProjectRef,
		number: i64,
		title: &str,
		status: IssueStatus,
	) -> Result<Issue, DbError> {
		let now = Utc::now();
		let issue = Issue {
			id: Uuid::new_v4(),
			number,
			title: title.to_string(),
			status,
			project: project.clone(),
			updated_at: now,
		};

		sqlx::query(
			r#"
			INSERT INTO issues (id, project_id, number, title, status, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(issue.id.to_string())
		.bind(project.id.to_string())
		.bind(number)
		.bind(title)
		.bind(status.as_str())
		.bind(now.to_rfc3339())
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| conflict_or(e, "Issue"))?;

		Ok(issue)
	}

	#[tracing::instrument(skip(self))]
	pub async fn find_issue(&self, project_key: &str, number: i64) -> Result<Option<Issue>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT i.id, i.number, i.title, i.status, i.updated_at,
				p.id AS project_id, p.key AS project_key, p.organization_id
			FROM issues i
			JOIN projects p ON p.id = i.project_id
			WHERE p.key = ? AND i.number = ?
			"#,
		)
		.bind(project_key.to_ascii_uppercase())
		.bind(number)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_issue(&r)).transpose()
	}

	#[tracing::instrument(skip(self, issue), fields(issue_id = %issue.id))]
	pub async fn save_issue(&self, issue: &Issue) -> Result<(), DbError> {
		let result = sqlx::query(
			"UPDATE issues SET title = ?, status = ?, updated_at = ? WHERE id = ?",
		)
		.bind(&issue.title)
		.bind(issue.status.as_str())
		.bind(Utc::now().to_rfc3339())
		.bind(issue.id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("Issue {} not found", issue.id)));
		}
		Ok(())
	}
}

#[async_trait]
impl IssueStore for IssueRepository {
	async fn find_issue(&self, project_key: &str, number: i64) -> Result<Option<Issue>, DbError> {
		self.find_issue(project_key, number).await
	}

	async fn save_issue(&self, issue: &Issue) -> Result<(), DbError> {
		self.save_issue(issue).await
	}
}

fn row_to_issue(row: &sqlx::sqlite::SqliteRow) -> Result<Issue, DbError> {
	let id: String = row.get("id");
	let status: String = row.get("status");
	let updated_at: String = row.get("updated_at");
	let project_id: String = row.get("project_id");
	let organization_id: String = row.get("organization_id");

	Ok(Issue {
		id: parse_uuid(&id)?,
		number: row.get("number"),
		title: row.get("title"),
		status: parse_enum(&status, "issue status")?,
		project: ProjectRef {
			id: parse_uuid(&project_id)?,
			key: row.get("project_key"),
			organization_id: parse_uuid(&organization_id)?,
		},
		updated_at: parse_ts(&updated_at)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn make_repo() -> IssueRepository {
		IssueRepository::new(crate::testing::create_test_pool().await)
	}

	#[tokio::test]
	async fn test_create_and_find_issue() {
		let repo = make_repo().await;
		let project = repo.create_project("proj", Uuid::new_v4(), "Project").await.unwrap();
		assert_eq!(project.key, "PROJ");
		repo
			.create_issue(&project, 123, "Crash on start", IssueStatus::Todo)
			.await
			.unwrap();

		let found = repo.find_issue("PROJ", 123).await.unwrap().unwrap();
		assert_eq!(found.key(), "PROJ-123");
		assert_eq!(found.status, IssueStatus::Todo);
		assert_eq!(found.project, project);

		assert!(repo.find_issue("proj", 123).await.unwrap().is_some());
		assert!(repo.find_issue("PROJ", 124).await.unwrap().is_none());
		assert!(repo.find_issue("OTHER", 123).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_save_issue_updates_status() {
		let repo = make_repo().await;
		let project = repo.create_project("API", Uuid::new_v4(), "API").await.unwrap();
		let mut issue = repo
			.create_issue(&project, 1, "Title", IssueStatus::InProgress)
			.await
			.unwrap();

		issue.status = IssueStatus::Done;
		repo.save_issue(&issue).await.unwrap();

		let found = repo.find_issue("API", 1).await.unwrap().unwrap();
		assert_eq!(found.status, IssueStatus::Done);
	}

	#[tokio::test]
	async fn test_duplicate_project_key_conflicts() {
		let repo = make_repo().await;
		repo.create_project("API", Uuid::new_v4(), "API").await.unwrap();
		assert!(matches!(
			repo.create_project("api", Uuid::new_v4(), "Other").await,
			Err(DbError::Conflict(_))
		));
	}
}
