// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Idempotent table creation.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const STATEMENTS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS integrations (
		id TEXT PRIMARY KEY NOT NULL,
		kind TEXT NOT NULL,
		is_active INTEGER NOT NULL DEFAULT 1,
		health TEXT NOT NULL DEFAULT 'healthy',
		installation_id INTEGER UNIQUE,
		account_type TEXT,
		account_login TEXT,
		access_token TEXT,
		refresh_token TEXT,
		token_expires_at TEXT,
		repositories TEXT NOT NULL DEFAULT '[]',
		repository_projects TEXT NOT NULL DEFAULT '{}',
		last_sync_at TEXT,
		last_error_at TEXT,
		last_error_message TEXT,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS external_data (
		id TEXT PRIMARY KEY NOT NULL,
		integration_id TEXT NOT NULL,
		external_id TEXT NOT NULL,
		external_type TEXT NOT NULL,
		raw_data TEXT NOT NULL,
		mapped_data TEXT NOT NULL,
		search_text TEXT NOT NULL,
		last_sync_at TEXT NOT NULL,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		UNIQUE (integration_id, external_id, external_type)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS search_index (
		integration_id TEXT NOT NULL,
		external_id TEXT NOT NULL,
		content_type TEXT NOT NULL,
		title TEXT NOT NULL,
		content TEXT NOT NULL,
		metadata TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		PRIMARY KEY (integration_id, external_id, content_type)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS projects (
		id TEXT PRIMARY KEY NOT NULL,
		key TEXT NOT NULL UNIQUE,
		organization_id TEXT NOT NULL,
		name TEXT NOT NULL,
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS issues (
		id TEXT PRIMARY KEY NOT NULL,
		project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
		number INTEGER NOT NULL,
		title TEXT NOT NULL,
		status TEXT NOT NULL,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		UNIQUE (project_id, number)
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_external_data_integration ON external_data(integration_id, external_type)",
];

/// Create every table and index this crate uses, if missing.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in STATEMENTS {
		sqlx::query(statement).execute(pool).await?;
	}
	Ok(())
}
