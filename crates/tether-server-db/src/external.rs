// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! External data and its search projection.
//!
//! Both tables are keyed by `(integration_id, external_id, type)` and written
//! with `INSERT .. ON CONFLICT DO UPDATE`, so concurrent syncs of the same
//! entity converge on one row.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};
use tether_integrations_core::{ExternalData, ExternalType, SearchIndexEntry};
use uuid::Uuid;

use crate::convert::{parse_enum, parse_ts, parse_uuid};
use crate::error::DbError;

const DEFAULT_SEARCH_LIMIT: u32 = 50;

#[async_trait]
pub trait ExternalDataStore: Send + Sync {
	/// Insert or update by key. Returns the id of the stored row, which is
	/// the id of the first insert for that key.
	async fn upsert_external_data(&self, data: &ExternalData) -> Result<Uuid, DbError>;
	async fn get_external_data(
		&self,
		integration_id: Uuid,
		external_id: &str,
		external_type: ExternalType,
	) -> Result<Option<ExternalData>, DbError>;
	async fn list_external_data(
		&self,
		integration_id: Uuid,
		external_type: Option<ExternalType>,
	) -> Result<Vec<ExternalData>, DbError>;
	async fn upsert_search_entry(&self, entry: &SearchIndexEntry) -> Result<(), DbError>;
	async fn search(
		&self,
		integration_id: Uuid,
		query: &str,
		limit: Option<u32>,
	) -> Result<Vec<SearchIndexEntry>, DbError>;
}

#[derive(Clone)]
pub struct ExternalDataRepository {
	pool: SqlitePool,
}

/// Escape LIKE wildcards so user text matches literally.
fn like_pattern(query: &str) -> String {
	let escaped = query
		.replace('\\', "\\\\")
		.replace('%', "\\%")
		.replace('_', "\\_");
	format!("%{escaped}%")
}

impl ExternalDataRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(
		skip(self, data),
		fields(integration_id = %data.integration_id, external_id = %data.external_id, external_type = %data.external_type)
	)]
	pub async fn upsert_external_data(&self, data: &ExternalData) -> Result<Uuid, DbError> {
		let row = sqlx::query(
			r#"
			INSERT INTO external_data (
				id, integration_id, external_id, external_type, raw_data, mapped_data,
				search_text, last_sync_at, created_at, updated_at
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT (integration_id, external_id, external_type) DO UPDATE SET
				raw_data = excluded.raw_data,
				mapped_data = excluded.mapped_data,
				search_text = excluded.search_text,
				last_sync_at = excluded.last_sync_at,
				updated_at = excluded.updated_at
			RETURNING id
			"#,
		)
		.bind(data.id.to_string())
		.bind(data.integration_id.to_string())
		.bind(&data.external_id)
		.bind(data.external_type.as_str())
		.bind(serde_json::to_string(&data.raw)?)
		.bind(serde_json::to_string(&data.mapped)?)
		.bind(&data.search_text)
		.bind(data.last_sync_at.to_rfc3339())
		.bind(data.created_at.to_rfc3339())
		.bind(data.updated_at.to_rfc3339())
		.fetch_one(&self.pool)
		.await?;

		let id: String = row.get("id");
		parse_uuid(&id)
	}

	#[tracing::instrument(skip(self), fields(integration_id = %integration_id))]
	pub async fn get_external_data(
		&self,
		integration_id: Uuid,
		external_id: &str,
		external_type: ExternalType,
	) -> Result<Option<ExternalData>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, integration_id, external_id, external_type, raw_data, mapped_data,
				search_text, last_sync_at, created_at, updated_at
			FROM external_data
			WHERE integration_id = ? AND external_id = ? AND external_type = ?
			"#,
		)
		.bind(integration_id.to_string())
		.bind(external_id)
		.bind(external_type.as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_external_data(&r)).transpose()
	}

	/// Rows for an integration in insertion order, optionally of one type.
	#[tracing::instrument(skip(self), fields(integration_id = %integration_id))]
	pub async fn list_external_data(
		&self,
		integration_id: Uuid,
		external_type: Option<ExternalType>,
	) -> Result<Vec<ExternalData>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, integration_id, external_id, external_type, raw_data, mapped_data,
				search_text, last_sync_at, created_at, updated_at
			FROM external_data
			WHERE integration_id = ? AND (? IS NULL OR external_type = ?)
			ORDER BY rowid ASC
			"#,
		)
		.bind(integration_id.to_string())
		.bind(external_type.map(|t| t.as_str()))
		.bind(external_type.map(|t| t.as_str()))
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_external_data).collect()
	}

	#[tracing::instrument(
		skip(self, entry),
		fields(integration_id = %entry.integration_id, external_id = %entry.external_id)
	)]
	pub async fn upsert_search_entry(&self, entry: &SearchIndexEntry) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO search_index (
				integration_id, external_id, content_type, title, content, metadata, updated_at
			)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT (integration_id, external_id, content_type) DO UPDATE SET
				title = excluded.title,
				content = excluded.content,
				metadata = excluded.metadata,
				updated_at = excluded.updated_at
			"#,
		)
		.bind(entry.integration_id.to_string())
		.bind(&entry.external_id)
		.bind(entry.content_type.as_str())
		.bind(&entry.title)
		.bind(&entry.content)
		.bind(serde_json::to_string(&entry.metadata)?)
		.bind(entry.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Case-insensitive substring match on title or content, most recently
	/// updated first.
	#[tracing::instrument(skip(self, query), fields(integration_id = %integration_id))]
	pub async fn search(
		&self,
		integration_id: Uuid,
		query: &str,
		limit: Option<u32>,
	) -> Result<Vec<SearchIndexEntry>, DbError> {
		let pattern = like_pattern(query.trim());
		let rows = sqlx::query(
			r#"
			SELECT integration_id, external_id, content_type, title, content, metadata, updated_at
			FROM search_index
			WHERE integration_id = ?
				AND (title LIKE ? ESCAPE '\' OR content LIKE ? ESCAPE '\')
			ORDER BY updated_at DESC
			LIMIT ?
			"#,
		)
		.bind(integration_id.to_string())
		.bind(&pattern)
		.bind(&pattern)
		.bind(i64::from(limit.unwrap_or(DEFAULT_SEARCH_LIMIT)))
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_search_entry).collect()
	}
}

#[async_trait]
impl ExternalDataStore for ExternalDataRepository {
	async fn upsert_external_data(&self, data: &ExternalData) -> Result<Uuid, DbError> {
		self.upsert_external_data(data).await
	}

	async fn get_external_data(
		&self,
		integration_id: Uuid,
		external_id: &str,
		external_type: ExternalType,
	) -> Result<Option<ExternalData>, DbError> {
		self
			.get_external_data(integration_id, external_id, external_type)
			.await
	}

	async fn list_external_data(
		&self,
		integration_id: Uuid,
		external_type: Option<ExternalType>,
	) -> Result<Vec<ExternalData>, DbError> {
		self.list_external_data(integration_id, external_type).await
	}

	async fn upsert_search_entry(&self, entry: &SearchIndexEntry) -> Result<(), DbError> {
		self.upsert_search_entry(entry).await
	}

	async fn search(
		&self,
		integration_id: Uuid,
		query: &str,
		limit: Option<u32>,
	) -> Result<Vec<SearchIndexEntry>, DbError> {
		self.search(integration_id, query, limit).await
	}
}

fn row_to_external_data(row: &sqlx::sqlite::SqliteRow) -> Result<ExternalData, DbError> {
	let id: String = row.get("id");
	let integration_id: String = row.get("integration_id");
	let external_type: String = row.get("external_type");
	let raw: String = row.get("raw_data");
	let mapped: String = row.get("mapped_data");
	let last_sync_at: String = row.get("last_sync_at");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(ExternalData {
		id: parse_uuid(&id)?,
		integration_id: parse_uuid(&integration_id)?,
		external_id: row.get("external_id"),
		external_type: parse_enum(&external_type, "external type")?,
		raw: serde_json::from_str(&raw)?,
		mapped: serde_json::from_str(&mapped)?,
		search_text: row.get("search_text"),
		last_sync_at: parse_ts(&last_sync_at)?,
		created_at: parse_ts(&created_at)?,
		updated_at: parse_ts(&updated_at)?,
	})
}

fn row_to_search_entry(row: &sqlx::sqlite::SqliteRow) -> Result<SearchIndexEntry, DbError> {
	let integration_id: String = row.get("integration_id");
	let content_type: String = row.get("content_type");
	let metadata: String = row.get("metadata");
	let updated_at: String = row.get("updated_at");

	Ok(SearchIndexEntry {
		integration_id: parse_uuid(&integration_id)?,
		external_id: row.get("external_id"),
		content_type: parse_enum(&content_type, "content type")?,
		title: row.get("title"),
		content: row.get("content"),
		metadata: serde_json::from_str(&metadata)?,
		updated_at: parse_ts(&updated_at)?,
	})
}
