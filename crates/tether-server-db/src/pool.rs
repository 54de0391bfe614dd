// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{
	SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;

use crate::error::DbError;
use crate::schema::ensure_schema;

/// Create a SqlitePool with WAL mode and make sure the tables exist.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./tether.db")
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid, or `DbError::Sqlx` if
/// connecting or creating tables fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.create_if_missing(true);

	// An in-memory database lives and dies with its one connection.
	let pool_options = if database_url.contains(":memory:") {
		SqlitePoolOptions::new()
			.max_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
	} else {
		SqlitePoolOptions::new().max_connections(8)
	};

	let pool = pool_options
		.connect_with(options)
		.await?;

	ensure_schema(&pool).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn memory_pool_keeps_one_database() {
		let pool = create_pool("sqlite::memory:").await.unwrap();
		sqlx::query("INSERT INTO projects (id, key, organization_id, name, created_at) VALUES ('p', 'K', 'o', 'n', 't')")
			.execute(&pool)
			.await
			.unwrap();
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(count, 1);
	}

	#[tokio::test]
	async fn file_pool_creates_schema() {
		let dir = tempfile::tempdir().unwrap();
		let url = format!("sqlite:{}", dir.path().join("tether.db").display());
		let pool = create_pool(&url).await.unwrap();

		let (count,): (i64,) = sqlx::query_as(
			"SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'external_data'",
		)
		.fetch_one(&pool)
		.await
		.unwrap();
		assert_eq!(count, 1);
	}
}
