// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Health check types and component checks.

use std::time::{Duration, Instant};

use serde::Serialize;
use tether_server_db::SqlitePool;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
	pub status: HealthStatus,
	pub latency_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookHealth {
	pub status: HealthStatus,
	/// Deliveries are rejected while no webhook secret is configured.
	pub accepting_deliveries: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
	pub database: DatabaseHealth,
	pub webhooks: WebhookHealth,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub timestamp: String,
	pub duration_ms: u64,
	pub version: &'static str,
	pub components: HealthComponents,
}

const DB_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

pub async fn check_database(pool: &SqlitePool) -> DatabaseHealth {
	let start = Instant::now();
	let result = timeout(DB_CHECK_TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await;
	let latency_ms = start.elapsed().as_millis() as u64;

	match result {
		Ok(Ok(_)) => DatabaseHealth {
			status: HealthStatus::Healthy,
			latency_ms,
			error: None,
		},
		Ok(Err(e)) => DatabaseHealth {
			status: HealthStatus::Unhealthy,
			latency_ms,
			error: Some(e.to_string()),
		},
		Err(_) => DatabaseHealth {
			status: HealthStatus::Unhealthy,
			latency_ms,
			error: Some("timeout".to_string()),
		},
	}
}

pub fn check_webhooks(enabled: bool) -> WebhookHealth {
	WebhookHealth {
		status: if enabled {
			HealthStatus::Healthy
		} else {
			HealthStatus::Degraded
		},
		accepting_deliveries: enabled,
	}
}

/// Unhealthy if the database is; degraded if anything else is.
pub fn aggregate_status(components: &HealthComponents) -> HealthStatus {
	if components.database.status == HealthStatus::Unhealthy {
		return HealthStatus::Unhealthy;
	}
	if components.database.status == HealthStatus::Degraded
		|| components.webhooks.status != HealthStatus::Healthy
	{
		return HealthStatus::Degraded;
	}
	HealthStatus::Healthy
}

#[cfg(test)]
mod tests {
	use super::*;

	fn database(status: HealthStatus) -> DatabaseHealth {
		DatabaseHealth {
			status,
			latency_ms: 1,
			error: None,
		}
	}

	#[test]
	fn database_failure_dominates() {
		let components = HealthComponents {
			database: database(HealthStatus::Unhealthy),
			webhooks: check_webhooks(false),
		};
		assert_eq!(aggregate_status(&components), HealthStatus::Unhealthy);
	}

	#[test]
	fn missing_webhook_secret_degrades() {
		let components = HealthComponents {
			database: database(HealthStatus::Healthy),
			webhooks: check_webhooks(false),
		};
		assert_eq!(aggregate_status(&components), HealthStatus::Degraded);

		let components = HealthComponents {
			database: database(HealthStatus::Healthy),
			webhooks: check_webhooks(true),
		};
		assert_eq!(aggregate_status(&components), HealthStatus::Healthy);
	}

	#[tokio::test]
	async fn in_memory_database_is_healthy() {
		let pool = tether_server_db::create_pool("sqlite::memory:").await.unwrap();
		let health = check_database(&pool).await;
		assert_eq!(health.status, HealthStatus::Healthy);
		assert!(health.error.is_none());
	}
}
