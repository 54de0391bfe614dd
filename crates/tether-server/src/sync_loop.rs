// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Periodic sync of every active integration.

use std::sync::Arc;
use std::time::Duration;

use tether_server_db::IntegrationStore;
use tether_server_sync::Synchronizer;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
	pub synced: usize,
	pub failed: usize,
	/// Active integrations of a kind with nothing to sync.
	pub skipped: usize,
}

/// Sync each active GitHub integration once. A failing integration does not
/// stop the others; the synchronizer records its error.
pub async fn run_sync_cycle(
	sync: &Synchronizer,
	integrations: &dyn IntegrationStore,
	cancel: &CancellationToken,
) -> CycleSummary {
	let mut summary = CycleSummary::default();

	let active = match integrations.list_active_integrations().await {
		Ok(active) => active,
		Err(e) => {
			error!(error = %e, "sync_loop: failed to list active integrations");
			return summary;
		}
	};

	for integration in active {
		if cancel.is_cancelled() {
			info!("sync_loop: cycle cancelled");
			break;
		}
		if !integration.kind.supports_sync() {
			debug!(integration_id = %integration.id, kind = %integration.kind, "sync_loop: skipping");
			summary.skipped += 1;
			continue;
		}
		match sync.sync_integration(integration.id).await {
			Ok(_) => summary.synced += 1,
			Err(e) => {
				warn!(integration_id = %integration.id, error = %e, "sync_loop: integration sync failed");
				summary.failed += 1;
			}
		}
	}

	summary
}

/// Run a cycle every `interval` until `cancel` fires. The first cycle starts
/// immediately.
pub async fn run_sync_loop(
	sync: Arc<Synchronizer>,
	integrations: Arc<dyn IntegrationStore>,
	interval: Duration,
	cancel: CancellationToken,
) {
	let mut ticker = tokio::time::interval(interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	info!(interval_secs = interval.as_secs(), "sync_loop: started");

	loop {
		tokio::select! {
			_ = cancel.cancelled() => break,
			_ = ticker.tick() => {}
		}

		let summary = run_sync_cycle(&sync, integrations.as_ref(), &cancel).await;
		info!(
			synced = summary.synced,
			failed = summary.failed,
			skipped = summary.skipped,
			"sync_loop: cycle complete"
		);
	}

	info!("sync_loop: stopped");
}
