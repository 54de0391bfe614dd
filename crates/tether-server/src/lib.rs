// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Tether server: webhook receiver, OAuth connect flow, manual and periodic
//! sync.

use axum::{
	routing::{get, post, put},
	Router,
};

pub mod error;
pub mod events;
pub mod health;
pub mod routes;
pub mod state;
pub mod sync_loop;

pub use error::{ErrorResponse, ServerError};
pub use state::{build_state, AppState};
pub use sync_loop::{run_sync_cycle, run_sync_loop, CycleSummary};

pub fn create_router(state: AppState) -> Router {
	// Routes under /api/integrations share one segment name; the router
	// rejects differing names at the same position.
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route(
			"/api/webhooks/github",
			post(routes::webhooks::github_webhook),
		)
		.route(
			"/api/integrations/{integration}/authorize",
			get(routes::integrations::authorize),
		)
		.route(
			"/api/integrations/{integration}/callback",
			get(routes::integrations::callback),
		)
		.route(
			"/api/integrations/{integration}/install",
			get(routes::integrations::install),
		)
		.route(
			"/api/integrations/{integration}/sync",
			post(routes::integrations::trigger_sync),
		)
		.route(
			"/api/integrations/{integration}/repositories/{owner}/{name}/project",
			put(routes::integrations::set_repository_project)
				.delete(routes::integrations::clear_repository_project),
		)
		.with_state(state)
}
