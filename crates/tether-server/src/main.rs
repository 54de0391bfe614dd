// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Tether server binary.

use std::path::PathBuf;

use clap::Parser;
use tether_server::{build_state, create_router, events::spawn_event_logger, run_sync_loop};
use tether_server_config::LogFormat;
use tokio_util::sync::CancellationToken;
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tether server - syncs repositories, issues, pull requests and commits from
/// connected integrations.
#[derive(Parser, Debug)]
#[command(name = "tether-server", about = "Tether integration sync server", version)]
struct Args {
	/// Config file to read instead of /etc/tether/server.toml
	#[arg(long, env = "TETHER_SERVER_CONFIG")]
	config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => tether_server_config::load_config_with_file(path.clone())?,
		None => tether_server_config::load_config()?,
	};

	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());
	match config.logging.format {
		LogFormat::Json => tracing_subscriber::registry()
			.with(filter)
			.with(tracing_subscriber::fmt::layer().json())
			.init(),
		LogFormat::Pretty => tracing_subscriber::registry()
			.with(filter)
			.with(tracing_subscriber::fmt::layer())
			.init(),
	}

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting tether-server"
	);

	let pool = tether_server_db::create_pool(&config.database.url).await?;

	let cancel = CancellationToken::new();
	let state = build_state(&config, pool, cancel.clone())?;

	let event_logger = spawn_event_logger(&state.events, cancel.clone());
	let sync_task = config.sync.interval().map(|interval| {
		tokio::spawn(run_sync_loop(
			state.sync.clone(),
			state.integrations.clone(),
			interval,
			cancel.clone(),
		))
	});
	if sync_task.is_none() {
		tracing::info!("Periodic sync disabled");
	}

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	// Run server with graceful shutdown
	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	cancel.cancel();
	if let Some(task) = sync_task {
		if let Err(e) = task.await {
			tracing::warn!(error = %e, "Sync loop did not stop cleanly");
		}
	}
	if let Err(e) = event_logger.await {
		tracing::warn!(error = %e, "Event logger did not stop cleanly");
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
