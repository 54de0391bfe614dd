// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the tether server.
//!
//! Layers are merged in precedence order (defaults, then
//! `/etc/tether/server.toml`, then `TETHER_SERVER_*` environment variables)
//! and finalized into a [`ServerConfig`].
//!
//! ```ignore
//! let config = tether_server_config::load_config()?;
//! println!("listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH,
};

use std::path::PathBuf;

use tracing::{debug, info, warn};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub sync: SyncConfig,
	pub oauth: OAuthConfig,
	pub github_app: Option<GithubAppConfig>,
}

impl ServerConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from the system config file and the environment.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer, applying defaults and validation.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().finalize();
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let sync = layer.sync.unwrap_or_default().build()?;
	let oauth = layer.oauth.unwrap_or_default().finalize();
	let github_app = match layer.github_app {
		Some(app) => app.build()?,
		None => None,
	};

	if let Some(app) = &github_app {
		if app.webhook_secret().is_none() {
			warn!("GitHub App webhook secret not configured; webhooks will be rejected");
		}
	}
	for (kind, provider) in &oauth.providers {
		if !provider.has_client_credentials() {
			warn!(kind = %kind, "OAuth client credentials incomplete; flow will fail when started");
		}
	}

	info!(
		host = %http.host,
		port = http.port,
		database = %database.url,
		sync_interval_secs = sync.interval_secs,
		oauth_providers = oauth.providers.len(),
		github_app_configured = github_app.is_some(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		database,
		logging,
		sync,
		oauth,
		github_app,
	})
}
