// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file and environment
//! variables.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tether_common_config::load_secret_env;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, GithubAppConfigLayer, HttpConfigLayer, LogFormat, LoggingConfigLayer,
	OAuthConfigLayer, OAuthProviderConfigLayer, SyncConfigLayer, OAUTH_KINDS,
};

/// Default config file location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/tether/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source. Defaults are applied when layers are finalized,
/// so this contributes an empty layer.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `TETHER_SERVER_<SECTION>_<FIELD>`. Secrets also accept a
/// `_FILE` suffix pointing at a mounted file.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(load_database_from_env()),
			logging: Some(load_logging_from_env()?),
			sync: Some(load_sync_from_env()?),
			oauth: Some(load_oauth_from_env()?),
			github_app: Some(load_github_app_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {} value '{v}'", std::any::type_name::<T>()),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("TETHER_SERVER_HOST"),
		port: env_parse("TETHER_SERVER_PORT")?,
		base_url: env_var("TETHER_SERVER_BASE_URL"),
	})
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("TETHER_SERVER_DATABASE_URL"),
	}
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("TETHER_SERVER_LOG_FORMAT") {
		Some(v) => Some(v.parse::<LogFormat>().map_err(|message| ConfigError::InvalidValue {
			key: "TETHER_SERVER_LOG_FORMAT".to_string(),
			message,
		})?),
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("TETHER_SERVER_LOG_LEVEL"),
		format,
	})
}

fn load_sync_from_env() -> Result<SyncConfigLayer, ConfigError> {
	Ok(SyncConfigLayer {
		per_page: env_parse("TETHER_SERVER_SYNC_PER_PAGE")?,
		max_pages: env_parse("TETHER_SERVER_SYNC_MAX_PAGES")?,
		interval_secs: env_parse("TETHER_SERVER_SYNC_INTERVAL_SECS")?,
		request_timeout_secs: env_parse("TETHER_SERVER_SYNC_REQUEST_TIMEOUT_SECS")?,
		retry_max: env_parse("TETHER_SERVER_SYNC_RETRY_MAX")?,
		retry_initial_delay_ms: env_parse("TETHER_SERVER_SYNC_RETRY_INITIAL_DELAY_MS")?,
		retry_max_delay_ms: env_parse("TETHER_SERVER_SYNC_RETRY_MAX_DELAY_MS")?,
		slow_down_threshold: env_parse("TETHER_SERVER_SYNC_SLOW_DOWN_THRESHOLD")?,
	})
}

fn load_oauth_from_env() -> Result<OAuthConfigLayer, ConfigError> {
	let mut providers = BTreeMap::new();

	for kind in OAUTH_KINDS {
		let prefix = format!("TETHER_SERVER_{}", kind.to_ascii_uppercase());
		let layer = OAuthProviderConfigLayer {
			client_id: env_var(&format!("{prefix}_CLIENT_ID")),
			client_secret: load_secret_env(&format!("{prefix}_CLIENT_SECRET"))?,
			redirect_uri: env_var(&format!("{prefix}_REDIRECT_URI")),
			authorize_url: env_var(&format!("{prefix}_AUTHORIZE_URL")),
			token_url: env_var(&format!("{prefix}_TOKEN_URL")),
			scopes: env_var(&format!("{prefix}_SCOPES")).map(|s| {
				s.split([',', ' '])
					.map(str::trim)
					.filter(|s| !s.is_empty())
					.map(str::to_string)
					.collect()
			}),
		};
		providers.insert(kind.to_string(), layer);
	}

	Ok(OAuthConfigLayer { providers })
}

fn load_github_app_from_env() -> Result<GithubAppConfigLayer, ConfigError> {
	Ok(GithubAppConfigLayer {
		app_id: env_parse("TETHER_SERVER_GITHUB_APP_ID")?,
		private_key_pem: load_secret_env("TETHER_SERVER_GITHUB_APP_PRIVATE_KEY")?,
		webhook_secret: load_secret_env("TETHER_SERVER_GITHUB_APP_WEBHOOK_SECRET")?,
		app_slug: env_var("TETHER_SERVER_GITHUB_APP_SLUG"),
		base_url: env_var("TETHER_SERVER_GITHUB_APP_BASE_URL"),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn test_defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.sync.is_none());
	}

	#[test]
	fn test_toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/tether.toml").load().unwrap();
		assert!(layer.http.is_none());
	}

	#[test]
	fn test_toml_source_reads_sections() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
[http]
port = 9090

[sync]
per_page = 20

[oauth.github]
client_id = "gh-id"

[github_app]
app_id = 42
app_slug = "tether-dev"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.http.unwrap().port, Some(9090));
		assert_eq!(layer.sync.unwrap().per_page, Some(20));
		assert_eq!(
			layer.oauth.unwrap().providers["github"].client_id.as_deref(),
			Some("gh-id")
		);
		let app = layer.github_app.unwrap();
		assert_eq!(app.app_id, Some(42));
		assert_eq!(app.app_slug.as_deref(), Some("tether-dev"));
	}

	#[test]
	fn test_toml_source_reports_parse_errors() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "[http]\nport = \"not a number\"").unwrap();
		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}
}
