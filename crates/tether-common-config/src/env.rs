// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Environment helpers for secrets.
//!
//! Secrets can be supplied either inline (`VAR=value`) or through a mounted
//! file (`VAR_FILE=/run/secrets/value`), the convention used by Docker and
//! Kubernetes secret mounts. The file form wins when both are set.

use std::path::PathBuf;
use std::{env, fs};

use thiserror::Error;

use crate::secret::{Secret, SecretString};

/// Errors raised while loading a secret from the environment.
#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },

	#[error("required secret not found: set either {var} or {var}_FILE")]
	Missing { var: String },
}

/// Load an optional secret using the `VAR` / `VAR_FILE` convention.
///
/// A single trailing newline is stripped from file contents. Empty inline
/// values are treated as unset.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;

		let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(Secret::new(value)));
	}

	match env::var(var) {
		Ok(value) if !value.is_empty() => Ok(Some(Secret::new(value))),
		_ => Ok(None),
	}
}

/// Load a secret that must be present.
pub fn require_secret_env(var: &str) -> Result<SecretString, SecretEnvError> {
	load_secret_env(var)?.ok_or_else(|| SecretEnvError::Missing {
		var: var.to_string(),
	})
}

/// Turn a newline-escaped PEM (`-----BEGIN ...-----\nMIIE...`) into a real
/// multi-line PEM. Also drops surrounding quotes and `\r` left by env files.
pub fn normalize_pem(raw: &str) -> String {
	raw
		.trim()
		.trim_matches('"')
		.replace("\\r\\n", "\n")
		.replace("\\n", "\n")
		.replace('\r', "")
}
