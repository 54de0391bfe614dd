// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Signed app assertions for GitHub App authentication.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::GithubAppError;

/// Backdate to tolerate clock drift between us and GitHub.
const CLOCK_SKEW_SECS: i64 = 30;

/// Assertion lifetime. GitHub accepts at most ten minutes.
const ASSERTION_VALIDITY_SECS: i64 = 5 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
	pub iat: i64,
	pub exp: i64,
	/// GitHub App ID
	pub iss: String,
}

/// Generate a short-lived RS256 assertion identifying the app.
///
/// `iat` is backdated 30 seconds and `exp` is five minutes from now. A key
/// that cannot be parsed yields [`GithubAppError::KeyParse`]; any other
/// signing failure yields [`GithubAppError::Signing`].
#[instrument(skip(private_key_pem))]
pub fn generate_signed_assertion(
	app_id: u64,
	private_key_pem: &str,
) -> Result<String, GithubAppError> {
	let now = Utc::now().timestamp();

	let claims = Claims {
		iat: now - CLOCK_SKEW_SECS,
		exp: now + ASSERTION_VALIDITY_SECS,
		iss: app_id.to_string(),
	};

	let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
		.map_err(|e| GithubAppError::KeyParse(e.to_string()))?;

	let token = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
		.map_err(|e| GithubAppError::Signing(e.to_string()))?;

	debug!(app_id, exp = claims.exp, "Generated GitHub App assertion");

	Ok(token)
}
