// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Installation token cache.
//!
//! The cache is an explicit object owned by whoever builds the client and
//! may be shared between clients. Entries live in memory only; they are
//! always regenerable from the app's signing key.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tether_common_config::SecretString;
use tokio::sync::Mutex;
use tracing::info;

/// A cached token is reused only while it has more than this left.
pub const TOKEN_REFRESH_BUFFER: Duration = Duration::minutes(5);

#[derive(Debug, Clone)]
pub struct CachedInstallationToken {
	pub token: SecretString,
	pub expires_at: DateTime<Utc>,
}

impl CachedInstallationToken {
	pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
		Self {
			token: SecretString::new(token.into()),
			expires_at,
		}
	}

	/// True while the token has more than [`TOKEN_REFRESH_BUFFER`] left.
	pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
		self.expires_at - now > TOKEN_REFRESH_BUFFER
	}
}

/// Installation tokens keyed by installation id, with one fetch lock per
/// installation so concurrent callers converge on a single refresh.
#[derive(Debug, Clone, Default)]
pub struct InstallationTokenCache {
	tokens: Arc<Mutex<HashMap<i64, CachedInstallationToken>>>,
	locks: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl InstallationTokenCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Cached token for `installation_id` if it is still fresh at `now`.
	pub async fn get_valid(&self, installation_id: i64, now: DateTime<Utc>) -> Option<SecretString> {
		let tokens = self.tokens.lock().await;
		tokens
			.get(&installation_id)
			.filter(|cached| cached.is_fresh_at(now))
			.map(|cached| cached.token.clone())
	}

	/// Insert or replace the entry for `installation_id`.
	pub async fn insert(&self, installation_id: i64, token: CachedInstallationToken) {
		self.tokens.lock().await.insert(installation_id, token);
	}

	/// Drop the entry for `installation_id` and its fetch lock unless a fetch
	/// holds it. Returns whether a token was cached.
	pub async fn invalidate(&self, installation_id: i64) -> bool {
		let removed = self.tokens.lock().await.remove(&installation_id).is_some();
		{
			let mut locks = self.locks.lock().await;
			if locks
				.get(&installation_id)
				.is_some_and(|lock| Arc::strong_count(lock) == 1)
			{
				locks.remove(&installation_id);
			}
		}
		if removed {
			info!(installation_id, "Invalidated installation token cache");
		}
		removed
	}

	/// Fetch lock for one installation.
	pub(crate) async fn lock_for(&self, installation_id: i64) -> Arc<Mutex<()>> {
		let mut locks = self.locks.lock().await;
		locks
			.entry(installation_id)
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}

	pub async fn len(&self) -> usize {
		self.tokens.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.tokens.lock().await.is_empty()
	}
}
