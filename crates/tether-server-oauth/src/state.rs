// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pending OAuth `state` values.
//!
//! A state is minted per authorize redirect and consumed exactly once by the
//! callback. Unknown, reused, expired or cross-kind states are rejected.

use std::collections::HashMap;
use std::time::Duration;

use rand::RngCore;
use tether_integrations_core::IntegrationKind;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

pub const DEFAULT_STATE_TTL: Duration = Duration::from_secs(600);
pub const MAX_PENDING_STATES: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct PendingState {
	kind: IntegrationKind,
	issued_at: Instant,
}

#[derive(Debug)]
pub struct OAuthStateStore {
	pending: Mutex<HashMap<String, PendingState>>,
	ttl: Duration,
	capacity: usize,
}

impl Default for OAuthStateStore {
	fn default() -> Self {
		Self::new(DEFAULT_STATE_TTL, MAX_PENDING_STATES)
	}
}

impl OAuthStateStore {
	pub fn new(ttl: Duration, capacity: usize) -> Self {
		Self {
			pending: Mutex::new(HashMap::new()),
			ttl,
			capacity: capacity.max(1),
		}
	}

	/// Mint a fresh random state for `kind`.
	pub async fn issue(&self, kind: IntegrationKind) -> String {
		let mut bytes = [0u8; 32];
		rand::thread_rng().fill_bytes(&mut bytes);
		let state = hex::encode(bytes);

		let now = Instant::now();
		let mut pending = self.pending.lock().await;
		pending.retain(|_, p| now.duration_since(p.issued_at) <= self.ttl);

		if pending.len() >= self.capacity {
			if let Some(oldest) = pending
				.iter()
				.min_by_key(|(_, p)| p.issued_at)
				.map(|(k, _)| k.clone())
			{
				warn!("OAuth state store full, evicting oldest pending state");
				pending.remove(&oldest);
			}
		}

		pending.insert(
			state.clone(),
			PendingState {
				kind,
				issued_at: now,
			},
		);
		state
	}

	/// Consume a state. True only for a known, unexpired state issued for
	/// the same kind. A state can be consumed once.
	pub async fn consume(&self, state: &str, kind: IntegrationKind) -> bool {
		let Some(entry) = self.pending.lock().await.remove(state) else {
			return false;
		};

		if entry.kind != kind {
			warn!(expected = %entry.kind, got = %kind, "OAuth state presented for wrong integration kind");
			return false;
		}

		entry.issued_at.elapsed() <= self.ttl
	}

	pub async fn len(&self) -> usize {
		self.pending.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.pending.lock().await.is_empty()
	}
}
