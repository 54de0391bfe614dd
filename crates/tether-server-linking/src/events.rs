// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Domain events emitted when linking changes an issue.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkEvent {
	CommitClosedIssue {
		issue_id: Uuid,
		issue_key: String,
		/// Short form, first seven characters.
		commit_sha: String,
		commit_url: Option<String>,
		committer: String,
	},
}

/// Fire-and-forget sink for [`LinkEvent`]s.
pub trait EventBus: Send + Sync {
	fn emit(&self, event: LinkEvent);
}

/// In-process bus; every subscriber sees every event emitted after it
/// subscribed.
#[derive(Debug, Clone)]
pub struct BroadcastEventBus {
	sender: broadcast::Sender<LinkEvent>,
}

impl Default for BroadcastEventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CHANNEL_CAPACITY)
	}
}

impl BroadcastEventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
		self.sender.subscribe()
	}
}

impl EventBus for BroadcastEventBus {
	fn emit(&self, event: LinkEvent) {
		if self.sender.send(event).is_err() {
			debug!("No event subscribers, dropping link event");
		}
	}
}
