// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Activity log of link events until a notification consumer subscribes.

use tether_server_linking::{BroadcastEventBus, LinkEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub fn spawn_event_logger(bus: &BroadcastEventBus, cancel: CancellationToken) -> JoinHandle<()> {
	let mut receiver = bus.subscribe();
	tokio::spawn(async move {
		loop {
			let event = tokio::select! {
				_ = cancel.cancelled() => break,
				event = receiver.recv() => event,
			};
			match event {
				Ok(LinkEvent::CommitClosedIssue {
					issue_id,
					issue_key,
					commit_sha,
					commit_url,
					committer,
				}) => {
					tracing::info!(
						issue_id = %issue_id,
						issue_key = %issue_key,
						commit = %commit_sha,
						commit_url = commit_url.as_deref().unwrap_or("-"),
						committer = %committer,
						"activity: issue closed by commit"
					);
				}
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "activity: event logger lagged");
				}
				Err(RecvError::Closed) => break,
			}
		}
	})
}
