// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Inbound GitHub webhook handling.
//!
//! [`WebhookDispatcher::dispatch`] checks the `X-Hub-Signature-256` header
//! against the raw body first and rejects the delivery outright on mismatch.
//! Verified deliveries are routed by `X-GitHub-Event`:
//!
//! - `issues`, `pull_request`: stored through the synchronizer; pull requests
//!   are also linked to the issue named by their branch, and close it when
//!   merged
//! - `push`: each commit is stored and its close verbs applied
//! - `installation`, `installation_repositories`: lifecycle updates
//! - anything else is acknowledged and ignored

pub mod dispatcher;
pub mod error;
pub mod events;

pub use dispatcher::{DispatchOutcome, WebhookDispatcher, WebhookRequest};
pub use error::{Result, WebhookError};
pub use events::EventKind;
