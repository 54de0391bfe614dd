// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Domain types shared by the tether sync, linking and webhook crates.
//!
//! - [`Integration`]: one configured connection to a remote account
//! - [`ExternalData`]: one normalized remote entity, unique per
//!   `(integration_id, external_id, external_type)`
//! - [`RemoteEntity`]: typed remote payloads, each normalized by its own
//!   function into a [`NormalizedRecord`]

pub mod external;
pub mod integration;
pub mod issue;
pub mod kind;
pub mod remote;

pub use external::{
	EntityMetadata, ExternalData, ExternalType, NormalizedRecord, SearchIndexEntry, SOURCE_GITHUB,
};
pub use integration::{repository_key, AuthModel, HealthStatus, Integration};
pub use issue::{Issue, IssueStatus, ProjectRef};
pub use kind::{IntegrationKind, ParseKindError};
pub use remote::{
	RemoteBranchRef, RemoteCommit, RemoteCommitDetail, RemoteEntity, RemoteGitActor, RemoteIssue,
	RemoteLabel, RemoteMilestone, RemotePullRequest, RemoteRepository, RemoteUser,
};
