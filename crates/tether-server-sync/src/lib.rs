// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Remote entity synchronization for tether integrations.
//!
//! [`Synchronizer`] resolves credentials for an integration (installation
//! token or OAuth token, refreshed when close to expiry), pages through the
//! GitHub listings, normalizes each item and upserts it together with its
//! search projection. It also applies GitHub App installation lifecycle
//! events to the stored integrations.

pub mod credentials;
pub mod engine;
pub mod error;
pub mod lifecycle;

pub use credentials::{Credential, CredentialResolver, OAUTH_REFRESH_BUFFER};
pub use engine::{SyncOptions, SyncReport, Synchronizer};
pub use error::{Result, SyncError};
