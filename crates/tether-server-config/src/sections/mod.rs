// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each has a partial `*ConfigLayer` for merging and
//! a resolved `*Config`.

mod database;
mod github_app;
mod http;
mod logging;
mod oauth;
mod sync;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use github_app::{GithubAppConfig, GithubAppConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use oauth::{OAuthConfig, OAuthConfigLayer, OAuthProviderConfig, OAuthProviderConfigLayer, OAUTH_KINDS};
pub use sync::{SyncConfig, SyncConfigLayer};
