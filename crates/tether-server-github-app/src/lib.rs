// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App credential provider for tether.
//!
//! This crate provides:
//! - signed app assertions (RS256 JWT) from the app's private key
//! - installation tokens, cached per installation in an injected
//!   [`InstallationTokenCache`] and refreshed five minutes before expiry
//! - installation revocation
//! - webhook signature verification
//! - a REST client for paginated repository, issue, pull request and commit
//!   listings, usable with installation or OAuth bearer tokens

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod jwt;
pub mod rest;
pub mod types;
pub mod webhook;

pub use cache::{CachedInstallationToken, InstallationTokenCache, TOKEN_REFRESH_BUFFER};
pub use client::GithubAppClient;
pub use config::GithubAppConfig;
pub use error::GithubAppError;
pub use jwt::generate_signed_assertion;
pub use rest::{ListOutcome, ListPage, Listing};
pub use tether_common_http::RetryConfig;
pub use types::{
	AccessTokenResponse, Installation, InstallationAccount, InstallationRepositoriesWebhookPayload,
	InstallationWebhookPayload, WebhookRepository,
};
pub use webhook::{compute_webhook_signature, verify_webhook_signature};
