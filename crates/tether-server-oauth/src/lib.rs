// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OAuth 2.0 token provider for tether integrations.
//!
//! One [`OAuthRegistry`] holds the provider configuration for every
//! integration kind that supports OAuth. The flow is the standard
//! authorization-code grant:
//!
//! 1. [`OAuthRegistry::build_authorize_url`] with a state minted by
//!    [`OAuthStateStore::issue`]
//! 2. the user authorizes and the provider redirects back with `code` and
//!    `state`
//! 3. [`OAuthStateStore::consume`] checks the state, then
//!    [`OAuthRegistry::exchange_code_for_tokens`] trades the code for tokens
//! 4. later, [`OAuthRegistry::refresh_access_token`] renews an expiring token
//!
//! Missing client credentials do not fail construction. They fail when a
//! flow for that kind starts, so unused kinds never block startup.

mod config;
mod error;
mod registry;
mod state;

pub use config::{redirect_uri_for, OAuthKindSettings, OAuthProviderConfig, CALLBACK_PATH_PREFIX};
pub use error::OAuthError;
pub use registry::{OAuthRegistry, OAuthTokens};
pub use state::{OAuthStateStore, DEFAULT_STATE_TTL, MAX_PENDING_STATES};
