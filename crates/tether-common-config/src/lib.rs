// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration primitives shared across tether crates.
//!
//! - [`Secret<T>`]: wrapper that keeps credentials out of logs, debug output
//!   and serialized config dumps
//! - [`load_secret_env`]: `VAR` / `VAR_FILE` loading for secrets
//! - [`normalize_pem`]: turns newline-escaped PEM blobs from env files back
//!   into real PEM

pub mod env;
pub mod secret;

pub use env::{load_secret_env, normalize_pem, require_secret_env, SecretEnvError};
pub use secret::{Secret, SecretString, REDACTED};
