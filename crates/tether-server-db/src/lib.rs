// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for tether.
//!
//! Each store is a trait plus a `*Repository` implementation over a
//! [`sqlx::SqlitePool`], so engine crates can take `Arc<dyn Store>`.

mod convert;
pub mod error;
pub mod external;
pub mod integration;
pub mod issue;
pub mod pool;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DbError, Result};
pub use external::{ExternalDataRepository, ExternalDataStore};
pub use integration::{IntegrationRepository, IntegrationStore};
pub use issue::{IssueRepository, IssueStore};
pub use pool::create_pool;
pub use schema::ensure_schema;
pub use sqlx::sqlite::SqlitePool;
