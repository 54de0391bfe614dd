// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use tether_server_db::DbError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinkError>;

#[derive(Error, Debug)]
pub enum LinkError {
	#[error("db error: {0}")]
	Db(#[from] DbError),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}
