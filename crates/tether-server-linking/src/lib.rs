// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Links commits and pull requests to issues.
//!
//! Commit messages are scanned for close verbs (`fixes PROJ-12`) and plain
//! key mentions; branch names are scanned for a key. [`Linker`] resolves the
//! keys against the issue store, records the links as external data and
//! closes issues when a commit or merged pull request says so.

pub mod error;
pub mod events;
pub mod linker;
pub mod magic_words;

pub use error::{LinkError, Result};
pub use events::{BroadcastEventBus, EventBus, LinkEvent};
pub use linker::Linker;
pub use magic_words::{
	extract_issue_key_from_branch, extract_issue_keys, parse_magic_words_from_commit,
	split_issue_key, MagicWordAction, MagicWordMatch,
};
