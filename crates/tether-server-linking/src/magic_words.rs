// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Issue references in commit messages and branch names.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CLOSE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"(?i)\b(fix|fixes|fixed|close|closes|closed|resolve|resolves|resolved)(?:\s*:\s*|\s+)(#\d+|[a-z][a-z0-9]+-\d+)\b",
	)
	.unwrap()
});

static KEY_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)\b([a-z][a-z0-9]+-\d+)\b").unwrap());

/// Branch-name patterns, tried in order.
static BRANCH_REGEXES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
	[
		Regex::new(r"(?i)^([a-z][a-z0-9]+-\d+)").unwrap(),
		Regex::new(r"(?i)/([a-z][a-z0-9]+-\d+)").unwrap(),
		Regex::new(r"(?i)([a-z][a-z0-9]+-\d+)-").unwrap(),
		Regex::new(r"(?i)([a-z][a-z0-9]+-\d+)_").unwrap(),
	]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MagicWordAction {
	Close,
	Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicWordMatch {
	pub action: MagicWordAction,
	/// Uppercase `PROJ-123`, or `#123` for a bare number.
	pub issue_key: String,
	/// Exact text that matched, kept for audit records.
	pub raw_match: String,
}

impl MagicWordMatch {
	/// The number of a bare `#123` reference.
	pub fn bare_number(&self) -> Option<i64> {
		self.issue_key.strip_prefix('#')?.parse().ok()
	}
}

/// Find close and reference mentions in a commit message.
///
/// Close verbs are matched first; any other `PROJECT-NUMBER` mention becomes
/// a reference. Each key appears at most once.
pub fn parse_magic_words_from_commit(message: &str) -> Vec<MagicWordMatch> {
	let mut seen = HashSet::new();
	let mut matches = Vec::new();

	for caps in CLOSE_REGEX.captures_iter(message) {
		let key = caps[2].to_uppercase();
		if seen.insert(key.clone()) {
			matches.push(MagicWordMatch {
				action: MagicWordAction::Close,
				issue_key: key,
				raw_match: caps[0].to_string(),
			});
		}
	}

	for caps in KEY_REGEX.captures_iter(message) {
		let key = caps[1].to_uppercase();
		if seen.insert(key.clone()) {
			matches.push(MagicWordMatch {
				action: MagicWordAction::Reference,
				issue_key: key,
				raw_match: caps[0].to_string(),
			});
		}
	}

	matches
}

/// Every `PROJECT-NUMBER` mention, uppercased and deduplicated, in order of
/// first appearance. Verbs and `#NUMBER` are ignored.
pub fn extract_issue_keys(text: &str) -> Vec<String> {
	let mut seen = HashSet::new();
	KEY_REGEX
		.captures_iter(text)
		.map(|caps| caps[1].to_uppercase())
		.filter(|key| seen.insert(key.clone()))
		.collect()
}

/// Issue key encoded in a branch name, e.g. `feature/PROJ-12-sso`.
pub fn extract_issue_key_from_branch(branch: &str) -> Option<String> {
	BRANCH_REGEXES
		.iter()
		.find_map(|re| re.captures(branch))
		.map(|caps| caps[1].to_uppercase())
}

/// Split `PROJ-123` on its last hyphen. Returns `None` unless the suffix is a
/// number and the project part is non-empty.
pub fn split_issue_key(key: &str) -> Option<(&str, i64)> {
	let (project, number) = key.rsplit_once('-')?;
	if project.is_empty() {
		return None;
	}
	let number = number.parse().ok()?;
	Some((project, number))
}
