// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationKind {
	Github,
	Gitlab,
	Slack,
	Jira,
	Google,
	Linear,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown integration kind: {0}")]
pub struct ParseKindError(pub String);

impl IntegrationKind {
	pub const ALL: [IntegrationKind; 6] = [
		IntegrationKind::Github,
		IntegrationKind::Gitlab,
		IntegrationKind::Slack,
		IntegrationKind::Jira,
		IntegrationKind::Google,
		IntegrationKind::Linear,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			IntegrationKind::Github => "github",
			IntegrationKind::Gitlab => "gitlab",
			IntegrationKind::Slack => "slack",
			IntegrationKind::Jira => "jira",
			IntegrationKind::Google => "google",
			IntegrationKind::Linear => "linear",
		}
	}

	/// Linear is configured with a static API key and has no OAuth flow.
	pub fn supports_oauth(&self) -> bool {
		!matches!(self, IntegrationKind::Linear)
	}

	/// Only GitHub has repositories, issues, pull requests and commits to
	/// mirror. Other kinds hold tokens for outbound use and are never synced.
	pub fn supports_sync(&self) -> bool {
		matches!(self, IntegrationKind::Github)
	}
}

impl std::fmt::Display for IntegrationKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for IntegrationKind {
	type Err = ParseKindError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"github" => Ok(IntegrationKind::Github),
			"gitlab" => Ok(IntegrationKind::Gitlab),
			"slack" => Ok(IntegrationKind::Slack),
			"jira" => Ok(IntegrationKind::Jira),
			"google" => Ok(IntegrationKind::Google),
			"linear" => Ok(IntegrationKind::Linear),
			other => Err(ParseKindError(other.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_github_syncs() {
		let syncable: Vec<_> = IntegrationKind::ALL
			.into_iter()
			.filter(IntegrationKind::supports_sync)
			.collect();
		assert_eq!(syncable, vec![IntegrationKind::Github]);
	}

	#[test]
	fn as_str_roundtrips_through_from_str() {
		for kind in IntegrationKind::ALL {
			assert_eq!(kind.as_str().parse::<IntegrationKind>().unwrap(), kind);
		}
	}

	#[test]
	fn parse_is_case_insensitive() {
		assert_eq!(
			"GitHub".parse::<IntegrationKind>().unwrap(),
			IntegrationKind::Github
		);
	}

	#[test]
	fn unknown_kind_is_rejected() {
		let err = "bitbucket".parse::<IntegrationKind>().unwrap_err();
		assert_eq!(err.0, "bitbucket");
	}

	#[test]
	fn only_linear_lacks_oauth() {
		let without: Vec<_> = IntegrationKind::ALL
			.into_iter()
			.filter(|k| !k.supports_oauth())
			.collect();
		assert_eq!(without, vec![IntegrationKind::Linear]);
	}
}
