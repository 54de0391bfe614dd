// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The slice of the issue domain the linking engine touches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
	Backlog,
	Todo,
	InProgress,
	InReview,
	Done,
	Cancelled,
}

impl IssueStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			IssueStatus::Backlog => "backlog",
			IssueStatus::Todo => "todo",
			IssueStatus::InProgress => "in_progress",
			IssueStatus::InReview => "in_review",
			IssueStatus::Done => "done",
			IssueStatus::Cancelled => "cancelled",
		}
	}

	pub fn is_done(&self) -> bool {
		matches!(self, IssueStatus::Done)
	}
}

impl std::fmt::Display for IssueStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for IssueStatus {
	type Err = ();
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"backlog" => Ok(IssueStatus::Backlog),
			"todo" => Ok(IssueStatus::Todo),
			"in_progress" => Ok(IssueStatus::InProgress),
			"in_review" => Ok(IssueStatus::InReview),
			"done" => Ok(IssueStatus::Done),
			"cancelled" => Ok(IssueStatus::Cancelled),
			_ => Err(()),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
	pub id: Uuid,
	/// Uppercase key, e.g. `PROJ`.
	pub key: String,
	pub organization_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
	pub id: Uuid,
	pub number: i64,
	pub title: String,
	pub status: IssueStatus,
	pub project: ProjectRef,
	pub updated_at: DateTime<Utc>,
}

impl Issue {
	/// `PROJ-123`
	pub fn key(&self) -> String {
		format!("{}-{}", self.project.key, self.number)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_roundtrip() {
		for status in [
			IssueStatus::Backlog,
			IssueStatus::Todo,
			IssueStatus::InProgress,
			IssueStatus::InReview,
			IssueStatus::Done,
			IssueStatus::Cancelled,
		] {
			assert_eq!(status.as_str().parse::<IssueStatus>(), Ok(status));
		}
		assert!("closed".parse::<IssueStatus>().is_err());
	}

	#[test]
	fn only_done_is_done() {
		assert!(IssueStatus::Done.is_done());
		assert!(!IssueStatus::Cancelled.is_done());
		assert!(!IssueStatus::InReview.is_done());
	}

	#[test]
	fn key_joins_project_and_number() {
		let issue = Issue {
			id: Uuid::new_v4(),
			number: 42,
			title: "Crash on start".to_string(),
			status: IssueStatus::Todo,
			project: ProjectRef {
				id: Uuid::new_v4(),
				key: "PROJ".to_string(),
				organization_id: Uuid::new_v4(),
			},
			updated_at: Utc::now(),
		};
		assert_eq!(issue.key(), "PROJ-42");
	}
}
