// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Paginated REST listings for repositories, issues, pull requests and
//! commits.
//!
//! Listings take a bearer token so the same code serves installation tokens
//! and per-user OAuth tokens. Items come back as raw JSON; typing and
//! normalization happen in the caller.

use serde_json::Value;
use tether_common_http::{read_json, retry, retry_with_cancel, send, wait_if_approaching_limit};
use tracing::{debug, instrument, warn};

use crate::client::GithubAppClient;
use crate::error::{from_http_error, GithubAppError};

/// A remote listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
	/// Repositories visible to an installation token.
	InstallationRepositories,
	/// Repositories visible to a user OAuth token.
	UserRepositories,
	Issues { repository: String },
	PullRequests { repository: String },
	Commits { repository: String },
}

impl Listing {
	fn path(&self) -> String {
		match self {
			Listing::InstallationRepositories => "installation/repositories".to_string(),
			Listing::UserRepositories => "user/repos".to_string(),
			Listing::Issues { repository } => format!("repos/{}/issues", encode_repo(repository)),
			Listing::PullRequests { repository } => format!("repos/{}/pulls", encode_repo(repository)),
			Listing::Commits { repository } => format!("repos/{}/commits", encode_repo(repository)),
		}
	}

	fn extra_query(&self) -> &'static [(&'static str, &'static str)] {
		match self {
			Listing::Issues { .. } | Listing::PullRequests { .. } => &[("state", "all")],
			_ => &[],
		}
	}
}

/// `owner/name` with each segment percent-encoded.
fn encode_repo(full_name: &str) -> String {
	full_name
		.split('/')
		.map(|segment| urlencoding::encode(segment).into_owned())
		.collect::<Vec<_>>()
		.join("/")
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct ListPage {
	pub page: u32,
	pub items: Vec<Value>,
}

impl ListPage {
	/// An empty page ends pagination.
	pub fn is_last(&self) -> bool {
		self.items.is_empty()
	}
}

/// `installation/repositories` wraps its items; everything else is a bare
/// array.
fn page_items(body: Value) -> Result<Vec<Value>, GithubAppError> {
	match body {
		Value::Array(items) => Ok(items),
		Value::Object(mut map) => match map.remove("repositories") {
			Some(Value::Array(items)) => Ok(items),
			_ => Err(GithubAppError::InvalidResponse(
				"expected a JSON array or a repositories list".to_string(),
			)),
		},
		_ => Err(GithubAppError::InvalidResponse(
			"expected a JSON array".to_string(),
		)),
	}
}

/// Items of a listing and the reason it stopped early, if it did.
#[derive(Debug, Default)]
pub struct ListOutcome {
	pub items: Vec<Value>,
	/// Failure of a page after the first; earlier pages are kept in `items`.
	pub error: Option<GithubAppError>,
	/// The page cap was reached before an empty page, so more items may
	/// exist.
	pub truncated: bool,
}

impl GithubAppClient {
	/// Fetch one page, retrying transient failures. Pauses afterwards when
	/// the response shows the rate limit running low.
	#[instrument(skip(self, bearer))]
	pub async fn list_page(
		&self,
		bearer: &str,
		listing: &Listing,
		page: u32,
		per_page: u32,
	) -> Result<ListPage, GithubAppError> {
		let attempt = || self.list_page_once(bearer, listing, page, per_page);
		match self.cancellation() {
			Some(cancel) => retry_with_cancel(self.retry_config(), cancel, attempt).await,
			None => retry(self.retry_config(), attempt).await,
		}
	}

	async fn list_page_once(
		&self,
		bearer: &str,
		listing: &Listing,
		page: u32,
		per_page: u32,
	) -> Result<ListPage, GithubAppError> {
		let mut url = self.api_url(&listing.path())?;
		{
			let mut query = url.query_pairs_mut();
			for (key, value) in listing.extra_query() {
				query.append_pair(key, value);
			}
			query
				.append_pair("per_page", &per_page.to_string())
				.append_pair("page", &page.to_string());
		}

		debug!(url = %url, "Fetching listing page");

		let request = self.authorized(self.http_client().get(url), bearer);
		let response = send(request).await.map_err(from_http_error)?;
		let headers = response.headers().clone();
		let body: Value = read_json(response).await?;

		wait_if_approaching_limit(
			&headers,
			self.config().slow_down_threshold,
			self.config().max_pacing_delay,
		)
		.await;

		Ok(ListPage {
			page,
			items: page_items(body)?,
		})
	}

	/// Fetch pages from 1 until an empty page or `max_pages`.
	///
	/// Only a failing first page is an error. A later failure ends the
	/// listing with the pages already fetched and the error in
	/// [`ListOutcome::error`].
	pub async fn list_all(
		&self,
		bearer: &str,
		listing: &Listing,
		per_page: u32,
		max_pages: u32,
	) -> Result<ListOutcome, GithubAppError> {
		let mut outcome = ListOutcome::default();

		for page in 1..=max_pages {
			let fetched = match self.list_page(bearer, listing, page, per_page).await {
				Ok(fetched) => fetched,
				Err(e) if page == 1 => return Err(e),
				Err(e) => {
					warn!(
						listing = ?listing,
						page,
						fetched = outcome.items.len(),
						error = %e,
						"Listing page failed, keeping earlier pages"
					);
					outcome.error = Some(e);
					break;
				}
			};
			if fetched.is_last() {
				break;
			}
			outcome.items.extend(fetched.items);
			if page == max_pages {
				outcome.truncated = true;
				warn!(
					listing = ?listing,
					max_pages,
					per_page,
					fetched = outcome.items.len(),
					"Listing reached the page cap, remaining items not fetched"
				);
			}
		}

		debug!(listing = ?listing, count = outcome.items.len(), "Listing complete");
		Ok(outcome)
	}
}
