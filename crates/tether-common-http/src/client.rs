// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with consistent User-Agent header and timeout.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::HttpError;

/// Per-request timeout applied by [`builder`]. A hung remote call fails with
/// [`crate::TransportKind::Timeout`] instead of stalling a sync cycle.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a new HTTP client with the standard tether User-Agent and
/// [`DEFAULT_TIMEOUT`].
pub fn new_client() -> Result<Client, reqwest::Error> {
	builder().build()
}

/// Creates a new HTTP client builder with the standard tether User-Agent
/// header and [`DEFAULT_TIMEOUT`].
///
/// # Example
/// ```ignore
/// let client = tether_common_http::builder()
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder()
		.user_agent(user_agent())
		.timeout(DEFAULT_TIMEOUT)
}

/// Creates a new HTTP client builder with a custom User-Agent header.
pub fn builder_with_user_agent(user_agent: impl Into<String>) -> ClientBuilder {
	Client::builder()
		.user_agent(user_agent.into())
		.timeout(DEFAULT_TIMEOUT)
}

/// Creates a new HTTP client with a custom timeout and the standard User-Agent.
pub fn new_client_with_timeout(timeout: Duration) -> Result<Client, reqwest::Error> {
	builder().timeout(timeout).build()
}

/// Returns the standard tether User-Agent string: `tether/{version}`.
pub fn user_agent() -> String {
	format!("tether/{}", env!("CARGO_PKG_VERSION"))
}

/// Send a request and turn any non-2xx response into [`HttpError::Status`].
pub async fn send(request: RequestBuilder) -> Result<Response, HttpError> {
	let response = request.send().await?;
	if response.status().is_success() {
		Ok(response)
	} else {
		Err(HttpError::from_response(response).await)
	}
}

/// Decode a JSON response body.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, HttpError> {
	response
		.json::<T>()
		.await
		.map_err(|e| HttpError::Decode(e.to_string()))
}
