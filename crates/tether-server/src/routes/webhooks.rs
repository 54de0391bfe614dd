// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use axum::{
	body::Bytes,
	extract::State,
	http::{HeaderMap, StatusCode},
	response::IntoResponse,
	Json,
};
use serde::Serialize;
use tether_server_webhooks::{DispatchOutcome, WebhookRequest};

use crate::{error::ServerError, state::AppState};

const EVENT_HEADER: &str = "x-github-event";
const DELIVERY_HEADER: &str = "x-github-delivery";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
	/// `processed` or `ignored`.
	pub status: &'static str,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub closed_issues: Vec<String>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /api/webhooks/github
///
/// The signature is checked against the raw body before anything else is
/// read from it.
pub async fn github_webhook(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<impl IntoResponse, ServerError> {
	let event = header(&headers, EVENT_HEADER)
		.ok_or_else(|| ServerError::BadRequest("Missing X-GitHub-Event header".to_string()))?;
	let delivery_id = header(&headers, DELIVERY_HEADER);

	tracing::debug!(event = %event, delivery = delivery_id.unwrap_or("-"), "github_webhook: received");

	let outcome = state
		.dispatcher
		.dispatch(WebhookRequest {
			event,
			delivery_id,
			signature: header(&headers, SIGNATURE_HEADER),
			body: &body,
		})
		.await?;

	let response = match outcome {
		DispatchOutcome::Ignored { .. } => WebhookResponse {
			status: "ignored",
			closed_issues: Vec::new(),
		},
		DispatchOutcome::Push { closed_issues, .. } => WebhookResponse {
			status: "processed",
			closed_issues,
		},
		DispatchOutcome::PullRequest { closed_issue, .. } => WebhookResponse {
			status: "processed",
			closed_issues: closed_issue.into_iter().collect(),
		},
		DispatchOutcome::Issue { .. }
		| DispatchOutcome::Installation { .. }
		| DispatchOutcome::Pong => WebhookResponse {
			status: "processed",
			closed_issues: Vec::new(),
		},
	};

	Ok((StatusCode::OK, Json(response)))
}
