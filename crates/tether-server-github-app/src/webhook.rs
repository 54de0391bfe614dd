// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Webhook signature verification for GitHub App webhooks.

use tether_common_webhook::{sign_payload, verify_signature_header};
use tracing::{debug, warn};

use crate::error::GithubAppError;

/// Verify a GitHub webhook signature.
///
/// `signature_header` is the raw `X-Hub-Signature-256` value
/// (`sha256=<hex>`). Comparison is constant-time. An empty secret never
/// verifies.
pub fn verify_webhook_signature(
	secret: &str,
	signature_header: &str,
	body: &[u8],
) -> Result<(), GithubAppError> {
	if verify_signature_header(secret.as_bytes(), body, signature_header) {
		debug!("Webhook signature verified successfully");
		Ok(())
	} else {
		warn!("Webhook signature verification failed");
		Err(GithubAppError::InvalidWebhookSignature)
	}
}

/// Signature for `body` in the `sha256=<hex>` header format.
pub fn compute_webhook_signature(secret: &str, body: &[u8]) -> String {
	sign_payload(secret.as_bytes(), body)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	const TEST_SECRET: &str = "test-webhook-secret";
	const TEST_BODY: &[u8] = b"{\"action\": \"created\"}";

	#[test]
	fn test_verify_valid_signature() {
		let signature = compute_webhook_signature(TEST_SECRET, TEST_BODY);
		assert!(verify_webhook_signature(TEST_SECRET, &signature, TEST_BODY).is_ok());
	}

	#[test]
	fn test_verify_invalid_signature() {
		let signature = "sha256=0000000000000000000000000000000000000000000000000000000000000000";
		assert!(matches!(
			verify_webhook_signature(TEST_SECRET, signature, TEST_BODY),
			Err(GithubAppError::InvalidWebhookSignature)
		));
	}

	#[test]
	fn test_verify_wrong_prefix() {
		assert!(verify_webhook_signature(TEST_SECRET, "sha1=abc123", TEST_BODY).is_err());
	}

	#[test]
	fn test_verify_invalid_hex() {
		assert!(verify_webhook_signature(TEST_SECRET, "sha256=not-valid-hex", TEST_BODY).is_err());
	}

	#[test]
	fn test_verify_empty_secret_fails() {
		let signature = compute_webhook_signature("", TEST_BODY);
		assert!(verify_webhook_signature("", &signature, TEST_BODY).is_err());
	}

	#[test]
	fn test_verify_tampered_body() {
		let signature = compute_webhook_signature(TEST_SECRET, TEST_BODY);
		assert!(verify_webhook_signature(TEST_SECRET, &signature, b"{\"action\": \"deleted\"}").is_err());
	}

	#[test]
	fn test_compute_signature_format() {
		let signature = compute_webhook_signature(TEST_SECRET, TEST_BODY);
		assert!(signature.starts_with("sha256="));
		assert_eq!(signature.len(), "sha256=".len() + 64);
	}

	proptest! {
		/// **Property: Valid signatures always verify successfully**
		#[test]
		fn prop_valid_signature_always_verifies(
			secret in "[a-zA-Z0-9]{8,64}",
			body in proptest::collection::vec(proptest::num::u8::ANY, 1..1000)
		) {
			let signature = compute_webhook_signature(&secret, &body);
			prop_assert!(verify_webhook_signature(&secret, &signature, &body).is_ok());
		}

		/// **Property: Tampered payloads always fail verification**
		#[test]
		fn prop_tampered_body_fails_verification(
			secret in "[a-zA-Z0-9]{8,64}",
			body in proptest::collection::vec(proptest::num::u8::ANY, 2..500),
			tamper_index in 0usize..500usize
		) {
			let signature = compute_webhook_signature(&secret, &body);

			let mut tampered = body.clone();
			let idx = tamper_index % tampered.len();
			tampered[idx] = tampered[idx].wrapping_add(1);

			prop_assert!(verify_webhook_signature(&secret, &signature, &tampered).is_err());
		}
	}
}
