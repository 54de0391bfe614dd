// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HMAC-SHA256 webhook signatures.
//!
//! Remote hosts sign each delivery with `sha256=<hex>` computed over the raw
//! request body. Verification decodes the hex and compares MACs in constant
//! time via [`Mac::verify_slice`].

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix used by the `X-Hub-Signature-256` header.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute an HMAC-SHA256 signature for a payload.
///
/// Returns the hex-encoded signature without any prefix.
pub fn compute_hmac_sha256(secret: &[u8], payload: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
	mac.update(payload);
	hex::encode(mac.finalize().into_bytes())
}

/// Compute the full header value (`sha256=<hex>`) for a payload.
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> String {
	format!("{SIGNATURE_PREFIX}{}", compute_hmac_sha256(secret, payload))
}

/// Verify a raw hex-encoded HMAC-SHA256 signature (no prefix).
pub fn verify_hmac_sha256(secret: &[u8], payload: &[u8], signature: &str) -> bool {
	let Ok(expected_bytes) = hex::decode(signature) else {
		return false;
	};

	let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
		return false;
	};

	mac.update(payload);
	mac.verify_slice(&expected_bytes).is_ok()
}

/// Strip the `sha256=` prefix from a signature header. Returns `None` for any
/// other scheme.
pub fn parse_signature_header(header: &str) -> Option<&str> {
	header.trim().strip_prefix(SIGNATURE_PREFIX)
}

/// Verify a `sha256=<hex>` header against the raw payload.
///
/// An empty secret never verifies.
pub fn verify_signature_header(secret: &[u8], payload: &[u8], header: &str) -> bool {
	if secret.is_empty() {
		return false;
	}

	match parse_signature_header(header) {
		Some(signature) => verify_hmac_sha256(secret, payload, signature),
		None => false,
	}
}
