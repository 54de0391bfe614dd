// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Rate-limit header parsing and proactive pacing.
//!
//! Two header dialects are understood:
//!
//! | Dialect | Remaining | Limit | Reset |
//! |---|---|---|---|
//! | vendor | `x-ratelimit-remaining` | `x-ratelimit-limit` | `x-ratelimit-reset` (unix seconds) |
//! | generic | `ratelimit-remaining` | `ratelimit-limit` | `ratelimit-reset` (seconds from now) |
//!
//! Pacing here is advisory and runs independently of the retry executor.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use tracing::info;

pub const DEFAULT_SLOW_DOWN_THRESHOLD: f64 = 0.1;

/// Pause used when the budget is low but the reset instant is unknown.
const UNKNOWN_RESET_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
	pub remaining: u64,
	pub limit: u64,
	pub reset_at: Option<DateTime<Utc>>,
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
	headers
		.get(name)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.trim().parse().ok())
}

pub fn parse_rate_limit_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
	parse_rate_limit_headers_at(headers, Utc::now())
}

pub fn parse_rate_limit_headers_at(
	headers: &HeaderMap,
	now: DateTime<Utc>,
) -> Option<RateLimitInfo> {
	if let (Some(remaining), Some(limit)) = (
		header_u64(headers, "x-ratelimit-remaining"),
		header_u64(headers, "x-ratelimit-limit"),
	) {
		let reset_at = header_u64(headers, "x-ratelimit-reset")
			.and_then(|epoch| DateTime::from_timestamp(epoch as i64, 0));
		return Some(RateLimitInfo {
			remaining,
			limit,
			reset_at,
		});
	}

	if let (Some(remaining), Some(limit)) = (
		header_u64(headers, "ratelimit-remaining"),
		header_u64(headers, "ratelimit-limit"),
	) {
		let reset_at = header_u64(headers, "ratelimit-reset")
			.map(|secs| now + chrono::Duration::seconds(secs as i64));
		return Some(RateLimitInfo {
			remaining,
			limit,
			reset_at,
		});
	}

	None
}

/// True when less than `threshold` of the budget remains.
pub fn should_slow_down(info: &RateLimitInfo, threshold: f64) -> bool {
	if info.limit == 0 {
		return false;
	}
	(info.remaining as f64 / info.limit as f64) < threshold
}

/// How long to pause before the next call, if at all. Waits until the reset
/// instant, never longer than `max_wait`.
pub fn pacing_delay(
	info: &RateLimitInfo,
	threshold: f64,
	max_wait: Duration,
	now: DateTime<Utc>,
) -> Option<Duration> {
	if !should_slow_down(info, threshold) {
		return None;
	}

	let delay = match info.reset_at {
		Some(reset_at) => (reset_at - now).to_std().unwrap_or(Duration::ZERO),
		None => UNKNOWN_RESET_DELAY,
	};

	let delay = delay.min(max_wait);
	(!delay.is_zero()).then_some(delay)
}

/// Sleep if the response headers show the rate-limit budget running low.
/// Returns how long it waited.
pub async fn wait_if_approaching_limit(
	headers: &HeaderMap,
	threshold: f64,
	max_wait: Duration,
) -> Option<Duration> {
	let info = parse_rate_limit_headers(headers)?;
	let delay = pacing_delay(&info, threshold, max_wait, Utc::now())?;

	info!(
		remaining = info.remaining,
		limit = info.limit,
		delay_ms = delay.as_millis() as u64,
		"Approaching rate limit, pausing"
	);
	tokio::time::sleep(delay).await;
	Some(delay)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use reqwest::header::HeaderValue;

	fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
		let mut map = HeaderMap::new();
		for (name, value) in pairs {
			map.insert(*name, HeaderValue::from_static(value));
		}
		map
	}

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
	}

	#[test]
	fn parses_vendor_dialect_with_epoch_reset() {
		let map = headers(&[
			("x-ratelimit-remaining", "42"),
			("x-ratelimit-limit", "5000"),
			("x-ratelimit-reset", "1735689660"),
		]);

		let info = parse_rate_limit_headers_at(&map, now()).unwrap();
		assert_eq!(info.remaining, 42);
		assert_eq!(info.limit, 5000);
		assert_eq!(info.reset_at, Some(now() + chrono::Duration::seconds(60)));
	}

	#[test]
	fn parses_generic_dialect_with_delta_reset() {
		let map = headers(&[
			("ratelimit-remaining", "3"),
			("ratelimit-limit", "100"),
			("ratelimit-reset", "15"),
		]);

		let info = parse_rate_limit_headers_at(&map, now()).unwrap();
		assert_eq!(info.remaining, 3);
		assert_eq!(info.limit, 100);
		assert_eq!(info.reset_at, Some(now() + chrono::Duration::seconds(15)));
	}

	#[test]
	fn missing_headers_yield_none() {
		assert!(parse_rate_limit_headers_at(&HeaderMap::new(), now()).is_none());
		let partial = headers(&[("x-ratelimit-remaining", "10")]);
		assert!(parse_rate_limit_headers_at(&partial, now()).is_none());
	}

	#[test]
	fn slow_down_below_threshold() {
		let info = |remaining| RateLimitInfo {
			remaining,
			limit: 100,
			reset_at: None,
		};
		assert!(should_slow_down(&info(9), DEFAULT_SLOW_DOWN_THRESHOLD));
		assert!(!should_slow_down(&info(10), DEFAULT_SLOW_DOWN_THRESHOLD));
		assert!(!should_slow_down(&info(80), DEFAULT_SLOW_DOWN_THRESHOLD));
	}

	#[test]
	fn zero_limit_never_slows_down() {
		let info = RateLimitInfo {
			remaining: 0,
			limit: 0,
			reset_at: None,
		};
		assert!(!should_slow_down(&info, DEFAULT_SLOW_DOWN_THRESHOLD));
	}

	#[test]
	fn pacing_waits_until_reset_capped_by_max() {
		let info = RateLimitInfo {
			remaining: 1,
			limit: 100,
			reset_at: Some(now() + chrono::Duration::seconds(20)),
		};

		assert_eq!(
			pacing_delay(&info, 0.1, Duration::from_secs(30), now()),
			Some(Duration::from_secs(20))
		);
		assert_eq!(
			pacing_delay(&info, 0.1, Duration::from_secs(5), now()),
			Some(Duration::from_secs(5))
		);
	}

	#[test]
	fn pacing_skips_when_reset_already_passed() {
		let info = RateLimitInfo {
			remaining: 1,
			limit: 100,
			reset_at: Some(now() - chrono::Duration::seconds(5)),
		};
		assert_eq!(pacing_delay(&info, 0.1, Duration::from_secs(30), now()), None);
	}

	#[test]
	fn pacing_uses_short_pause_when_reset_unknown() {
		let info = RateLimitInfo {
			remaining: 0,
			limit: 100,
			reset_at: None,
		};
		assert_eq!(
			pacing_delay(&info, 0.1, Duration::from_secs(30), now()),
			Some(UNKNOWN_RESET_DELAY)
		);
	}

	#[tokio::test(start_paused = true)]
	async fn wait_returns_none_with_healthy_budget() {
		let map = headers(&[("ratelimit-remaining", "90"), ("ratelimit-limit", "100")]);
		assert!(
			wait_if_approaching_limit(&map, 0.1, Duration::from_secs(30))
				.await
				.is_none()
		);
	}

	#[tokio::test(start_paused = true)]
	async fn wait_sleeps_when_budget_low() {
		let map = headers(&[
			("ratelimit-remaining", "1"),
			("ratelimit-limit", "100"),
			("ratelimit-reset", "4"),
		]);
		let waited = wait_if_approaching_limit(&map, 0.1, Duration::from_secs(30)).await;
		let waited = waited.unwrap();
		assert!(waited <= Duration::from_secs(4));
		assert!(waited >= Duration::from_secs(3));
	}
}
