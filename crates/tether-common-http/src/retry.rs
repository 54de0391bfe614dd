// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry logic with exponential backoff for remote calls.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::Cancelled;

#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Retries after the first attempt; 3 means at most 4 calls.
	pub max_retries: u32,
	pub initial_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: 3,
			initial_delay: Duration::from_millis(1000),
			max_delay: Duration::from_millis(30_000),
			backoff_factor: 2.0,
			jitter: false,
		}
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;

	/// Server-requested delay, e.g. from a `Retry-After` header.
	fn retry_after(&self) -> Option<Duration> {
		None
	}
}

fn calculate_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential_delay = cfg.initial_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let capped_delay = exponential_delay.min(cfg.max_delay.as_secs_f64());

	let final_delay = if cfg.jitter {
		let jitter_factor = 0.5 + fastrand::f64();
		capped_delay * jitter_factor
	} else {
		capped_delay
	};

	Duration::from_secs_f64(final_delay)
}

fn delay_for<E: RetryableError>(cfg: &RetryConfig, attempt: u32, err: &E) -> Duration {
	match err.retry_after() {
		Some(delay) if !delay.is_zero() => delay,
		_ => calculate_delay(cfg, attempt),
	}
}

/// Decide whether to retry after `err`. Returns the delay to sleep, or
/// `None` when the error must propagate.
fn next_delay<E>(cfg: &RetryConfig, attempt: u32, err: &E) -> Option<Duration>
where
	E: RetryableError + std::fmt::Debug,
{
	if !err.is_retryable() {
		warn!(
				error = ?err,
				attempt = attempt + 1,
				"non-retryable error encountered"
		);
		return None;
	}

	if attempt >= cfg.max_retries {
		warn!(
				error = ?err,
				attempt = attempt + 1,
				max_retries = cfg.max_retries,
				"max retry attempts exhausted"
		);
		return None;
	}

	let delay = delay_for(cfg, attempt, err);
	warn!(
			error = ?err,
			attempt = attempt + 1,
			max_retries = cfg.max_retries,
			delay_ms = delay.as_millis() as u64,
			"retrying after error"
	);
	Some(delay)
}

/// Run `f`, retrying retryable failures with exponential backoff. The final
/// error is returned unchanged.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let mut attempt = 0;

	loop {
		match f().await {
			Ok(result) => return Ok(result),
			Err(err) => {
				let Some(delay) = next_delay(cfg, attempt, &err) else {
					return Err(err);
				};
				tokio::time::sleep(delay).await;
				attempt += 1;
			}
		}
	}
}

/// Like [`retry`], but backoff sleeps abort as soon as `cancel` fires.
pub async fn retry_with_cancel<F, Fut, T, E>(
	cfg: &RetryConfig,
	cancel: &CancellationToken,
	mut f: F,
) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug + From<Cancelled>,
{
	let mut attempt = 0;

	loop {
		if cancel.is_cancelled() {
			return Err(Cancelled.into());
		}

		match f().await {
			Ok(result) => return Ok(result),
			Err(err) => {
				let Some(delay) = next_delay(cfg, attempt, &err) else {
					return Err(err);
				};
				tokio::select! {
					_ = cancel.cancelled() => {
						warn!(attempt = attempt + 1, "retry cancelled during backoff");
						return Err(Cancelled.into());
					}
					_ = tokio::time::sleep(delay) => {}
				}
				attempt += 1;
			}
		}
	}
}

/// Parse a `Retry-After` value: integer seconds or an HTTP date. Only
/// positive durations are returned.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
	parse_retry_after_at(value, Utc::now())
}

pub fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
	let value = value.trim();

	if let Ok(seconds) = value.parse::<u64>() {
		return (seconds > 0).then(|| Duration::from_secs(seconds));
	}

	let date = DateTime::parse_from_rfc2822(value).ok()?;
	let delta = date.with_timezone(&Utc) - now;
	delta.to_std().ok().filter(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::{Arc, Mutex};
	use tokio::time::Instant;

	#[derive(Debug)]
	struct MockError {
		status: u16,
		retry_after: Option<Duration>,
	}

	impl MockError {
		fn status(status: u16) -> Self {
			Self {
				status,
				retry_after: None,
			}
		}
	}

	impl RetryableError for MockError {
		fn is_retryable(&self) -> bool {
			crate::is_retryable_status(self.status)
		}

		fn retry_after(&self) -> Option<Duration> {
			self.retry_after
		}
	}

	#[derive(Debug, PartialEq)]
	enum CancellableError {
		Busy,
		Cancelled,
	}

	impl RetryableError for CancellableError {
		fn is_retryable(&self) -> bool {
			matches!(self, CancellableError::Busy)
		}
	}

	impl From<Cancelled> for CancellableError {
		fn from(_: Cancelled) -> Self {
			CancellableError::Cancelled
		}
	}

	/// Purpose: A 429 without `Retry-After` is retried three times with delays
	/// of 1s, 2s and 4s, and the fourth failure propagates to the caller. Time
	/// is paused so the offsets between attempts are deterministic.
	#[tokio::test(start_paused = true)]
	async fn test_rate_limited_backoff_schedule() {
		let start = Instant::now();
		let offsets = Arc::new(Mutex::new(Vec::new()));
		let offsets_clone = Arc::clone(&offsets);

		let result: Result<(), MockError> = retry(&RetryConfig::default(), || {
			let offsets = Arc::clone(&offsets_clone);
			async move {
				offsets
					.lock()
					.unwrap()
					.push(start.elapsed().as_millis() as u64);
				Err(MockError::status(429))
			}
		})
		.await;

		assert_eq!(result.unwrap_err().status, 429);
		let offsets = offsets.lock().unwrap().clone();
		assert_eq!(offsets.len(), 4);
		for (actual, expected) in offsets.iter().zip([0u64, 1000, 3000, 7000]) {
			assert!(
				*actual >= expected && *actual <= expected + 5,
				"attempt at {actual}ms, expected {expected}ms"
			);
		}
	}

	/// Purpose: A 400 is a caller bug, not a transient failure; it must never
	/// be retried.
	#[tokio::test(start_paused = true)]
	async fn test_bad_request_is_never_retried() {
		let attempt_count = Arc::new(AtomicU32::new(0));
		let attempt_count_clone = Arc::clone(&attempt_count);

		let result: Result<(), MockError> = retry(&RetryConfig::default(), || {
			let count = Arc::clone(&attempt_count_clone);
			async move {
				count.fetch_add(1, Ordering::SeqCst);
				Err(MockError::status(400))
			}
		})
		.await;

		assert_eq!(result.unwrap_err().status, 400);
		assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
	}

	/// Purpose: A positive `Retry-After` overrides the computed backoff.
	#[tokio::test(start_paused = true)]
	async fn test_retry_after_overrides_backoff() {
		let start = Instant::now();
		let attempt_count = Arc::new(AtomicU32::new(0));
		let attempt_count_clone = Arc::clone(&attempt_count);

		let result: Result<&str, MockError> = retry(&RetryConfig::default(), || {
			let count = Arc::clone(&attempt_count_clone);
			async move {
				if count.fetch_add(1, Ordering::SeqCst) == 0 {
					Err(MockError {
						status: 503,
						retry_after: Some(Duration::from_secs(7)),
					})
				} else {
					Ok("done")
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), "done");
		let elapsed = start.elapsed();
		assert!(elapsed >= Duration::from_secs(7));
		assert!(elapsed < Duration::from_millis(7010));
	}

	/// Purpose: Recovery after transient failures returns the success value.
	#[tokio::test(start_paused = true)]
	async fn test_succeeds_after_retries() {
		let attempt_count = Arc::new(AtomicU32::new(0));
		let attempt_count_clone = Arc::clone(&attempt_count);

		let result: Result<&str, MockError> = retry(&RetryConfig::default(), || {
			let count = Arc::clone(&attempt_count_clone);
			async move {
				if count.fetch_add(1, Ordering::SeqCst) < 2 {
					Err(MockError::status(502))
				} else {
					Ok("success")
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), "success");
		assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
	}

	/// Purpose: Cancelling during a backoff sleep returns promptly instead of
	/// waiting out the delay.
	#[tokio::test(start_paused = true)]
	async fn test_cancel_aborts_backoff_sleep() {
		let cancel = CancellationToken::new();
		let trigger = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(500)).await;
			trigger.cancel();
		});

		let start = Instant::now();
		let attempt_count = Arc::new(AtomicU32::new(0));
		let attempt_count_clone = Arc::clone(&attempt_count);

		let result: Result<(), CancellableError> =
			retry_with_cancel(&RetryConfig::default(), &cancel, || {
				let count = Arc::clone(&attempt_count_clone);
				async move {
					count.fetch_add(1, Ordering::SeqCst);
					Err(CancellableError::Busy)
				}
			})
			.await;

		assert_eq!(result.unwrap_err(), CancellableError::Cancelled);
		assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
		assert!(start.elapsed() < Duration::from_millis(1000));
	}

	#[tokio::test]
	async fn test_already_cancelled_token_skips_call() {
		let cancel = CancellationToken::new();
		cancel.cancel();

		let attempt_count = Arc::new(AtomicU32::new(0));
		let attempt_count_clone = Arc::clone(&attempt_count);

		let result: Result<(), CancellableError> =
			retry_with_cancel(&RetryConfig::default(), &cancel, || {
				let count = Arc::clone(&attempt_count_clone);
				async move {
					count.fetch_add(1, Ordering::SeqCst);
					Err(CancellableError::Busy)
				}
			})
			.await;

		assert_eq!(result.unwrap_err(), CancellableError::Cancelled);
		assert_eq!(attempt_count.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn test_delay_respects_max_delay() {
		let cfg = RetryConfig {
			max_retries: 10,
			..RetryConfig::default()
		};

		assert_eq!(calculate_delay(&cfg, 0), Duration::from_millis(1000));
		assert_eq!(calculate_delay(&cfg, 3), Duration::from_millis(8000));
		assert_eq!(calculate_delay(&cfg, 5), Duration::from_millis(30_000));
		assert_eq!(calculate_delay(&cfg, 9), Duration::from_millis(30_000));
	}

	#[test]
	fn test_jitter_stays_within_bounds() {
		let cfg = RetryConfig {
			jitter: true,
			..RetryConfig::default()
		};

		for _ in 0..50 {
			let delay = calculate_delay(&cfg, 1);
			assert!(delay >= Duration::from_millis(1000));
			assert!(delay <= Duration::from_millis(3000));
		}
	}

	#[test]
	fn test_parse_retry_after_seconds() {
		assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
		assert_eq!(parse_retry_after(" 3 "), Some(Duration::from_secs(3)));
		assert_eq!(parse_retry_after("0"), None);
		assert_eq!(parse_retry_after("soon"), None);
	}

	#[test]
	fn test_parse_retry_after_http_date() {
		let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 27, 30).unwrap();
		assert_eq!(
			parse_retry_after_at("Wed, 21 Oct 2015 07:28:00 GMT", now),
			Some(Duration::from_secs(30))
		);
		// A date in the past does not override backoff.
		assert_eq!(
			parse_retry_after_at("Wed, 21 Oct 2015 07:27:00 GMT", now),
			None
		);
	}
}
