// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remote sync configuration: pagination, scheduling, retries and pacing.

use std::time::Duration;

use serde::Deserialize;
use tether_common_http::{RetryConfig, DEFAULT_SLOW_DOWN_THRESHOLD};

use crate::error::ConfigError;

const DEFAULT_PER_PAGE: u32 = 100;
const DEFAULT_MAX_PAGES: u32 = 50;
const DEFAULT_INTERVAL_SECS: u64 = 900;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_MAX: u32 = 3;
const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 1000;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Largest page size the REST API accepts.
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
	pub per_page: u32,
	pub max_pages: u32,
	/// Seconds between periodic sync cycles. Zero disables the loop.
	pub interval_secs: u64,
	pub request_timeout_secs: u64,
	pub retry_max: u32,
	pub retry_initial_delay_ms: u64,
	pub retry_max_delay_ms: u64,
	/// Remaining fraction of the rate-limit quota below which requests are
	/// paced.
	pub slow_down_threshold: f64,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			per_page: DEFAULT_PER_PAGE,
			max_pages: DEFAULT_MAX_PAGES,
			interval_secs: DEFAULT_INTERVAL_SECS,
			request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
			retry_max: DEFAULT_RETRY_MAX,
			retry_initial_delay_ms: DEFAULT_RETRY_INITIAL_DELAY_MS,
			retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
			slow_down_threshold: DEFAULT_SLOW_DOWN_THRESHOLD,
		}
	}
}

impl SyncConfig {
	pub fn interval(&self) -> Option<Duration> {
		(self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn retry_config(&self) -> RetryConfig {
		RetryConfig {
			max_retries: self.retry_max,
			initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
			max_delay: Duration::from_millis(self.retry_max_delay_ms),
			..RetryConfig::default()
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfigLayer {
	#[serde(default)]
	pub per_page: Option<u32>,
	#[serde(default)]
	pub max_pages: Option<u32>,
	#[serde(default)]
	pub interval_secs: Option<u64>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub retry_max: Option<u32>,
	#[serde(default)]
	pub retry_initial_delay_ms: Option<u64>,
	#[serde(default)]
	pub retry_max_delay_ms: Option<u64>,
	#[serde(default)]
	pub slow_down_threshold: Option<f64>,
}

impl SyncConfigLayer {
	pub fn merge(&mut self, other: SyncConfigLayer) {
		if other.per_page.is_some() {
			self.per_page = other.per_page;
		}
		if other.max_pages.is_some() {
			self.max_pages = other.max_pages;
		}
		if other.interval_secs.is_some() {
			self.interval_secs = other.interval_secs;
		}
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.retry_max.is_some() {
			self.retry_max = other.retry_max;
		}
		if other.retry_initial_delay_ms.is_some() {
			self.retry_initial_delay_ms = other.retry_initial_delay_ms;
		}
		if other.retry_max_delay_ms.is_some() {
			self.retry_max_delay_ms = other.retry_max_delay_ms;
		}
		if other.slow_down_threshold.is_some() {
			self.slow_down_threshold = other.slow_down_threshold;
		}
	}

	pub fn build(self) -> Result<SyncConfig, ConfigError> {
		let defaults = SyncConfig::default();
		let config = SyncConfig {
			per_page: self.per_page.unwrap_or(defaults.per_page),
			max_pages: self.max_pages.unwrap_or(defaults.max_pages),
			interval_secs: self.interval_secs.unwrap_or(defaults.interval_secs),
			request_timeout_secs: self
				.request_timeout_secs
				.unwrap_or(defaults.request_timeout_secs),
			retry_max: self.retry_max.unwrap_or(defaults.retry_max),
			retry_initial_delay_ms: self
				.retry_initial_delay_ms
				.unwrap_or(defaults.retry_initial_delay_ms),
			retry_max_delay_ms: self
				.retry_max_delay_ms
				.unwrap_or(defaults.retry_max_delay_ms),
			slow_down_threshold: self
				.slow_down_threshold
				.unwrap_or(defaults.slow_down_threshold),
		};

		if config.per_page == 0 || config.per_page > MAX_PER_PAGE {
			return Err(ConfigError::Validation(format!(
				"sync per_page must be between 1 and {MAX_PER_PAGE}, got {}",
				config.per_page
			)));
		}
		if config.max_pages == 0 {
			return Err(ConfigError::Validation(
				"sync max_pages must be at least 1".to_string(),
			));
		}
		if config.request_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"sync request_timeout_secs must be at least 1".to_string(),
			));
		}
		if config.retry_initial_delay_ms > config.retry_max_delay_ms {
			return Err(ConfigError::Validation(
				"sync retry_initial_delay_ms must not exceed retry_max_delay_ms".to_string(),
			));
		}
		if !(0.0..=1.0).contains(&config.slow_down_threshold) {
			return Err(ConfigError::Validation(format!(
				"sync slow_down_threshold must be within 0.0..=1.0, got {}",
				config.slow_down_threshold
			)));
		}

		Ok(config)
	}
}
