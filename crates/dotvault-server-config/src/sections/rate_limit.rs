// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admission control ceilings.
//!
//! Pre-auth ceilings are per client address and per route. The post-auth
//! ceiling is per API key and applies to every authenticated route.

use std::time::Duration;

use dotvault_common_secret::SecretString;
use serde::Deserialize;

const DEFAULT_WINDOW_SECS: u64 = 60;
const DEFAULT_UPLOAD_PRE_AUTH: u32 = 20;
const DEFAULT_READ_PRE_AUTH: u32 = 40;
const DEFAULT_DECRYPT_PRE_AUTH: u32 = 10;
const DEFAULT_HEALTH_PRE_AUTH: u32 = 30;
const DEFAULT_POST_AUTH: u32 = 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_MAX_TRACKED_IDENTITIES: usize = 100_000;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
	/// Counter store. `None` keeps counters in process.
	pub redis_url: Option<SecretString>,
	pub window_secs: u64,
	pub upload_pre_auth: u32,
	pub read_pre_auth: u32,
	pub decrypt_pre_auth: u32,
	pub health_pre_auth: u32,
	pub post_auth: u32,
	pub sweep_interval_secs: u64,
	pub max_tracked_identities: usize,
}

impl RateLimitConfig {
	pub fn window(&self) -> Duration {
		Duration::from_secs(self.window_secs)
	}

	pub fn sweep_interval(&self) -> Duration {
		Duration::from_secs(self.sweep_interval_secs)
	}
}

impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			redis_url: None,
			window_secs: DEFAULT_WINDOW_SECS,
			upload_pre_auth: DEFAULT_UPLOAD_PRE_AUTH,
			read_pre_auth: DEFAULT_READ_PRE_AUTH,
			decrypt_pre_auth: DEFAULT_DECRYPT_PRE_AUTH,
			health_pre_auth: DEFAULT_HEALTH_PRE_AUTH,
			post_auth: DEFAULT_POST_AUTH,
			sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
			max_tracked_identities: DEFAULT_MAX_TRACKED_IDENTITIES,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateLimitConfigLayer {
	#[serde(default)]
	pub redis_url: Option<SecretString>,
	#[serde(default)]
	pub window_secs: Option<u64>,
	#[serde(default)]
	pub upload_pre_auth: Option<u32>,
	#[serde(default)]
	pub read_pre_auth: Option<u32>,
	#[serde(default)]
	pub decrypt_pre_auth: Option<u32>,
	#[serde(default)]
	pub health_pre_auth: Option<u32>,
	#[serde(default)]
	pub post_auth: Option<u32>,
	#[serde(default)]
	pub sweep_interval_secs: Option<u64>,
	#[serde(default)]
	pub max_tracked_identities: Option<usize>,
}

impl RateLimitConfigLayer {
	pub fn merge(&mut self, other: RateLimitConfigLayer) {
		if other.redis_url.is_some() {
			self.redis_url = other.redis_url;
		}
		if other.window_secs.is_some() {
			self.window_secs = other.window_secs;
		}
		if other.upload_pre_auth.is_some() {
			self.upload_pre_auth = other.upload_pre_auth;
		}
		if other.read_pre_auth.is_some() {
			self.read_pre_auth = other.read_pre_auth;
		}
		if other.decrypt_pre_auth.is_some() {
			self.decrypt_pre_auth = other.decrypt_pre_auth;
		}
		if other.health_pre_auth.is_some() {
			self.health_pre_auth = other.health_pre_auth;
		}
		if other.post_auth.is_some() {
			self.post_auth = other.post_auth;
		}
		if other.sweep_interval_secs.is_some() {
			self.sweep_interval_secs = other.sweep_interval_secs;
		}
		if other.max_tracked_identities.is_some() {
			self.max_tracked_identities = other.max_tracked_identities;
		}
	}

	pub fn finalize(self) -> RateLimitConfig {
		RateLimitConfig {
			redis_url: self.redis_url,
			window_secs: self.window_secs.unwrap_or(DEFAULT_WINDOW_SECS),
			upload_pre_auth: self.upload_pre_auth.unwrap_or(DEFAULT_UPLOAD_PRE_AUTH),
			read_pre_auth: self.read_pre_auth.unwrap_or(DEFAULT_READ_PRE_AUTH),
			decrypt_pre_auth: self.decrypt_pre_auth.unwrap_or(DEFAULT_DECRYPT_PRE_AUTH),
			health_pre_auth: self.health_pre_auth.unwrap_or(DEFAULT_HEALTH_PRE_AUTH),
			post_auth: self.post_auth.unwrap_or(DEFAULT_POST_AUTH),
			sweep_interval_secs: self
				.sweep_interval_secs
				.unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
			max_tracked_identities: self
				.max_tracked_identities
				.unwrap_or(DEFAULT_MAX_TRACKED_IDENTITIES),
		}
	}
}
