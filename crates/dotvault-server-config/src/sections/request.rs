// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-request bounds for the env file endpoints.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONTENT_BYTES: usize = 1024 * 1024;
const DEFAULT_APPEND_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct RequestConfig {
	/// Upper bound on handler work, key derivation included.
	pub timeout_secs: u64,
	pub max_content_bytes: usize,
	/// Attempts at assigning a version before giving up on a contended pair.
	pub append_max_attempts: u32,
}

impl RequestConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}

	/// Body limit for the HTTP layer. Base64 inflates ciphertext by a third and
	/// the JSON envelope adds a little more.
	pub fn body_limit(&self) -> usize {
		self.max_content_bytes * 2 + 16 * 1024
	}
}

impl Default for RequestConfig {
	fn default() -> Self {
		Self {
			timeout_secs: DEFAULT_TIMEOUT_SECS,
			max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
			append_max_attempts: DEFAULT_APPEND_MAX_ATTEMPTS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestConfigLayer {
	#[serde(default)]
	pub timeout_secs: Option<u64>,
	#[serde(default)]
	pub max_content_bytes: Option<usize>,
	#[serde(default)]
	pub append_max_attempts: Option<u32>,
}

impl RequestConfigLayer {
	pub fn merge(&mut self, other: RequestConfigLayer) {
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
		if other.max_content_bytes.is_some() {
			self.max_content_bytes = other.max_content_bytes;
		}
		if other.append_max_attempts.is_some() {
			self.append_max_attempts = other.append_max_attempts;
		}
	}

	pub fn finalize(self) -> RequestConfig {
		RequestConfig {
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
			max_content_bytes: self.max_content_bytes.unwrap_or(DEFAULT_MAX_CONTENT_BYTES),
			append_max_attempts: self
				.append_max_attempts
				.unwrap_or(DEFAULT_APPEND_MAX_ATTEMPTS),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = RequestConfigLayer::default().finalize();
		assert_eq!(config.timeout(), Duration::from_secs(30));
		assert_eq!(config.max_content_bytes, 1024 * 1024);
		assert_eq!(config.append_max_attempts, 5);
		assert!(config.body_limit() > config.max_content_bytes * 4 / 3);
	}
}
