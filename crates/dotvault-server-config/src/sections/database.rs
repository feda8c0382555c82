// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Version store database configuration.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_URL: &str = "sqlite:./dotvault.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_PING_TIMEOUT_MS: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub url: String,
	pub max_connections: u32,
	/// Upper bound on the health check's database round trip.
	pub ping_timeout_ms: u64,
}

impl DatabaseConfig {
	pub fn ping_timeout(&self) -> Duration {
		Duration::from_millis(self.ping_timeout_ms)
	}
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_URL.to_string(),
			max_connections: DEFAULT_MAX_CONNECTIONS,
			ping_timeout_ms: DEFAULT_PING_TIMEOUT_MS,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub max_connections: Option<u32>,
	#[serde(default)]
	pub ping_timeout_ms: Option<u64>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.max_connections.is_some() {
			self.max_connections = other.max_connections;
		}
		if other.ping_timeout_ms.is_some() {
			self.ping_timeout_ms = other.ping_timeout_ms;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			url: self.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
			max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
			ping_timeout_ms: self.ping_timeout_ms.unwrap_or(DEFAULT_PING_TIMEOUT_MS),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = DatabaseConfigLayer::default().finalize();
		assert_eq!(config.url, "sqlite:./dotvault.db");
		assert_eq!(config.max_connections, 10);
		assert_eq!(config.ping_timeout(), Duration::from_secs(1));
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = DatabaseConfigLayer {
			url: Some("sqlite:base.db".to_string()),
			max_connections: Some(4),
			ping_timeout_ms: None,
		};
		base.merge(DatabaseConfigLayer {
			url: Some("sqlite:override.db".to_string()),
			max_connections: None,
			ping_timeout_ms: Some(200),
		});
		assert_eq!(base.url.as_deref(), Some("sqlite:override.db"));
		assert_eq!(base.max_connections, Some(4));
		assert_eq!(base.ping_timeout_ms, Some(200));
	}
}
