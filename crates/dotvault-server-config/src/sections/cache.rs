// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-through cache configuration.

use std::time::Duration;

use dotvault_common_secret::SecretString;
use serde::Deserialize;

const DEFAULT_TTL_SECS: u64 = 60;
const DEFAULT_OP_TIMEOUT_MS: u64 = 250;
const DEFAULT_POOL_SIZE: usize = 16;

/// Which key-value backend holds cached env files.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheBackend {
	Memory,
	Redis { url: SecretString },
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
	pub backend: CacheBackend,
	pub ttl_secs: u64,
	pub op_timeout_ms: u64,
	pub pool_size: usize,
	pub namespace: Option<String>,
}

impl CacheConfig {
	pub fn ttl(&self) -> Duration {
		Duration::from_secs(self.ttl_secs)
	}

	pub fn op_timeout(&self) -> Duration {
		Duration::from_millis(self.op_timeout_ms)
	}
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			backend: CacheBackend::Memory,
			ttl_secs: DEFAULT_TTL_SECS,
			op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
			pool_size: DEFAULT_POOL_SIZE,
			namespace: Some("dotvault".to_string()),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfigLayer {
	/// `memory`, or a `redis://` / `rediss://` URL.
	#[serde(default)]
	pub url: Option<SecretString>,
	#[serde(default)]
	pub ttl_secs: Option<u64>,
	#[serde(default)]
	pub op_timeout_ms: Option<u64>,
	#[serde(default)]
	pub pool_size: Option<usize>,
	#[serde(default)]
	pub namespace: Option<String>,
}

impl CacheConfigLayer {
	pub fn merge(&mut self, other: CacheConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
		if other.ttl_secs.is_some() {
			self.ttl_secs = other.ttl_secs;
		}
		if other.op_timeout_ms.is_some() {
			self.op_timeout_ms = other.op_timeout_ms;
		}
		if other.pool_size.is_some() {
			self.pool_size = other.pool_size;
		}
		if other.namespace.is_some() {
			self.namespace = other.namespace;
		}
	}

	pub fn finalize(self) -> CacheConfig {
		let defaults = CacheConfig::default();
		let backend = match self.url {
			Some(url) if url.expose() != "memory" => CacheBackend::Redis { url },
			_ => CacheBackend::Memory,
		};

		CacheConfig {
			backend,
			ttl_secs: self.ttl_secs.unwrap_or(defaults.ttl_secs),
			op_timeout_ms: self.op_timeout_ms.unwrap_or(defaults.op_timeout_ms),
			pool_size: self.pool_size.unwrap_or(defaults.pool_size),
			namespace: self.namespace.or(defaults.namespace),
		}
	}
}
