// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared counters in Redis/Valkey for multi-instance deployments.
//!
//! Each slot is a key whose TTL is the window deadline. Redis expires slots
//! itself, so there is nothing to sweep.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use tokio::time::Instant;

use crate::error::RateLimitError;
use crate::store::{RateLimitStore, WindowSnapshot};

const HIT_SCRIPT: &str = r#"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
	redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
	redis.call('PEXPIRE', KEYS[1], ARGV[1])
	ttl = tonumber(ARGV[1])
end
return {count, ttl}
"#;

#[derive(Clone)]
pub struct RedisRateLimitStore {
	pool: Pool,
	prefix: String,
}

impl RedisRateLimitStore {
	pub fn new(url: &str, pool_size: usize) -> Result<Self, RateLimitError> {
		let pool = Config::from_url(url)
			.builder()
			.map_err(|e| RateLimitError::Connection(e.to_string()))?
			.max_size(pool_size)
			.runtime(Runtime::Tokio1)
			.build()
			.map_err(|e| RateLimitError::Connection(e.to_string()))?;

		Ok(Self {
			pool,
			prefix: "dotvault:ratelimit".to_string(),
		})
	}

	fn slot_key(&self, key: &str) -> String {
		format!("{}:{key}", self.prefix)
	}
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
	fn name(&self) -> &'static str {
		"redis"
	}

	async fn hit(&self, key: &str, window: Duration) -> Result<WindowSnapshot, RateLimitError> {
		let mut conn = self
			.pool
			.get()
			.await
			.map_err(|e| RateLimitError::Connection(e.to_string()))?;

		let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1);
		let (count, ttl_ms): (i64, i64) = redis::Script::new(HIT_SCRIPT)
			.key(self.slot_key(key))
			.arg(window_ms)
			.invoke_async(&mut *conn)
			.await
			.map_err(|e| RateLimitError::Backend(e.to_string()))?;

		let remaining = Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(0));
		Ok(WindowSnapshot {
			count: u32::try_from(count).unwrap_or(u32::MAX),
			reset_at: Instant::now() + remaining,
		})
	}

	async fn sweep(&self, _grace: Duration) -> Result<usize, RateLimitError> {
		Ok(0)
	}

	fn tracked(&self) -> Option<usize> {
		None
	}
}
