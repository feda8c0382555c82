// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redis/Valkey backend over a deadpool connection pool.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use ::redis::AsyncCommands;

use crate::backend::KvBackend;
use crate::error::KvError;

/// KEYS[1] value, KEYS[2] fence; ARGV fence, value, ttl in ms (0 for none).
const FENCED_SET_SCRIPT: &str = r#"
local held = redis.call('GET', KEYS[2])
if held and tonumber(held) > tonumber(ARGV[1]) then
	return 0
end
if tonumber(ARGV[3]) > 0 then
	redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
	redis.call('SET', KEYS[2], ARGV[1], 'PX', ARGV[3])
else
	redis.call('SET', KEYS[1], ARGV[2])
	redis.call('SET', KEYS[2], ARGV[1])
end
return 1
"#;

#[derive(Clone)]
pub struct RedisKv {
	pool: Pool,
	namespace: Option<String>,
}

impl RedisKv {
	/// Build the pool. The server does not need Redis to start, so no
	/// connection is attempted here.
	pub fn new(url: &str, namespace: Option<String>, pool_size: usize) -> Result<Self, KvError> {
		let pool = Config::from_url(url)
			.builder()
			.map_err(|e| KvError::Connection(e.to_string()))?
			.max_size(pool_size)
			.runtime(Runtime::Tokio1)
			.build()
			.map_err(|e| KvError::Connection(e.to_string()))?;

		Ok(Self { pool, namespace })
	}

	pub fn pool(&self) -> &Pool {
		&self.pool
	}

	fn prefixed_key(&self, key: &str) -> String {
		match &self.namespace {
			Some(ns) => format!("{ns}:{key}"),
			None => key.to_string(),
		}
	}

	fn fence_key(prefixed: &str) -> String {
		format!("{prefixed}:fence")
	}

	async fn connection(&self) -> Result<deadpool_redis::Connection, KvError> {
		self.pool
			.get()
			.await
			.map_err(|e| KvError::Connection(e.to_string()))
	}
}

#[async_trait]
impl KvBackend for RedisKv {
	fn name(&self) -> &'static str {
		"redis"
	}

	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
		let mut conn = self.connection().await?;
		conn.get(self.prefixed_key(key))
			.await
			.map_err(|e| KvError::Backend(e.to_string()))
	}

	async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), KvError> {
		let mut conn = self.connection().await?;
		let prefixed = self.prefixed_key(key);

		let mut pipe = ::redis::pipe();
		pipe.atomic();
		match ttl {
			Some(duration) => pipe.set_ex(&prefixed, value, duration.as_secs().max(1)),
			None => pipe.set(&prefixed, value),
		};
		pipe.del(Self::fence_key(&prefixed)).ignore();

		pipe.query_async::<()>(&mut *conn)
			.await
			.map_err(|e| KvError::Backend(e.to_string()))
	}

	async fn put_fenced(
		&self,
		key: &str,
		fence: i64,
		value: &[u8],
		ttl: Option<Duration>,
	) -> Result<bool, KvError> {
		let mut conn = self.connection().await?;
		let prefixed = self.prefixed_key(key);
		let ttl_ms = ttl.map_or(0, |d| d.as_millis().max(1) as u64);

		let stored: i64 = ::redis::Script::new(FENCED_SET_SCRIPT)
			.key(&prefixed)
			.key(Self::fence_key(&prefixed))
			.arg(fence)
			.arg(value)
			.arg(ttl_ms)
			.invoke_async(&mut *conn)
			.await
			.map_err(|e| KvError::Backend(e.to_string()))?;
		Ok(stored == 1)
	}

	async fn delete(&self, key: &str) -> Result<bool, KvError> {
		let mut conn = self.connection().await?;
		let prefixed = self.prefixed_key(key);
		let (deleted, _): (i64, i64) = ::redis::pipe()
			.atomic()
			.del(&prefixed)
			.del(Self::fence_key(&prefixed))
			.query_async(&mut *conn)
			.await
			.map_err(|e| KvError::Backend(e.to_string()))?;
		Ok(deleted > 0)
	}

	async fn ping(&self) -> Result<(), KvError> {
		let mut conn = self.connection().await?;
		::redis::cmd("PING")
			.query_async::<String>(&mut *conn)
			.await
			.map_err(|e| KvError::Connection(e.to_string()))?;
		Ok(())
	}
}
