// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::backend::KvBackend;
use crate::error::KvError;

#[derive(Debug, Clone)]
struct KvEntry {
	value: Vec<u8>,
	fence: Option<i64>,
	expires_at: Option<Instant>,
}

impl KvEntry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|at| now >= at)
	}
}

/// Process-local backend for single-instance deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
	data: Arc<RwLock<HashMap<String, KvEntry>>>,
}

impl MemoryKv {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn len(&self) -> usize {
		let now = Instant::now();
		self.data
			.read()
			.await
			.values()
			.filter(|e| !e.is_expired(now))
			.count()
	}
}

#[async_trait]
impl KvBackend for MemoryKv {
	fn name(&self) -> &'static str {
		"memory"
	}

	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
		let now = Instant::now();
		{
			let data = self.data.read().await;
			match data.get(key) {
				Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
				Some(_) => {}
				None => return Ok(None),
			}
		}

		let mut data = self.data.write().await;
		if data.get(key).is_some_and(|e| e.is_expired(now)) {
			data.remove(key);
		}
		Ok(None)
	}

	async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), KvError> {
		let expires_at = ttl.map(|d| Instant::now() + d);
		self.data.write().await.insert(
			key.to_string(),
			KvEntry {
				value: value.to_vec(),
				fence: None,
				expires_at,
			},
		);
		Ok(())
	}

	async fn put_fenced(
		&self,
		key: &str,
		fence: i64,
		value: &[u8],
		ttl: Option<Duration>,
	) -> Result<bool, KvError> {
		let now = Instant::now();
		let mut data = self.data.write().await;
		let newer_held = data
			.get(key)
			.filter(|e| !e.is_expired(now))
			.and_then(|e| e.fence)
			.is_some_and(|held| held > fence);
		if newer_held {
			return Ok(false);
		}

		data.insert(
			key.to_string(),
			KvEntry {
				value: value.to_vec(),
				fence: Some(fence),
				expires_at: ttl.map(|d| now + d),
			},
		);
		Ok(true)
	}

	async fn delete(&self, key: &str) -> Result<bool, KvError> {
		Ok(self.data.write().await.remove(key).is_some())
	}

	async fn ping(&self) -> Result<(), KvError> {
		Ok(())
	}
}
