// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Advisory cache of the latest version per (project, environment).
//!
//! Every operation is bounded by a timeout and never fails: errors are
//! logged and treated as a miss, so callers always fall through to the
//! version store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dotvault_server_db::{EnvFileVersion, ProjectId};

use crate::backend::KvBackend;
use crate::error::KvError;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Clone)]
pub struct EnvFileCache {
	backend: Arc<dyn KvBackend>,
	ttl: Duration,
	op_timeout: Duration,
}

impl EnvFileCache {
	pub fn new(backend: Arc<dyn KvBackend>, ttl: Duration, op_timeout: Duration) -> Self {
		Self {
			backend,
			ttl,
			op_timeout,
		}
	}

	pub fn backend_name(&self) -> &'static str {
		self.backend.name()
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	pub fn key(project_id: &ProjectId, environment: &str) -> String {
		format!("envfile:{project_id}:{environment}")
	}

	#[tracing::instrument(skip(self), fields(project_id = %project_id, backend = self.backend.name()))]
	pub async fn get(&self, project_id: &ProjectId, environment: &str) -> Option<EnvFileVersion> {
		let key = Self::key(project_id, environment);
		let bytes = match self.bounded(self.backend.get(&key)).await {
			Ok(Some(bytes)) if !bytes.is_empty() => bytes,
			Ok(_) => return None,
			Err(e) => {
				tracing::warn!(error = %e, "cache read failed, treating as miss");
				return None;
			}
		};

		match serde_json::from_slice::<EnvFileVersion>(&bytes) {
			Ok(entry) if entry.project_id == *project_id && entry.environment == environment => {
				Some(entry)
			}
			Ok(_) => {
				tracing::warn!("cache entry does not match its key, discarding");
				self.invalidate(project_id, environment).await;
				None
			}
			Err(e) => {
				tracing::warn!(error = %e, "undecodable cache entry, discarding");
				self.invalidate(project_id, environment).await;
				None
			}
		}
	}

	#[tracing::instrument(
		skip(self, entry),
		fields(project_id = %entry.project_id, version = entry.version, backend = self.backend.name())
	)]
	pub async fn put(&self, entry: &EnvFileVersion) {
		let bytes = match serde_json::to_vec(entry) {
			Ok(bytes) => bytes,
			Err(e) => {
				tracing::warn!(error = %KvError::Serialisation(e.to_string()), "cache write skipped");
				return;
			}
		};

		let key = Self::key(&entry.project_id, &entry.environment);
		match self
			.bounded(self.backend.put_fenced(&key, entry.version, &bytes, Some(self.ttl)))
			.await
		{
			Ok(true) => {}
			Ok(false) => tracing::debug!("newer version already written, cache fill dropped"),
			Err(e) => tracing::warn!(error = %e, "cache write failed"),
		}
	}

	/// Drop the cached latest and refuse later fills older than `version`.
	/// The marker is an empty value, which reads as a miss.
	#[tracing::instrument(skip(self), fields(project_id = %project_id, backend = self.backend.name()))]
	pub async fn invalidate_below(&self, project_id: &ProjectId, environment: &str, version: i64) {
		let key = Self::key(project_id, environment);
		if let Err(e) = self
			.bounded(self.backend.put_fenced(&key, version, &[], Some(self.ttl)))
			.await
		{
			tracing::warn!(error = %e, "cache invalidation failed");
		}
	}

	#[tracing::instrument(skip(self), fields(project_id = %project_id, backend = self.backend.name()))]
	pub async fn invalidate(&self, project_id: &ProjectId, environment: &str) {
		let key = Self::key(project_id, environment);
		if let Err(e) = self.bounded(self.backend.delete(&key)).await {
			tracing::warn!(error = %e, "cache invalidation failed");
		}
	}

	/// Unlike the other operations this reports failure, for health checks.
	pub async fn ping(&self) -> Result<(), KvError> {
		self.bounded(self.backend.ping()).await
	}

	async fn bounded<T>(
		&self,
		op: impl Future<Output = Result<T, KvError>>,
	) -> Result<T, KvError> {
		match tokio::time::timeout(self.op_timeout, op).await {
			Ok(result) => result,
			Err(_) => Err(KvError::Timeout),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryKv;
	use crate::testing::{FailingKv, HangingKv};
	use chrono::Utc;
	use dotvault_server_db::testing::sample_payload;
	use dotvault_server_db::EnvFileId;

	fn entry(project_id: ProjectId, environment: &str, version: i64) -> EnvFileVersion {
		EnvFileVersion {
			id: EnvFileId::generate(),
			project_id,
			environment: environment.to_string(),
			version,
			payload: sample_payload(version),
			created_at: Utc::now(),
		}
	}

	fn memory_cache() -> (EnvFileCache, MemoryKv) {
		let kv = MemoryKv::new();
		let cache = EnvFileCache::new(Arc::new(kv.clone()), DEFAULT_TTL, DEFAULT_OP_TIMEOUT);
		(cache, kv)
	}

	#[test]
	fn key_format() {
		let id: ProjectId = "6f1c2a4e-3b7d-4c1e-9a2f-0d8e5b6c7a91".parse().unwrap();
		assert_eq!(
			EnvFileCache::key(&id, "production"),
			"envfile:6f1c2a4e-3b7d-4c1e-9a2f-0d8e5b6c7a91:production"
		);
	}

	#[tokio::test]
	async fn put_then_get_returns_entry() {
		let (cache, _) = memory_cache();
		let project = ProjectId::generate();
		let stored = entry(project, "staging", 3);

		cache.put(&stored).await;
		assert_eq!(cache.get(&project, "staging").await, Some(stored));
		assert_eq!(cache.get(&project, "production").await, None);
	}

	#[tokio::test]
	async fn invalidate_removes_entry() {
		let (cache, kv) = memory_cache();
		let project = ProjectId::generate();
		cache.put(&entry(project, "dev", 1)).await;

		cache.invalidate(&project, "dev").await;
		assert_eq!(cache.get(&project, "dev").await, None);
		assert_eq!(kv.len().await, 0);
	}

	#[tokio::test]
	async fn fill_older_than_invalidation_is_dropped() {
		let (cache, _) = memory_cache();
		let project = ProjectId::generate();
		cache.put(&entry(project, "dev", 1)).await;

		cache.invalidate_below(&project, "dev", 2).await;
		assert_eq!(cache.get(&project, "dev").await, None);

		cache.put(&entry(project, "dev", 1)).await;
		assert_eq!(cache.get(&project, "dev").await, None);

		let current = entry(project, "dev", 2);
		cache.put(&current).await;
		assert_eq!(cache.get(&project, "dev").await, Some(current));
	}

	#[tokio::test(start_paused = true)]
	async fn entries_expire_after_ttl() {
		let (cache, _) = memory_cache();
		let project = ProjectId::generate();
		cache.put(&entry(project, "dev", 1)).await;

		tokio::time::advance(DEFAULT_TTL + Duration::from_millis(1)).await;
		assert_eq!(cache.get(&project, "dev").await, None);
	}

	#[tokio::test]
	async fn garbage_entry_is_a_miss_and_removed() {
		let (cache, kv) = memory_cache();
		let project = ProjectId::generate();
		kv.put(&EnvFileCache::key(&project, "dev"), b"not json", None)
			.await
			.unwrap();

		assert_eq!(cache.get(&project, "dev").await, None);
		assert_eq!(kv.len().await, 0);
	}

	#[tokio::test]
	async fn entry_under_wrong_key_is_ignored() {
		let (cache, kv) = memory_cache();
		let project = ProjectId::generate();
		let other = entry(ProjectId::generate(), "dev", 1);
		kv.put(
			&EnvFileCache::key(&project, "dev"),
			&serde_json::to_vec(&other).unwrap(),
			None,
		)
		.await
		.unwrap();

		assert_eq!(cache.get(&project, "dev").await, None);
	}

	#[tokio::test]
	async fn backend_failures_are_absorbed() {
		let cache = EnvFileCache::new(Arc::new(FailingKv), DEFAULT_TTL, DEFAULT_OP_TIMEOUT);
		let project = ProjectId::generate();

		cache.put(&entry(project, "dev", 1)).await;
		cache.invalidate(&project, "dev").await;
		cache.invalidate_below(&project, "dev", 2).await;
		assert_eq!(cache.get(&project, "dev").await, None);
		assert!(cache.ping().await.is_err());
	}

	#[tokio::test(start_paused = true)]
	async fn slow_backend_times_out() {
		let cache = EnvFileCache::new(Arc::new(HangingKv), DEFAULT_TTL, DEFAULT_OP_TIMEOUT);
		let project = ProjectId::generate();

		assert_eq!(cache.get(&project, "dev").await, None);
		assert!(matches!(cache.ping().await, Err(KvError::Timeout)));
	}
}
