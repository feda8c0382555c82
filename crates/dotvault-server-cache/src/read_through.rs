// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Version store fronted by the env file cache.

use std::fmt;
use std::sync::Arc;

use dotvault_server_cipher::EncryptedPayload;
use dotvault_server_db::{DbError, EnvFileVersion, EnvFileVersionSummary, ProjectId, VersionStore};

use crate::env_file_cache::EnvFileCache;

/// Where a returned version was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
	Cache,
	Store,
}

impl Source {
	pub fn as_str(&self) -> &'static str {
		match self {
			Source::Cache => "cache",
			Source::Store => "store",
		}
	}
}

impl fmt::Display for Source {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone)]
pub struct CachedVersionStore {
	store: Arc<dyn VersionStore>,
	cache: EnvFileCache,
}

impl CachedVersionStore {
	pub fn new(store: Arc<dyn VersionStore>, cache: EnvFileCache) -> Self {
		Self { store, cache }
	}

	pub fn cache(&self) -> &EnvFileCache {
		&self.cache
	}

	/// Latest version, from cache when present, otherwise from the store
	/// (populating the cache on the way out).
	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn load_latest(
		&self,
		project_id: &ProjectId,
		environment: &str,
	) -> Result<Option<(EnvFileVersion, Source)>, DbError> {
		if let Some(hit) = self.cache.get(project_id, environment).await {
			tracing::debug!(version = hit.version, "cache hit");
			return Ok(Some((hit, Source::Cache)));
		}

		let Some(latest) = self.store.get_latest(project_id, environment).await? else {
			return Ok(None);
		};
		self.cache.put(&latest).await;
		Ok(Some((latest, Source::Store)))
	}

	/// A specific version. Always read from the store, since only the latest
	/// version is cached.
	pub async fn load_version(
		&self,
		project_id: &ProjectId,
		environment: &str,
		version: i64,
	) -> Result<Option<EnvFileVersion>, DbError> {
		self.store.get_version(project_id, environment, version).await
	}

	pub async fn list_versions(
		&self,
		project_id: &ProjectId,
		environment: &str,
	) -> Result<Vec<EnvFileVersionSummary>, DbError> {
		self.store.list_versions(project_id, environment).await
	}

	/// Append a new version and drop the cached latest before returning, so
	/// the caller's acknowledgement is never followed by a stale read. Fills
	/// of older versions racing with the append are refused by the cache.
	#[tracing::instrument(skip(self, payload), fields(project_id = %project_id))]
	pub async fn append(
		&self,
		project_id: &ProjectId,
		environment: &str,
		payload: &EncryptedPayload,
	) -> Result<EnvFileVersion, DbError> {
		let created = self.store.append(project_id, environment, payload).await?;
		self.cache
			.invalidate_below(project_id, environment, created.version)
			.await;
		Ok(created)
	}
}
