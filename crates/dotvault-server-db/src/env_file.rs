// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only version store for encrypted env files.
//!
//! Versions for a (project, environment) pair start at 1 and increase by one
//! per append. The next version is computed and inserted in a single
//! statement, and `UNIQUE(project_id, environment, version)` rejects any
//! second writer that computed the same number. Rejected appends are retried
//! a bounded number of times.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dotvault_server_cipher::EncryptedPayload;
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{EnvFileId, EnvFileVersion, EnvFileVersionSummary, ProjectId};

pub const DEFAULT_APPEND_MAX_ATTEMPTS: u32 = 5;

#[async_trait]
pub trait VersionStore: Send + Sync {
	/// Highest version for the pair, if any.
	async fn get_latest(
		&self,
		project_id: &ProjectId,
		environment: &str,
	) -> Result<Option<EnvFileVersion>, DbError>;

	async fn get_version(
		&self,
		project_id: &ProjectId,
		environment: &str,
		version: i64,
	) -> Result<Option<EnvFileVersion>, DbError>;

	/// Newest first.
	async fn list_versions(
		&self,
		project_id: &ProjectId,
		environment: &str,
	) -> Result<Vec<EnvFileVersionSummary>, DbError>;

	/// Store `payload` as `max(version) + 1` for the pair.
	async fn append(
		&self,
		project_id: &ProjectId,
		environment: &str,
		payload: &EncryptedPayload,
	) -> Result<EnvFileVersion, DbError>;
}

#[async_trait]
impl VersionStore for EnvFileRepository {
	async fn get_latest(
		&self,
		project_id: &ProjectId,
		environment: &str,
	) -> Result<Option<EnvFileVersion>, DbError> {
		self.get_latest(project_id, environment).await
	}

	async fn get_version(
		&self,
		project_id: &ProjectId,
		environment: &str,
		version: i64,
	) -> Result<Option<EnvFileVersion>, DbError> {
		self.get_version(project_id, environment, version).await
	}

	async fn list_versions(
		&self,
		project_id: &ProjectId,
		environment: &str,
	) -> Result<Vec<EnvFileVersionSummary>, DbError> {
		self.list_versions(project_id, environment).await
	}

	async fn append(
		&self,
		project_id: &ProjectId,
		environment: &str,
		payload: &EncryptedPayload,
	) -> Result<EnvFileVersion, DbError> {
		self.append(project_id, environment, payload).await
	}
}

#[derive(Clone)]
pub struct EnvFileRepository {
	pool: SqlitePool,
	max_attempts: u32,
}

impl EnvFileRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			max_attempts: DEFAULT_APPEND_MAX_ATTEMPTS,
		}
	}

	/// Override how many times a contended append is attempted.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts.max(1);
		self
	}

	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn get_latest(
		&self,
		project_id: &ProjectId,
		environment: &str,
	) -> Result<Option<EnvFileVersion>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, project_id, environment, version, ciphertext, iv, salt,
			       checksum, scheme, created_at
			FROM env_files
			WHERE project_id = ? AND environment = ?
			ORDER BY version DESC
			LIMIT 1
			"#,
		)
		.bind(project_id.to_string())
		.bind(environment)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| parse_env_file_row(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn get_version(
		&self,
		project_id: &ProjectId,
		environment: &str,
		version: i64,
	) -> Result<Option<EnvFileVersion>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, project_id, environment, version, ciphertext, iv, salt,
			       checksum, scheme, created_at
			FROM env_files
			WHERE project_id = ? AND environment = ? AND version = ?
			"#,
		)
		.bind(project_id.to_string())
		.bind(environment)
		.bind(version)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| parse_env_file_row(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(project_id = %project_id))]
	pub async fn list_versions(
		&self,
		project_id: &ProjectId,
		environment: &str,
	) -> Result<Vec<EnvFileVersionSummary>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, version, checksum, scheme, created_at
			FROM env_files
			WHERE project_id = ? AND environment = ?
			ORDER BY version DESC
			"#,
		)
		.bind(project_id.to_string())
		.bind(environment)
		.fetch_all(&self.pool)
		.await?;

		rows
			.iter()
			.map(|row| {
				Ok(EnvFileVersionSummary {
					id: parse_id(row.get("id"))?,
					version: row.get("version"),
					checksum: row.get("checksum"),
					scheme: row.get("scheme"),
					created_at: parse_timestamp(row.get("created_at"))?,
				})
			})
			.collect()
	}

	#[tracing::instrument(
		skip(self, payload),
		fields(project_id = %project_id, checksum = %payload.checksum)
	)]
	pub async fn append(
		&self,
		project_id: &ProjectId,
		environment: &str,
		payload: &EncryptedPayload,
	) -> Result<EnvFileVersion, DbError> {
		for attempt in 1..=self.max_attempts {
			match self.try_append(project_id, environment, payload).await {
				Ok(row) => {
					tracing::debug!(version = row.version, attempt, "env file version appended");
					return Ok(row);
				}
				Err(DbError::Sqlx(e)) if DbError::is_write_race(&e) => {
					tracing::warn!(attempt, error = %e, "version assignment conflicted, retrying");
					if attempt < self.max_attempts {
						let backoff = fastrand::u64(5..=25) * u64::from(attempt);
						tokio::time::sleep(Duration::from_millis(backoff)).await;
					}
				}
				Err(e) => return Err(e),
			}
		}

		tracing::error!(
			attempts = self.max_attempts,
			"giving up on contended version assignment"
		);
		Err(DbError::VersionConflict {
			attempts: self.max_attempts,
		})
	}

	async fn try_append(
		&self,
		project_id: &ProjectId,
		environment: &str,
		payload: &EncryptedPayload,
	) -> Result<EnvFileVersion, DbError> {
		let id = EnvFileId::generate();
		let now = Utc::now();

		let row = sqlx::query(
			r#"
			INSERT INTO env_files (
				id, project_id, environment, version, ciphertext, iv, salt,
				checksum, scheme, created_at
			)
			SELECT ?, ?, ?, COALESCE(MAX(version), 0) + 1, ?, ?, ?, ?, ?, ?
			FROM env_files
			WHERE project_id = ? AND environment = ?
			RETURNING version
			"#,
		)
		.bind(id.to_string())
		.bind(project_id.to_string())
		.bind(environment)
		.bind(&payload.ciphertext)
		.bind(&payload.iv)
		.bind(&payload.salt)
		.bind(&payload.checksum)
		.bind(&payload.scheme)
		.bind(now.to_rfc3339())
		.bind(project_id.to_string())
		.bind(environment)
		.fetch_one(&self.pool)
		.await?;

		Ok(EnvFileVersion {
			id,
			project_id: *project_id,
			environment: environment.to_string(),
			version: row.get("version"),
			payload: payload.clone(),
			created_at: now,
		})
	}
}

fn parse_env_file_row(row: &sqlx::sqlite::SqliteRow) -> Result<EnvFileVersion, DbError> {
	let project_id: String = row.get("project_id");
	Ok(EnvFileVersion {
		id: parse_id(row.get("id"))?,
		project_id: project_id
			.parse()
			.map_err(|e| DbError::Internal(format!("Invalid project id: {e}")))?,
		environment: row.get("environment"),
		version: row.get("version"),
		payload: EncryptedPayload {
			ciphertext: row.get("ciphertext"),
			iv: row.get("iv"),
			salt: row.get("salt"),
			checksum: row.get("checksum"),
			scheme: row.get("scheme"),
		},
		created_at: parse_timestamp(row.get("created_at"))?,
	})
}

fn parse_id(value: String) -> Result<EnvFileId, DbError> {
	value
		.parse()
		.map_err(|e| DbError::Internal(format!("Invalid env file id: {e}")))
}

pub(crate) fn parse_timestamp(value: String) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(&value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid timestamp: {e}")))
}
