// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! API key repository.
//!
//! Only SHA-256 hashes of tokens are stored.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};

use crate::env_file::parse_timestamp;
use crate::error::DbError;
use crate::types::{ApiKey, ApiKeyId, OwnerId};

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
	async fn get_api_key_by_hash(&self, token_hash: &str) -> Result<Option<ApiKey>, DbError>;
	async fn update_last_used(&self, id: &ApiKeyId) -> Result<(), DbError>;
}

#[async_trait]
impl ApiKeyStore for ApiKeyRepository {
	async fn get_api_key_by_hash(&self, token_hash: &str) -> Result<Option<ApiKey>, DbError> {
		self.get_api_key_by_hash(token_hash).await
	}

	async fn update_last_used(&self, id: &ApiKeyId) -> Result<(), DbError> {
		self.update_last_used(id).await
	}
}

#[derive(Clone)]
pub struct ApiKeyRepository {
	pool: SqlitePool,
}

impl ApiKeyRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a key from an already-hashed token.
	#[tracing::instrument(skip(self, token_hash), fields(owner_id = %owner_id))]
	pub async fn create_api_key(
		&self,
		owner_id: &OwnerId,
		name: &str,
		token_hash: &str,
	) -> Result<ApiKeyId, DbError> {
		let id = ApiKeyId::generate();

		sqlx::query(
			r#"
			INSERT INTO api_keys (id, owner_id, name, token_hash, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(id.to_string())
		.bind(owner_id.to_string())
		.bind(name)
		.bind(token_hash)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(api_key_id = %id, "API key created");
		Ok(id)
	}

	/// Look up a key by token hash. Revoked keys are returned; callers check
	/// [`ApiKey::is_revoked`].
	#[tracing::instrument(skip(self, token_hash))]
	pub async fn get_api_key_by_hash(&self, token_hash: &str) -> Result<Option<ApiKey>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, owner_id, name, created_at, last_used_at, revoked_at
			FROM api_keys
			WHERE token_hash = ?
			"#,
		)
		.bind(token_hash)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| parse_api_key_row(&r)).transpose()
	}

	/// Returns false when the key does not exist or was already revoked.
	#[tracing::instrument(skip(self), fields(api_key_id = %id))]
	pub async fn revoke_api_key(&self, id: &ApiKeyId) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			UPDATE api_keys
			SET revoked_at = ?
			WHERE id = ? AND revoked_at IS NULL
			"#,
		)
		.bind(Utc::now().to_rfc3339())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		let revoked = result.rows_affected() > 0;
		if revoked {
			tracing::info!(api_key_id = %id, "API key revoked");
		}
		Ok(revoked)
	}

	#[tracing::instrument(skip(self), fields(api_key_id = %id))]
	pub async fn update_last_used(&self, id: &ApiKeyId) -> Result<(), DbError> {
		sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
			.bind(Utc::now().to_rfc3339())
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;
		Ok(())
	}
}

fn parse_api_key_row(row: &sqlx::sqlite::SqliteRow) -> Result<ApiKey, DbError> {
	let id: String = row.get("id");
	let owner_id: String = row.get("owner_id");
	let last_used_at: Option<String> = row.get("last_used_at");
	let revoked_at: Option<String> = row.get("revoked_at");

	Ok(ApiKey {
		id: id
			.parse()
			.map_err(|e| DbError::Internal(format!("Invalid API key id: {e}")))?,
		owner_id: owner_id
			.parse()
			.map_err(|e| DbError::Internal(format!("Invalid owner id: {e}")))?,
		name: row.get("name"),
		created_at: parse_timestamp(row.get("created_at"))?,
		last_used_at: last_used_at.map(parse_timestamp).transpose()?,
		revoked_at: revoked_at.map(parse_timestamp).transpose()?,
	})
}
