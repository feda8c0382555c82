// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixtures shared by unit and integration tests.

use std::path::Path;

use dotvault_server_cipher::EncryptedPayload;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::migrations::run_migrations;
use crate::pool::create_pool;
use crate::project::ProjectRepository;
use crate::types::{OwnerId, ProjectId};

/// In-memory database. One connection, since each `:memory:` connection is
/// its own database.
pub async fn create_test_pool() -> SqlitePool {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}

/// WAL database in `dir`, for tests that need real concurrent connections.
pub async fn file_backed_pool(dir: impl AsRef<Path>) -> SqlitePool {
	let path = dir.as_ref().join("dotvault-test.db");
	let pool = create_pool(&format!("sqlite:{}", path.display()), 8)
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}

pub async fn insert_project(pool: &SqlitePool) -> ProjectId {
	insert_project_for(pool, &OwnerId::generate()).await
}

pub async fn insert_project_for(pool: &SqlitePool, owner: &OwnerId) -> ProjectId {
	ProjectRepository::new(pool.clone())
		.create_project(owner, "test project")
		.await
		.unwrap()
		.id
}

/// Structurally valid payload whose fields vary with `n`. Not decryptable.
pub fn sample_payload(n: i64) -> EncryptedPayload {
	use base64::Engine;
	let b64 = base64::engine::general_purpose::STANDARD;
	let byte = (n & 0xff) as u8;

	EncryptedPayload {
		ciphertext: b64.encode([byte; 32]),
		iv: b64.encode([byte; dotvault_server_cipher::IV_SIZE]),
		salt: b64.encode([byte; dotvault_server_cipher::SALT_SIZE]),
		checksum: dotvault_server_cipher::checksum(&format!("N={n}")),
		scheme: dotvault_server_cipher::CipherScheme::default().to_string(),
	}
}
