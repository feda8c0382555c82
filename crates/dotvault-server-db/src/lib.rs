// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence for the dotvault server: the env file version store plus the
//! project and API key tables it is checked against.

pub mod api_key;
pub mod env_file;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod project;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use api_key::{ApiKeyRepository, ApiKeyStore};
pub use env_file::{EnvFileRepository, VersionStore, DEFAULT_APPEND_MAX_ATTEMPTS};
pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::{create_pool, ping};
pub use project::{ProjectRepository, ProjectStore};
pub use sqlx::sqlite::SqlitePool;
pub use types::{
	ApiKey, ApiKeyId, EnvFileId, EnvFileVersion, EnvFileVersionSummary, OwnerId, Project, ProjectId,
};
