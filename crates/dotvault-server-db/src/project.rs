// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Project ownership lookups.
//!
//! Projects are managed elsewhere; the env file endpoints only need to know
//! whether a project belongs to the caller.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};

use crate::env_file::parse_timestamp;
use crate::error::DbError;
use crate::types::{OwnerId, Project, ProjectId};

#[async_trait]
pub trait ProjectStore: Send + Sync {
	/// The project, only if `owner_id` owns it.
	async fn get_owned_project(
		&self,
		project_id: &ProjectId,
		owner_id: &OwnerId,
	) -> Result<Option<Project>, DbError>;
}

#[async_trait]
impl ProjectStore for ProjectRepository {
	async fn get_owned_project(
		&self,
		project_id: &ProjectId,
		owner_id: &OwnerId,
	) -> Result<Option<Project>, DbError> {
		self.get_owned_project(project_id, owner_id).await
	}
}

#[derive(Clone)]
pub struct ProjectRepository {
	pool: SqlitePool,
}

impl ProjectRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self), fields(owner_id = %owner_id))]
	pub async fn create_project(&self, owner_id: &OwnerId, name: &str) -> Result<Project, DbError> {
		let project = Project {
			id: ProjectId::generate(),
			owner_id: *owner_id,
			name: name.to_string(),
			created_at: Utc::now(),
		};

		sqlx::query(
			r#"
			INSERT INTO projects (id, owner_id, name, created_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(project.id.to_string())
		.bind(owner_id.to_string())
		.bind(name)
		.bind(project.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(project_id = %project.id, "project created");
		Ok(project)
	}

	#[tracing::instrument(skip(self), fields(project_id = %project_id, owner_id = %owner_id))]
	pub async fn get_owned_project(
		&self,
		project_id: &ProjectId,
		owner_id: &OwnerId,
	) -> Result<Option<Project>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, owner_id, name, created_at
			FROM projects
			WHERE id = ? AND owner_id = ?
			"#,
		)
		.bind(project_id.to_string())
		.bind(owner_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| parse_project_row(&r)).transpose()
	}
}

fn parse_project_row(row: &sqlx::sqlite::SqliteRow) -> Result<Project, DbError> {
	let id: String = row.get("id");
	let owner_id: String = row.get("owner_id");
	Ok(Project {
		id: id
			.parse()
			.map_err(|e| DbError::Internal(format!("Invalid project id: {e}")))?,
		owner_id: owner_id
			.parse()
			.map_err(|e| DbError::Internal(format!("Invalid owner id: {e}")))?,
		name: row.get("name"),
		created_at: parse_timestamp(row.get("created_at"))?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn owner_sees_project() {
		let pool = create_test_pool().await;
		let repo = ProjectRepository::new(pool);
		let owner = OwnerId::generate();

		let created = repo.create_project(&owner, "web").await.unwrap();
		let fetched = repo
			.get_owned_project(&created.id, &owner)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(fetched.name, "web");
		assert_eq!(fetched.owner_id, owner);
	}

	#[tokio::test]
	async fn other_owner_and_missing_project_look_the_same() {
		let pool = create_test_pool().await;
		let repo = ProjectRepository::new(pool);
		let created = repo
			.create_project(&OwnerId::generate(), "web")
			.await
			.unwrap();

		let foreign = repo
			.get_owned_project(&created.id, &OwnerId::generate())
			.await
			.unwrap();
		let missing = repo
			.get_owned_project(&ProjectId::generate(), &created.owner_id)
			.await
			.unwrap();

		assert!(foreign.is_none());
		assert!(missing.is_none());
	}
}
