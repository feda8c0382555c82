// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[("001_initial", include_str!("../migrations/001_initial.sql"))];

/// Apply embedded migrations. Every statement is idempotent.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for statement in split_statements(sql) {
			if let Err(e) = sqlx::query(&statement).execute(pool).await {
				let msg = e.to_string();
				if msg.contains("already exists") || msg.contains("duplicate column") {
					continue;
				}
				return Err(DbError::Internal(format!("migration {name} failed: {msg}")));
			}
		}
		tracing::debug!(migration = name, "migration applied");
	}

	tracing::info!(count = MIGRATIONS.len(), "database migrations complete");
	Ok(())
}

fn split_statements(sql: &str) -> Vec<String> {
	sql.split(';')
		.map(|chunk| {
			chunk
				.lines()
				.filter(|line| !line.trim_start().starts_with("--"))
				.collect::<Vec<_>>()
				.join("\n")
		})
		.filter(|statement| !statement.trim().is_empty())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn comments_and_blank_statements_are_dropped() {
		let statements = split_statements("-- header\nCREATE TABLE a (x);\n\n-- tail\n;");
		assert_eq!(statements.len(), 1);
		assert!(statements[0].contains("CREATE TABLE a"));
	}

	#[tokio::test]
	async fn migrations_are_rerunnable() {
		let pool = crate::testing::create_test_pool().await;
		run_migrations(&pool).await.unwrap();

		let tables: Vec<(String,)> =
			sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
				.fetch_all(&pool)
				.await
				.unwrap();
		let names: Vec<_> = tables.into_iter().map(|(n,)| n).collect();
		assert!(names.contains(&"env_files".to_string()));
		assert!(names.contains(&"api_keys".to_string()));
		assert!(names.contains(&"projects".to_string()));
	}
}
