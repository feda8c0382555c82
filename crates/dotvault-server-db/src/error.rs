// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	/// Every attempt at assigning the next version lost a race.
	#[error("Version assignment still contended after {attempts} attempts")]
	VersionConflict { attempts: u32 },

	#[error("Internal: {0}")]
	Internal(String),
}

impl DbError {
	/// Unique-constraint violations and lock timeouts. Both mean another
	/// writer got there first.
	pub(crate) fn is_write_race(err: &sqlx::Error) -> bool {
		match err {
			sqlx::Error::Database(db_err) => {
				db_err.is_unique_violation()
					|| matches!(db_err.code().as_deref(), Some("5" | "6" | "517"))
			}
			_ => false,
		}
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
