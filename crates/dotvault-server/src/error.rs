// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::{header::RETRY_AFTER, HeaderMap, HeaderValue, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use dotvault_server_api::ErrorResponse;
use dotvault_server_cipher::CipherError;
use dotvault_server_db::DbError;

pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing API key";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// Malformed or missing request fields.
	#[error("Validation failed: {0}")]
	Validation(String),

	/// Never says which part of the credential was wrong.
	#[error("Unauthorized")]
	Unauthorized,

	/// Missing, or owned by someone else.
	#[error("Not found")]
	NotFound,

	#[error("Rate limited, retry after {retry_after}s")]
	RateLimited { limit: u32, retry_after: u64 },

	/// Wrong passphrase, tampering and corruption all look the same.
	#[error("Decryption failed")]
	Decryption,

	#[error("Dependency unavailable: {0}")]
	DependencyUnavailable(String),

	#[error("Request timed out")]
	Timeout,

	#[error("Internal error: {0}")]
	Internal(String),
}

impl ServerError {
	pub fn kind(&self) -> &'static str {
		match self {
			ServerError::Validation(_) => "validation_error",
			ServerError::Unauthorized => "unauthorized",
			ServerError::NotFound => "not_found",
			ServerError::RateLimited { .. } => "rate_limited",
			ServerError::Decryption => "decryption_failed",
			ServerError::DependencyUnavailable(_) => "dependency_unavailable",
			ServerError::Timeout => "timeout",
			ServerError::Internal(_) => "internal_error",
		}
	}

	pub fn status(&self) -> StatusCode {
		match self {
			ServerError::Validation(_) => StatusCode::BAD_REQUEST,
			ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
			ServerError::NotFound => StatusCode::NOT_FOUND,
			ServerError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
			ServerError::Decryption => StatusCode::UNPROCESSABLE_ENTITY,
			ServerError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
			ServerError::Timeout => StatusCode::GATEWAY_TIMEOUT,
			ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// The message returned to callers. Internal detail stays in the logs.
	fn public_message(&self) -> String {
		match self {
			ServerError::Validation(msg) => msg.clone(),
			ServerError::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
			ServerError::NotFound => "Not found".to_string(),
			ServerError::RateLimited { retry_after, .. } => {
				format!("Too many requests, retry after {retry_after} seconds")
			}
			ServerError::Decryption => "Decryption failed".to_string(),
			ServerError::DependencyUnavailable(_) => {
				"A required service is temporarily unavailable".to_string()
			}
			ServerError::Timeout => "The request took too long".to_string(),
			ServerError::Internal(_) => "An internal error occurred".to_string(),
		}
	}
}

impl From<DbError> for ServerError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::VersionConflict { attempts } => ServerError::DependencyUnavailable(format!(
				"version assignment contended after {attempts} attempts"
			)),
			DbError::Sqlx(e) if is_unavailable(&e) => {
				ServerError::DependencyUnavailable(format!("database: {e}"))
			}
			other => ServerError::Internal(other.to_string()),
		}
	}
}

fn is_unavailable(err: &sqlx::Error) -> bool {
	match err {
		sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
		sqlx::Error::Database(db_err) => matches!(db_err.code().as_deref(), Some("5" | "6" | "517")),
		_ => false,
	}
}

impl From<CipherError> for ServerError {
	fn from(err: CipherError) -> Self {
		match err {
			CipherError::Decryption => ServerError::Decryption,
			CipherError::InvalidPayload(msg) | CipherError::InvalidScheme(msg) => {
				ServerError::Validation(msg)
			}
			CipherError::Encryption(msg) => ServerError::Internal(format!("encryption: {msg}")),
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		match &self {
			ServerError::Internal(detail) => tracing::error!(error = %detail, "internal error"),
			ServerError::DependencyUnavailable(detail) => {
				tracing::error!(error = %detail, "dependency unavailable")
			}
			ServerError::Timeout => tracing::warn!("request timed out"),
			_ => tracing::debug!(kind = self.kind(), "request rejected"),
		}

		let mut headers = HeaderMap::new();
		let retry_after = match self {
			ServerError::RateLimited { limit, retry_after } => {
				headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
				headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
				headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
				Some(retry_after)
			}
			_ => None,
		};

		let body = ErrorResponse {
			error: self.kind().to_string(),
			message: self.public_message(),
			retry_after,
		};
		(self.status(), headers, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn statuses_and_kinds() {
		let cases = [
			(ServerError::Validation("x".into()), 400, "validation_error"),
			(ServerError::Unauthorized, 401, "unauthorized"),
			(ServerError::NotFound, 404, "not_found"),
			(
				ServerError::RateLimited {
					limit: 20,
					retry_after: 5,
				},
				429,
				"rate_limited",
			),
			(ServerError::Decryption, 422, "decryption_failed"),
			(ServerError::DependencyUnavailable("db".into()), 503, "dependency_unavailable"),
			(ServerError::Timeout, 504, "timeout"),
			(ServerError::Internal("boom".into()), 500, "internal_error"),
		];
		for (err, status, kind) in cases {
			assert_eq!(err.status().as_u16(), status);
			assert_eq!(err.kind(), kind);
		}
	}

	#[test]
	fn internal_detail_is_not_returned() {
		let err = ServerError::Internal("sqlite file at /var/lib/dotvault.db".into());
		assert!(!err.public_message().contains("/var/lib"));
		let err = ServerError::DependencyUnavailable("redis://:hunter2@cache".into());
		assert!(!err.public_message().contains("hunter2"));
	}

	#[test]
	fn rate_limited_response_carries_retry_after() {
		let response = ServerError::RateLimited {
			limit: 20,
			retry_after: 17,
		}
		.into_response();
		assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
		assert_eq!(response.headers()[RETRY_AFTER], "17");
		assert_eq!(response.headers()["x-ratelimit-limit"], "20");
	}

	#[test]
	fn version_conflict_is_dependency_unavailable() {
		let err: ServerError = DbError::VersionConflict { attempts: 5 }.into();
		assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
	}

	#[test]
	fn cipher_errors_map() {
		assert!(matches!(
			ServerError::from(CipherError::Decryption),
			ServerError::Decryption
		));
		assert!(matches!(
			ServerError::from(CipherError::InvalidPayload("iv".into())),
			ServerError::Validation(_)
		));
	}
}
