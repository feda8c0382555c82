// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Env file HTTP handlers.
//!
//! Every handler admits the request first (pre-auth limit, API key, post-auth
//! limit) and only then looks at the body or query string.

use axum::{
	extract::{
		rejection::{JsonRejection, QueryRejection},
		Query, State,
	},
	http::{HeaderMap, HeaderValue, StatusCode},
	response::IntoResponse,
	Json,
};
use dotvault_server_cache::Source;
use dotvault_server_db::{EnvFileVersion, OwnerId, ProjectId};
use dotvault_server_ratelimit::Route;
use tracing::field::Empty;

pub use dotvault_server_api::env_files::*;
use dotvault_server_api::ErrorResponse;

use crate::{
	api::{with_timeout, AppState},
	client_info::ClientAddr,
	error::ServerError,
	guard::admit,
	validation::{
		classify_upload, parse_project_id, validate_environment, validate_passphrase,
		validate_version, UploadShape,
	},
};

pub const SOURCE_HEADER: &str = "x-dotvault-source";

#[utoipa::path(
	post,
	path = "/api/v1/env-files",
	request_body = UploadRequest,
	responses(
		(status = 201, description = "Version stored", body = UploadResponse),
		(status = 400, description = "Invalid request", body = ErrorResponse),
		(status = 401, description = "Invalid or missing API key", body = ErrorResponse),
		(status = 404, description = "Project not found", body = ErrorResponse),
		(status = 429, description = "Rate limited", body = ErrorResponse),
		(status = 503, description = "Store unavailable", body = ErrorResponse)
	),
	tag = "env-files"
)]
/// POST /api/v1/env-files - Store a new version.
#[tracing::instrument(skip_all, fields(project_id = Empty, environment = Empty, version = Empty))]
pub async fn upload_env_file(
	State(state): State<AppState>,
	client: ClientAddr,
	headers: HeaderMap,
	body: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
	let admitted = admit(&state, Route::Upload, &client, &headers).await?;
	let Json(req) = body.map_err(|e| ServerError::Validation(e.body_text()))?;

	let project_id = parse_project_id(&req.project_id)?;
	let environment = req.environment.clone();
	validate_environment(&environment)?;
	let span = tracing::Span::current();
	span.record("project_id", tracing::field::display(&project_id));
	span.record("environment", environment.as_str());

	let (payload, shape) = with_timeout(state.request.timeout(), async {
		require_owned_project(&state, &project_id, &admitted.key.owner_id).await?;

		match classify_upload(req, state.request.max_content_bytes, state.cipher.scheme())? {
			UploadShape::Raw {
				content,
				passphrase,
			} => {
				let cipher = state.cipher;
				let timer = state.metrics.cipher_duration.clone();
				let payload = tokio::task::spawn_blocking(move || {
					let _timer = timer.start_timer();
					cipher.encrypt(&content, &passphrase)
				})
				.await
				.map_err(|e| ServerError::Internal(format!("encryption task: {e}")))??;
				Ok((payload, "raw"))
			}
			UploadShape::Encrypted(payload) => Ok((payload, "encrypted")),
		}
	})
	.await?;

	// Not under the timeout: once the insert starts the client gets its answer.
	let created = state
		.env_files
		.append(&project_id, &environment, &payload)
		.await?;

	span.record("version", created.version);
	state.metrics.uploads.with_label_values(&[shape]).inc();
	tracing::info!(shape, "env file version stored");

	Ok((
		StatusCode::CREATED,
		admitted.rate_limit.headers(),
		Json(UploadResponse {
			id: created.id.to_string(),
			version: created.version,
		}),
	))
}

#[utoipa::path(
	get,
	path = "/api/v1/env-files",
	params(RetrieveQuery),
	responses(
		(status = 200, description = "Stored version", body = RetrieveResponse),
		(status = 400, description = "Invalid request", body = ErrorResponse),
		(status = 401, description = "Invalid or missing API key", body = ErrorResponse),
		(status = 404, description = "No such project, environment or version", body = ErrorResponse),
		(status = 429, description = "Rate limited", body = ErrorResponse)
	),
	tag = "env-files"
)]
/// GET /api/v1/env-files - Fetch the latest, or a given, version.
#[tracing::instrument(skip_all, fields(project_id = Empty, environment = Empty, source = Empty))]
pub async fn get_env_file(
	State(state): State<AppState>,
	client: ClientAddr,
	headers: HeaderMap,
	query: Result<Query<RetrieveQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServerError> {
	let admitted = admit(&state, Route::Retrieve, &client, &headers).await?;
	let Query(query) = query.map_err(|e| ServerError::Validation(e.body_text()))?;

	let project_id = parse_project_id(&query.project_id)?;
	validate_environment(&query.environment)?;
	let version = validate_version(query.version)?;
	let span = tracing::Span::current();
	span.record("project_id", tracing::field::display(&project_id));
	span.record("environment", query.environment.as_str());

	let (found, source) = with_timeout(state.request.timeout(), async {
		require_owned_project(&state, &project_id, &admitted.key.owner_id).await?;
		load(&state, &project_id, &query.environment, version).await
	})
	.await?;

	span.record("source", source.as_str());
	state
		.metrics
		.retrievals
		.with_label_values(&[source.as_str()])
		.inc();

	let mut response_headers = admitted.rate_limit.headers();
	response_headers.insert(SOURCE_HEADER, HeaderValue::from_static(source.as_str()));

	Ok((
		response_headers,
		Json(RetrieveResponse {
			id: found.id.to_string(),
			project_id: found.project_id.to_string(),
			environment: found.environment,
			version: found.version,
			payload: found.payload,
			created_at: found.created_at,
			source: source.to_string(),
		}),
	))
}

#[utoipa::path(
	get,
	path = "/api/v1/env-files/versions",
	params(VersionsQuery),
	responses(
		(status = 200, description = "Versions, newest first", body = ListVersionsResponse),
		(status = 401, description = "Invalid or missing API key", body = ErrorResponse),
		(status = 404, description = "No versions for this project and environment", body = ErrorResponse),
		(status = 429, description = "Rate limited", body = ErrorResponse)
	),
	tag = "env-files"
)]
/// GET /api/v1/env-files/versions - Version metadata without ciphertext.
#[tracing::instrument(skip_all)]
pub async fn list_env_file_versions(
	State(state): State<AppState>,
	client: ClientAddr,
	headers: HeaderMap,
	query: Result<Query<VersionsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServerError> {
	let admitted = admit(&state, Route::Versions, &client, &headers).await?;
	let Query(query) = query.map_err(|e| ServerError::Validation(e.body_text()))?;

	let project_id = parse_project_id(&query.project_id)?;
	validate_environment(&query.environment)?;

	let versions = with_timeout(state.request.timeout(), async {
		require_owned_project(&state, &project_id, &admitted.key.owner_id).await?;
		Ok(state
			.env_files
			.list_versions(&project_id, &query.environment)
			.await?)
	})
	.await?;

	if versions.is_empty() {
		return Err(ServerError::NotFound);
	}

	Ok((
		admitted.rate_limit.headers(),
		Json(ListVersionsResponse {
			project_id: project_id.to_string(),
			environment: query.environment,
			versions: versions
				.into_iter()
				.map(|v| VersionSummary {
					id: v.id.to_string(),
					version: v.version,
					checksum: v.checksum,
					scheme: v.scheme,
					created_at: v.created_at,
				})
				.collect(),
		}),
	))
}

#[utoipa::path(
	post,
	path = "/api/v1/env-files/decrypt",
	request_body = DecryptRequest,
	responses(
		(status = 200, description = "Decrypted content", body = DecryptResponse),
		(status = 401, description = "Invalid or missing API key", body = ErrorResponse),
		(status = 404, description = "No such project, environment or version", body = ErrorResponse),
		(status = 422, description = "Decryption failed", body = ErrorResponse),
		(status = 429, description = "Rate limited", body = ErrorResponse)
	),
	tag = "env-files"
)]
/// POST /api/v1/env-files/decrypt - Decrypt a stored version with a passphrase.
#[tracing::instrument(skip_all, fields(project_id = Empty, environment = Empty, version = Empty))]
pub async fn decrypt_env_file(
	State(state): State<AppState>,
	client: ClientAddr,
	headers: HeaderMap,
	body: Result<Json<DecryptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
	let admitted = admit(&state, Route::Decrypt, &client, &headers).await?;
	let Json(req) = body.map_err(|e| ServerError::Validation(e.body_text()))?;

	let project_id = parse_project_id(&req.project_id)?;
	validate_environment(&req.environment)?;
	let version = validate_version(req.version)?;
	validate_passphrase(&req.passphrase)?;
	let span = tracing::Span::current();
	span.record("project_id", tracing::field::display(&project_id));
	span.record("environment", req.environment.as_str());

	let (found, content) = with_timeout(state.request.timeout(), async {
		require_owned_project(&state, &project_id, &admitted.key.owner_id).await?;
		let (found, _) = load(&state, &project_id, &req.environment, version).await?;
		span.record("version", found.version);

		let cipher = state.cipher;
		let timer = state.metrics.cipher_duration.clone();
		let payload = found.payload.clone();
		let passphrase = req.passphrase;
		let opened = tokio::task::spawn_blocking(move || {
			let _timer = timer.start_timer();
			let content = cipher.decrypt(&payload, &passphrase)?;
			if !payload.matches_checksum(&content) {
				tracing::debug!("checksum does not match decrypted content");
				return Err(dotvault_server_cipher::CipherError::Decryption);
			}
			Ok(content)
		})
		.await
		.map_err(|e| ServerError::Internal(format!("decryption task: {e}")))?;

		match opened {
			Ok(content) => Ok((found, content)),
			Err(e) => {
				state.metrics.decrypt_failures.inc();
				Err(e.into())
			}
		}
	})
	.await?;

	Ok((
		admitted.rate_limit.headers(),
		Json(DecryptResponse {
			id: found.id.to_string(),
			version: found.version,
			content: content.as_str().to_string(),
		}),
	))
}

/// Projects owned by someone else are reported exactly like missing ones.
async fn require_owned_project(
	state: &AppState,
	project_id: &ProjectId,
	owner_id: &OwnerId,
) -> Result<(), ServerError> {
	match state.projects.get_owned_project(project_id, owner_id).await? {
		Some(_) => Ok(()),
		None => {
			tracing::debug!("project missing or not owned by caller");
			Err(ServerError::NotFound)
		}
	}
}

async fn load(
	state: &AppState,
	project_id: &ProjectId,
	environment: &str,
	version: Option<i64>,
) -> Result<(EnvFileVersion, Source), ServerError> {
	let found = match version {
		Some(v) => state
			.env_files
			.load_version(project_id, environment, v)
			.await?
			.map(|found| (found, Source::Store)),
		None => state.env_files.load_latest(project_id, environment).await?,
	};
	found.ok_or(ServerError::NotFound)
}
