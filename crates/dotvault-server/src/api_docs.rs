// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OpenAPI document, served at `/api/openapi.json`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
	info(
		title = "dotvault Server API",
		version = "1.0.0",
		description = "Encrypted, versioned storage for .env files. Authenticate with `Authorization: Bearer dv_...` or `X-API-Key: dv_...`.",
		license(name = "Proprietary")
	),
	servers(
		(url = "/", description = "Local server")
	),
	tags(
		(name = "env-files", description = "Upload, retrieve, list and decrypt env file versions"),
		(name = "health", description = "Health checks and metrics")
	),
	paths(
		crate::routes::env_files::upload_env_file,
		crate::routes::env_files::get_env_file,
		crate::routes::env_files::list_env_file_versions,
		crate::routes::env_files::decrypt_env_file,
		crate::routes::health::health_check,
		crate::routes::health::prometheus_metrics,
	),
	components(
		schemas(
			dotvault_server_api::UploadRequest,
			dotvault_server_api::UploadResponse,
			dotvault_server_api::RetrieveResponse,
			dotvault_server_api::ListVersionsResponse,
			dotvault_server_api::VersionSummary,
			dotvault_server_api::DecryptRequest,
			dotvault_server_api::DecryptResponse,
			dotvault_server_api::ErrorResponse,
			dotvault_server_api::HealthResponse,
			dotvault_server_api::HealthComponents,
			dotvault_server_api::ComponentHealth,
			dotvault_server_api::HealthStatus,
			dotvault_server_cipher::EncryptedPayload,
		)
	)
)]
pub struct ApiDoc;
