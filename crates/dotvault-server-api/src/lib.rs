// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod env_files;
pub mod error;
pub mod health;

pub use env_files::{
	DecryptRequest, DecryptResponse, ListVersionsResponse, RetrieveQuery, RetrieveResponse,
	UploadRequest, UploadResponse, VersionSummary, VersionsQuery,
};
pub use error::ErrorResponse;
pub use health::{ComponentHealth, HealthComponents, HealthResponse, HealthStatus};
