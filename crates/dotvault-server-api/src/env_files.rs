// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use dotvault_common_secret::SecretString;
use dotvault_server_cipher::EncryptedPayload;
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::{IntoParams, ToSchema};

/// Upload a new version.
///
/// Either `content` and `passphrase` (encrypted by the server) or
/// `ciphertext`, `iv`, `salt` and `checksum` (encrypted by the client, with
/// an optional `scheme`). Fields from both shapes in one request are rejected.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UploadRequest {
	pub project_id: String,
	pub environment: String,

	#[serde(default)]
	pub content: Option<String>,
	#[serde(default)]
	#[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
	pub passphrase: Option<SecretString>,

	#[serde(default)]
	pub ciphertext: Option<String>,
	#[serde(default)]
	pub iv: Option<String>,
	#[serde(default)]
	pub salt: Option<String>,
	#[serde(default)]
	pub checksum: Option<String>,
	/// Defaults to the server's configured scheme.
	#[serde(default)]
	pub scheme: Option<String>,
}

impl UploadRequest {
	pub fn has_raw_fields(&self) -> bool {
		self.content.is_some() || self.passphrase.is_some()
	}

	pub fn has_encrypted_fields(&self) -> bool {
		self.ciphertext.is_some()
			|| self.iv.is_some()
			|| self.salt.is_some()
			|| self.checksum.is_some()
			|| self.scheme.is_some()
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UploadResponse {
	pub id: String,
	pub version: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RetrieveQuery {
	pub project_id: String,
	pub environment: String,
	/// Latest when omitted.
	#[serde(default)]
	pub version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
	pub id: String,
	pub project_id: String,
	pub environment: String,
	pub version: i64,
	#[serde(flatten)]
	pub payload: EncryptedPayload,
	pub created_at: DateTime<Utc>,
	/// `cache` or `store`. Informational only.
	pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VersionsQuery {
	pub project_id: String,
	pub environment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
	pub id: String,
	pub version: i64,
	pub checksum: String,
	pub scheme: String,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ListVersionsResponse {
	pub project_id: String,
	pub environment: String,
	/// Newest first.
	pub versions: Vec<VersionSummary>,
}

/// Decrypt a stored version on the server.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DecryptRequest {
	pub project_id: String,
	pub environment: String,
	#[serde(default)]
	pub version: Option<i64>,
	#[cfg_attr(feature = "openapi", schema(value_type = String))]
	pub passphrase: SecretString,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct DecryptResponse {
	pub id: String,
	pub version: i64,
	pub content: String,
}
