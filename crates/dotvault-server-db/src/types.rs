// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifiers and row types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dotvault_server_cipher::EncryptedPayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			pub fn into_inner(self) -> Uuid {
				self.0
			}

			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(ProjectId, "Identifier of a project that owns env files.");
define_id_type!(OwnerId, "Identifier of the user who owns projects and API keys.");
define_id_type!(ApiKeyId, "Identifier of an API key.");
define_id_type!(EnvFileId, "Identifier of one stored env file version.");

/// One immutable version of an env file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvFileVersion {
	pub id: EnvFileId,
	pub project_id: ProjectId,
	pub environment: String,
	pub version: i64,
	pub payload: EncryptedPayload,
	pub created_at: DateTime<Utc>,
}

/// Version metadata without the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvFileVersionSummary {
	pub id: EnvFileId,
	pub version: i64,
	pub checksum: String,
	pub scheme: String,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
	pub id: ProjectId,
	pub owner_id: OwnerId,
	pub name: String,
	pub created_at: DateTime<Utc>,
}

/// Stored API key. The token itself is never persisted, only its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
	pub id: ApiKeyId,
	pub owner_id: OwnerId,
	pub name: String,
	pub created_at: DateTime<Utc>,
	pub last_used_at: Option<DateTime<Utc>>,
	pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}
}
