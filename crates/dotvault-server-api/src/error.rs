// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ErrorResponse {
	/// Machine-readable kind, e.g. `rate_limited`.
	pub error: String,
	pub message: String,
	/// Seconds until the limit resets. Only for `rate_limited`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}
