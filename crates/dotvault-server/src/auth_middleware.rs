// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! API key authentication.
//!
//! Keys are presented as `Authorization: Bearer dv_...` or `X-API-Key: dv_...`.
//! Only the SHA-256 hash of a key is stored or looked up; raw keys are never
//! logged.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use dotvault_common_secret::SecretString;
use dotvault_server_db::{ApiKeyId, ApiKeyStore, OwnerId};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::error::ServerError;

pub const TOKEN_PREFIX: &str = "dv_";
const API_KEY_HEADER: &str = "x-api-key";
const TOKEN_BYTES: usize = 32;

/// A verified caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedKey {
	pub credential_id: ApiKeyId,
	pub owner_id: OwnerId,
}

pub fn hash_token(token: &str) -> String {
	hex::encode(Sha256::digest(token.as_bytes()))
}

/// New random API key. Shown to the operator once; only its hash is stored.
pub fn generate_token() -> SecretString {
	let mut bytes = [0u8; TOKEN_BYTES];
	rand::rngs::OsRng.fill_bytes(&mut bytes);
	SecretString::new(format!("{TOKEN_PREFIX}{}", hex::encode(bytes)))
}

/// Raw key from request headers, if one is present and well formed.
pub fn extract_api_token(headers: &HeaderMap) -> Option<SecretString> {
	let from_bearer = headers
		.get(AUTHORIZATION)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| {
			let (scheme, token) = v.trim().split_once(' ')?;
			scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
		});

	let token = from_bearer.or_else(|| {
		headers
			.get(API_KEY_HEADER)
			.and_then(|v| v.to_str().ok())
			.map(str::trim)
	})?;

	let body = token.strip_prefix(TOKEN_PREFIX)?;
	if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
		return None;
	}
	Some(SecretString::from(token))
}

/// Resolve the presented key to its credential and owner.
#[instrument(skip_all, fields(api_key_id = tracing::field::Empty))]
pub async fn authenticate(
	api_keys: &Arc<dyn ApiKeyStore>,
	headers: &HeaderMap,
) -> Result<AuthenticatedKey, ServerError> {
	let Some(token) = extract_api_token(headers) else {
		tracing::debug!("no usable API key presented");
		return Err(ServerError::Unauthorized);
	};

	let token_hash = hash_token(token.expose());
	let api_key = match api_keys.get_api_key_by_hash(&token_hash).await {
		Ok(Some(key)) => key,
		Ok(None) => {
			tracing::debug!("API key not found for token hash");
			return Err(ServerError::Unauthorized);
		}
		Err(e) => {
			tracing::error!(error = %e, "failed to look up API key");
			return Err(ServerError::DependencyUnavailable(format!(
				"api key lookup: {e}"
			)));
		}
	};

	tracing::Span::current().record("api_key_id", tracing::field::display(&api_key.id));

	if api_key.is_revoked() {
		tracing::debug!(api_key_id = %api_key.id, "API key is revoked");
		return Err(ServerError::Unauthorized);
	}

	let api_key_id = api_key.id;
	let store = Arc::clone(api_keys);
	tokio::spawn(async move {
		if let Err(e) = store.update_last_used(&api_key_id).await {
			tracing::warn!(error = %e, "failed to update API key last used");
		}
	});

	Ok(AuthenticatedKey {
		credential_id: api_key.id,
		owner_id: api_key.owner_id,
	})
}
