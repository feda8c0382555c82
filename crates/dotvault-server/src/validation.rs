// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request field validation.

use dotvault_common_secret::SecretString;
use dotvault_server_api::UploadRequest;
use dotvault_server_cipher::{CipherScheme, EncryptedPayload, TAG_SIZE};
use dotvault_server_db::ProjectId;
use zeroize::Zeroizing;

use crate::error::ServerError;

pub const MAX_ENVIRONMENT_LEN: usize = 64;

/// The two accepted upload bodies.
pub enum UploadShape {
	/// Plaintext to be encrypted here.
	Raw {
		content: Zeroizing<String>,
		passphrase: SecretString,
	},
	/// Encrypted by the client.
	Encrypted(EncryptedPayload),
}

pub fn parse_project_id(raw: &str) -> Result<ProjectId, ServerError> {
	raw.trim()
		.parse()
		.map_err(|_| ServerError::Validation("projectId must be a UUID".to_string()))
}

/// 1 to 64 characters of `[A-Za-z0-9._-]`.
pub fn validate_environment(environment: &str) -> Result<(), ServerError> {
	let valid_chars = environment
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
	if environment.is_empty() || environment.len() > MAX_ENVIRONMENT_LEN || !valid_chars {
		return Err(ServerError::Validation(format!(
			"environment must be 1-{MAX_ENVIRONMENT_LEN} characters of letters, digits, '.', '_' or '-'"
		)));
	}
	Ok(())
}

pub fn validate_version(version: Option<i64>) -> Result<Option<i64>, ServerError> {
	match version {
		Some(v) if v < 1 => Err(ServerError::Validation(
			"version must be a positive integer".to_string(),
		)),
		other => Ok(other),
	}
}

pub fn validate_passphrase(passphrase: &SecretString) -> Result<(), ServerError> {
	if passphrase.is_empty() {
		return Err(ServerError::Validation("passphrase must not be empty".to_string()));
	}
	Ok(())
}

/// Decide which shape an upload is, rejecting mixtures and partial shapes.
pub fn classify_upload(
	req: UploadRequest,
	max_content_bytes: usize,
	default_scheme: &CipherScheme,
) -> Result<UploadShape, ServerError> {
	match (req.has_raw_fields(), req.has_encrypted_fields()) {
		(true, true) => Err(ServerError::Validation(
			"send either content and passphrase, or ciphertext, iv, salt and checksum, not both"
				.to_string(),
		)),
		(false, false) => Err(ServerError::Validation(
			"content and passphrase, or ciphertext, iv, salt and checksum, are required".to_string(),
		)),
		(true, false) => {
			let (Some(content), Some(passphrase)) = (req.content, req.passphrase) else {
				return Err(ServerError::Validation(
					"content and passphrase are both required".to_string(),
				));
			};
			let content = Zeroizing::new(content);
			validate_passphrase(&passphrase)?;
			if content.len() > max_content_bytes {
				return Err(ServerError::Validation(format!(
					"content exceeds {max_content_bytes} bytes"
				)));
			}
			Ok(UploadShape::Raw {
				content,
				passphrase,
			})
		}
		(false, true) => {
			let (Some(ciphertext), Some(iv), Some(salt), Some(checksum)) =
				(req.ciphertext, req.iv, req.salt, req.checksum)
			else {
				return Err(ServerError::Validation(
					"ciphertext, iv, salt and checksum are all required".to_string(),
				));
			};
			if ciphertext.len() > max_encoded_ciphertext_len(max_content_bytes) {
				return Err(ServerError::Validation(format!(
					"ciphertext exceeds {max_content_bytes} bytes of content"
				)));
			}

			let payload = EncryptedPayload {
				ciphertext,
				iv,
				salt,
				checksum: checksum.to_ascii_lowercase(),
				scheme: req.scheme.unwrap_or_else(|| default_scheme.to_string()),
			};
			payload.validate_encoded()?;
			Ok(UploadShape::Encrypted(payload))
		}
	}
}

/// Base64 length of the largest acceptable ciphertext plus tag.
fn max_encoded_ciphertext_len(max_content_bytes: usize) -> usize {
	(max_content_bytes + TAG_SIZE).div_ceil(3) * 4
}
