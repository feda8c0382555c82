// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The stored, transport-encoded form of an encrypted env file.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::aead::{IV_SIZE, TAG_SIZE};
use crate::error::CipherError;
use crate::kdf::SALT_SIZE;

const CHECKSUM_HEX_LEN: usize = 64;

/// Ciphertext plus everything except the passphrase needed to open it.
///
/// Binary fields are standard base64. `checksum` is the hex SHA-256 of the
/// plaintext and does not depend on salt or iv.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
	pub ciphertext: String,
	pub iv: String,
	pub salt: String,
	pub checksum: String,
	/// Scheme identifier, e.g. `argon2id$m=19456,t=2,p=1$aes-256-gcm`.
	pub scheme: String,
}

impl EncryptedPayload {
	/// Whether `plaintext` hashes to this payload's checksum.
	pub fn matches_checksum(&self, plaintext: &str) -> bool {
		checksum(plaintext).eq_ignore_ascii_case(&self.checksum)
	}

	/// Structural checks for client-encrypted uploads. Says nothing about
	/// whether the payload will decrypt.
	pub fn validate_encoded(&self) -> Result<(), CipherError> {
		let iv = decode_field("iv", &self.iv)?;
		if iv.len() != IV_SIZE {
			return Err(CipherError::InvalidPayload(format!(
				"iv must decode to {IV_SIZE} bytes"
			)));
		}

		let salt = decode_field("salt", &self.salt)?;
		if salt.len() != SALT_SIZE {
			return Err(CipherError::InvalidPayload(format!(
				"salt must decode to {SALT_SIZE} bytes"
			)));
		}

		let ciphertext = decode_field("ciphertext", &self.ciphertext)?;
		if ciphertext.len() < TAG_SIZE {
			return Err(CipherError::InvalidPayload(
				"ciphertext is shorter than an authentication tag".to_string(),
			));
		}

		if self.checksum.len() != CHECKSUM_HEX_LEN
			|| !self.checksum.chars().all(|c| c.is_ascii_hexdigit())
		{
			return Err(CipherError::InvalidPayload(
				"checksum must be a hex SHA-256 digest".to_string(),
			));
		}

		self.scheme.parse::<crate::CipherScheme>()?;
		Ok(())
	}
}

/// Hex SHA-256 of the plaintext.
pub fn checksum(plaintext: &str) -> String {
	hex::encode(Sha256::digest(plaintext.as_bytes()))
}

pub(crate) fn encode(bytes: &[u8]) -> String {
	STANDARD.encode(bytes)
}

pub(crate) fn decode(value: &str) -> Option<Vec<u8>> {
	STANDARD.decode(value).ok()
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, CipherError> {
	decode(value).ok_or_else(|| CipherError::InvalidPayload(format!("{name} is not valid base64")))
}
