// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use dotvault_common_secret::SecretString;
use zeroize::Zeroizing;

use crate::aead::{self, IV_SIZE};
use crate::error::{CipherError, CipherResult};
use crate::kdf::{self, SALT_SIZE};
use crate::payload::{self, EncryptedPayload};
use crate::scheme::CipherScheme;

/// Encrypts under the configured scheme, decrypts under whatever scheme the
/// payload records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cipher {
	scheme: CipherScheme,
}

impl Cipher {
	pub fn new(scheme: CipherScheme) -> Self {
		Self { scheme }
	}

	pub fn scheme(&self) -> &CipherScheme {
		&self.scheme
	}

	/// Encrypt `plaintext` with a key stretched from `passphrase`.
	///
	/// Salt and iv are fresh random values on every call.
	#[tracing::instrument(skip_all, fields(scheme = %self.scheme, len = plaintext.len()))]
	pub fn encrypt(
		&self,
		plaintext: &str,
		passphrase: &SecretString,
	) -> CipherResult<EncryptedPayload> {
		let salt = kdf::generate_salt();
		let iv = aead::generate_iv();
		let key = kdf::derive_key(&self.scheme, passphrase.expose().as_bytes(), &salt)?;
		let ciphertext = aead::seal(self.scheme.aead, &key, &iv, plaintext.as_bytes())?;

		tracing::debug!("payload encrypted");
		Ok(EncryptedPayload {
			ciphertext: payload::encode(&ciphertext),
			iv: payload::encode(&iv),
			salt: payload::encode(&salt),
			checksum: payload::checksum(plaintext),
			scheme: self.scheme.to_string(),
		})
	}

	/// Decrypt a payload.
	///
	/// Every failure is [`CipherError::Decryption`]. Malformed fields still
	/// pay for a key derivation so they cannot be told apart from a wrong
	/// passphrase by timing.
	#[tracing::instrument(skip_all)]
	pub fn decrypt(
		&self,
		encrypted: &EncryptedPayload,
		passphrase: &SecretString,
	) -> CipherResult<Zeroizing<String>> {
		let scheme = encrypted.scheme.parse::<CipherScheme>().ok();
		let salt = payload::decode(&encrypted.salt).filter(|s| s.len() == SALT_SIZE);
		let iv = payload::decode(&encrypted.iv)
			.and_then(|iv| <[u8; IV_SIZE]>::try_from(iv.as_slice()).ok());
		let ciphertext = payload::decode(&encrypted.ciphertext);

		let derive_scheme = scheme.unwrap_or(self.scheme);
		let derive_salt: &[u8] = salt.as_deref().unwrap_or(&[0u8; SALT_SIZE]);
		let key = kdf::derive_key(&derive_scheme, passphrase.expose().as_bytes(), derive_salt)
			.map_err(|_| CipherError::Decryption)?;

		let (Some(scheme), Some(_), Some(iv), Some(ciphertext)) = (scheme, salt, iv, ciphertext)
		else {
			tracing::debug!("malformed payload");
			return Err(CipherError::Decryption);
		};

		let plaintext = aead::open(scheme.aead, &key, &iv, &ciphertext)?;
		let text = std::str::from_utf8(&plaintext).map_err(|_| CipherError::Decryption)?;
		Ok(Zeroizing::new(text.to_string()))
	}
}
