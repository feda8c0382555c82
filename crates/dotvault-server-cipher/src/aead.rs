// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authenticated encryption over a derived key.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::CipherError;
use crate::kdf::KEY_SIZE;
use crate::scheme::AeadAlgorithm;

/// Both supported ciphers take a 96-bit nonce.
pub const IV_SIZE: usize = 12;
/// Both supported ciphers append a 128-bit tag.
pub const TAG_SIZE: usize = 16;

pub fn generate_iv() -> [u8; IV_SIZE] {
	let mut iv = [0u8; IV_SIZE];
	rand::rngs::OsRng.fill_bytes(&mut iv);
	iv
}

pub fn seal(
	aead: AeadAlgorithm,
	key: &[u8; KEY_SIZE],
	iv: &[u8; IV_SIZE],
	plaintext: &[u8],
) -> Result<Vec<u8>, CipherError> {
	let result = match aead {
		AeadAlgorithm::Aes256Gcm => {
			Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key))
				.encrypt(aes_gcm::Nonce::from_slice(iv), plaintext)
		}
		AeadAlgorithm::ChaCha20Poly1305 => {
			ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key))
				.encrypt(chacha20poly1305::Nonce::from_slice(iv), plaintext)
		}
	};

	result.map_err(|e| CipherError::Encryption(format!("{} seal failed: {e}", aead.as_str())))
}

/// Decrypt and verify. Any failure is reported as [`CipherError::Decryption`].
pub fn open(
	aead: AeadAlgorithm,
	key: &[u8; KEY_SIZE],
	iv: &[u8; IV_SIZE],
	ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
	let result = match aead {
		AeadAlgorithm::Aes256Gcm => {
			Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key))
				.decrypt(aes_gcm::Nonce::from_slice(iv), ciphertext)
		}
		AeadAlgorithm::ChaCha20Poly1305 => {
			ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key))
				.decrypt(chacha20poly1305::Nonce::from_slice(iv), ciphertext)
		}
	};

	result
		.map(Zeroizing::new)
		.map_err(|_| CipherError::Decryption)
}
