// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Passphrase key derivation.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::CipherError;
use crate::scheme::{CipherScheme, KdfAlgorithm};

pub const KEY_SIZE: usize = 32;
pub const SALT_SIZE: usize = 16;

pub fn generate_salt() -> [u8; SALT_SIZE] {
	let mut salt = [0u8; SALT_SIZE];
	rand::rngs::OsRng.fill_bytes(&mut salt);
	salt
}

fn argon2_instance(scheme: &CipherScheme) -> Result<Argon2<'static>, CipherError> {
	let algorithm = match scheme.kdf {
		KdfAlgorithm::Argon2id => Algorithm::Argon2id,
		KdfAlgorithm::Argon2i => Algorithm::Argon2i,
		KdfAlgorithm::Argon2d => Algorithm::Argon2d,
	};
	let params = Params::new(
		scheme.params.memory_kib,
		scheme.params.iterations,
		scheme.params.parallelism,
		Some(KEY_SIZE),
	)
	.map_err(|e| CipherError::InvalidScheme(e.to_string()))?;

	Ok(Argon2::new(algorithm, Version::V0x13, params))
}

/// Stretch `passphrase` into a 256-bit key. This is deliberately slow.
pub fn derive_key(
	scheme: &CipherScheme,
	passphrase: &[u8],
	salt: &[u8],
) -> Result<Zeroizing<[u8; KEY_SIZE]>, CipherError> {
	let argon2 = argon2_instance(scheme)?;
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	argon2
		.hash_password_into(passphrase, salt, key.as_mut())
		.map_err(|e| CipherError::Encryption(format!("key derivation failed: {e}")))?;
	Ok(key)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scheme::{AeadAlgorithm, KdfParams};

	fn cheap_scheme(kdf: KdfAlgorithm) -> CipherScheme {
		CipherScheme::new(
			kdf,
			KdfParams::new(1024, 1, 1).unwrap(),
			AeadAlgorithm::Aes256Gcm,
		)
	}

	#[test]
	fn salts_are_random() {
		assert_ne!(generate_salt(), generate_salt());
	}

	#[test]
	fn derivation_is_deterministic_for_same_inputs() {
		let scheme = cheap_scheme(KdfAlgorithm::Argon2id);
		let salt = generate_salt();
		let a = derive_key(&scheme, b"correct-horse", &salt).unwrap();
		let b = derive_key(&scheme, b"correct-horse", &salt).unwrap();
		assert_eq!(a.as_slice(), b.as_slice());
	}

	#[test]
	fn salt_and_passphrase_change_the_key() {
		let scheme = cheap_scheme(KdfAlgorithm::Argon2id);
		let salt = generate_salt();
		let base = derive_key(&scheme, b"correct-horse", &salt).unwrap();
		let other_salt = derive_key(&scheme, b"correct-horse", &generate_salt()).unwrap();
		let other_pass = derive_key(&scheme, b"battery-staple", &salt).unwrap();

		assert_ne!(base.as_slice(), other_salt.as_slice());
		assert_ne!(base.as_slice(), other_pass.as_slice());
	}

	#[test]
	fn algorithm_variants_produce_distinct_keys() {
		let salt = generate_salt();
		let id = derive_key(&cheap_scheme(KdfAlgorithm::Argon2id), b"pw", &salt).unwrap();
		let i = derive_key(&cheap_scheme(KdfAlgorithm::Argon2i), b"pw", &salt).unwrap();
		let d = derive_key(&cheap_scheme(KdfAlgorithm::Argon2d), b"pw", &salt).unwrap();
		assert_ne!(id.as_slice(), i.as_slice());
		assert_ne!(id.as_slice(), d.as_slice());
	}

	#[test]
	fn empty_passphrase_still_derives() {
		let scheme = cheap_scheme(KdfAlgorithm::Argon2id);
		assert!(derive_key(&scheme, b"", &generate_salt()).is_ok());
	}
}
