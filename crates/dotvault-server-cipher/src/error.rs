// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CipherError {
	#[error("invalid cipher scheme: {0}")]
	InvalidScheme(String),

	#[error("invalid payload: {0}")]
	InvalidPayload(String),

	#[error("encryption failed: {0}")]
	Encryption(String),

	/// Wrong passphrase, tampered ciphertext and malformed fields all land here.
	#[error("decryption failed")]
	Decryption,
}

pub type CipherResult<T> = Result<T, CipherError>;
