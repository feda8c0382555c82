// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Passphrase-based authenticated encryption for env files.
//!
//! A key is stretched from the passphrase and a random 16-byte salt with
//! Argon2, then the plaintext is sealed with AES-256-GCM or
//! ChaCha20-Poly1305 under a random 12-byte iv. The resulting
//! [`EncryptedPayload`] records its [`CipherScheme`] so that parameters can
//! be raised without stranding older versions.

mod aead;
mod cipher;
mod error;
mod kdf;
mod payload;
mod scheme;

pub use aead::{IV_SIZE, TAG_SIZE};
pub use cipher::Cipher;
pub use error::{CipherError, CipherResult};
pub use kdf::{KEY_SIZE, SALT_SIZE};
pub use payload::{checksum, EncryptedPayload};
pub use scheme::{AeadAlgorithm, CipherScheme, KdfAlgorithm, KdfParams};
