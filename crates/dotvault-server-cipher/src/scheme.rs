// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheme identifiers recorded alongside every stored payload.
//!
//! A scheme names the key derivation function, its cost parameters and the
//! AEAD, e.g. `argon2id$m=19456,t=2,p=1$aes-256-gcm`. Decryption always uses
//! the scheme stored with the payload, never the currently configured one.

use std::fmt;
use std::str::FromStr;

use crate::error::CipherError;

/// Argon2 lower bounds on cost parameters.
const MIN_ITERATIONS: u32 = 1;
const MIN_PARALLELISM: u32 = 1;
const MIN_MEMORY_KIB_PER_LANE: u32 = 8;
/// Ceilings on the work a stored scheme may demand.
const MAX_ITERATIONS: u32 = 16;
const MAX_PARALLELISM: u32 = 16;
const MAX_MEMORY_KIB: u32 = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfAlgorithm {
	Argon2id,
	Argon2i,
	Argon2d,
}

impl KdfAlgorithm {
	pub fn as_str(&self) -> &'static str {
		match self {
			KdfAlgorithm::Argon2id => "argon2id",
			KdfAlgorithm::Argon2i => "argon2i",
			KdfAlgorithm::Argon2d => "argon2d",
		}
	}
}

impl FromStr for KdfAlgorithm {
	type Err = CipherError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"argon2id" => Ok(KdfAlgorithm::Argon2id),
			"argon2i" => Ok(KdfAlgorithm::Argon2i),
			"argon2d" => Ok(KdfAlgorithm::Argon2d),
			other => Err(CipherError::InvalidScheme(format!("unknown kdf '{other}'"))),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
	Aes256Gcm,
	ChaCha20Poly1305,
}

impl AeadAlgorithm {
	pub fn as_str(&self) -> &'static str {
		match self {
			AeadAlgorithm::Aes256Gcm => "aes-256-gcm",
			AeadAlgorithm::ChaCha20Poly1305 => "chacha20-poly1305",
		}
	}
}

impl FromStr for AeadAlgorithm {
	type Err = CipherError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"aes-256-gcm" => Ok(AeadAlgorithm::Aes256Gcm),
			"chacha20-poly1305" => Ok(AeadAlgorithm::ChaCha20Poly1305),
			other => Err(CipherError::InvalidScheme(format!(
				"unknown cipher '{other}'"
			))),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
	pub memory_kib: u32,
	pub iterations: u32,
	pub parallelism: u32,
}

impl KdfParams {
	pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, CipherError> {
		if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&iterations) {
			return Err(CipherError::InvalidScheme(format!(
				"iterations must be between {MIN_ITERATIONS} and {MAX_ITERATIONS}"
			)));
		}
		if !(MIN_PARALLELISM..=MAX_PARALLELISM).contains(&parallelism) {
			return Err(CipherError::InvalidScheme(format!(
				"parallelism must be between {MIN_PARALLELISM} and {MAX_PARALLELISM}"
			)));
		}
		if memory_kib < MIN_MEMORY_KIB_PER_LANE * parallelism || memory_kib > MAX_MEMORY_KIB {
			return Err(CipherError::InvalidScheme(format!(
				"memory_kib {memory_kib} out of range for parallelism {parallelism}"
			)));
		}

		Ok(Self {
			memory_kib,
			iterations,
			parallelism,
		})
	}
}

impl Default for KdfParams {
	fn default() -> Self {
		Self {
			memory_kib: 19_456,
			iterations: 2,
			parallelism: 1,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherScheme {
	pub kdf: KdfAlgorithm,
	pub params: KdfParams,
	pub aead: AeadAlgorithm,
}

impl CipherScheme {
	pub fn new(kdf: KdfAlgorithm, params: KdfParams, aead: AeadAlgorithm) -> Self {
		Self { kdf, params, aead }
	}

	/// Build a scheme from configuration values.
	pub fn from_parts(
		kdf: &str,
		memory_kib: u32,
		iterations: u32,
		parallelism: u32,
		aead: &str,
	) -> Result<Self, CipherError> {
		Ok(Self {
			kdf: kdf.parse()?,
			params: KdfParams::new(memory_kib, iterations, parallelism)?,
			aead: aead.parse()?,
		})
	}
}

impl Default for CipherScheme {
	fn default() -> Self {
		Self {
			kdf: KdfAlgorithm::Argon2id,
			params: KdfParams::default(),
			aead: AeadAlgorithm::Aes256Gcm,
		}
	}
}

impl fmt::Display for CipherScheme {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}$m={},t={},p={}${}",
			self.kdf.as_str(),
			self.params.memory_kib,
			self.params.iterations,
			self.params.parallelism,
			self.aead.as_str()
		)
	}
}

impl FromStr for CipherScheme {
	type Err = CipherError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut parts = s.split('$');
		let (Some(kdf), Some(params), Some(aead), None) =
			(parts.next(), parts.next(), parts.next(), parts.next())
		else {
			return Err(CipherError::InvalidScheme(format!(
				"expected '<kdf>$<params>$<aead>', got '{s}'"
			)));
		};

		let mut memory_kib = None;
		let mut iterations = None;
		let mut parallelism = None;
		for pair in params.split(',') {
			let (key, value) = pair
				.split_once('=')
				.ok_or_else(|| CipherError::InvalidScheme(format!("bad parameter '{pair}'")))?;
			let value: u32 = value
				.parse()
				.map_err(|_| CipherError::InvalidScheme(format!("bad parameter '{pair}'")))?;
			match key {
				"m" => memory_kib = Some(value),
				"t" => iterations = Some(value),
				"p" => parallelism = Some(value),
				other => {
					return Err(CipherError::InvalidScheme(format!(
						"unknown parameter '{other}'"
					)))
				}
			}
		}

		let (Some(m), Some(t), Some(p)) = (memory_kib, iterations, parallelism) else {
			return Err(CipherError::InvalidScheme(
				"scheme must specify m, t and p".to_string(),
			));
		};

		Self::from_parts(kdf, m, t, p, aead)
	}
}
