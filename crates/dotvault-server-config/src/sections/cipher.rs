// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Encryption scheme selection for newly written payloads.
//!
//! Stored payloads record the scheme they were written with, so changing
//! these values only affects future uploads.

use serde::Deserialize;

pub const KNOWN_KDFS: &[&str] = &["argon2id", "argon2i", "argon2d"];
pub const KNOWN_AEADS: &[&str] = &["aes-256-gcm", "chacha20-poly1305"];

/// OWASP floor for argon2id.
pub const RECOMMENDED_MEMORY_KIB: u32 = 19_456;
pub const RECOMMENDED_ITERATIONS: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct CipherConfig {
	pub kdf: String,
	pub memory_kib: u32,
	pub iterations: u32,
	pub parallelism: u32,
	pub aead: String,
}

impl CipherConfig {
	pub fn below_recommended(&self) -> bool {
		self.memory_kib < RECOMMENDED_MEMORY_KIB || self.iterations < RECOMMENDED_ITERATIONS
	}
}

impl Default for CipherConfig {
	fn default() -> Self {
		Self {
			kdf: "argon2id".to_string(),
			memory_kib: RECOMMENDED_MEMORY_KIB,
			iterations: RECOMMENDED_ITERATIONS,
			parallelism: 1,
			aead: "aes-256-gcm".to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CipherConfigLayer {
	#[serde(default)]
	pub kdf: Option<String>,
	#[serde(default)]
	pub memory_kib: Option<u32>,
	#[serde(default)]
	pub iterations: Option<u32>,
	#[serde(default)]
	pub parallelism: Option<u32>,
	#[serde(default)]
	pub aead: Option<String>,
}

impl CipherConfigLayer {
	pub fn merge(&mut self, other: CipherConfigLayer) {
		if other.kdf.is_some() {
			self.kdf = other.kdf;
		}
		if other.memory_kib.is_some() {
			self.memory_kib = other.memory_kib;
		}
		if other.iterations.is_some() {
			self.iterations = other.iterations;
		}
		if other.parallelism.is_some() {
			self.parallelism = other.parallelism;
		}
		if other.aead.is_some() {
			self.aead = other.aead;
		}
	}

	pub fn finalize(self) -> CipherConfig {
		let defaults = CipherConfig::default();
		CipherConfig {
			kdf: self
				.kdf
				.map(|k| k.to_ascii_lowercase())
				.unwrap_or(defaults.kdf),
			memory_kib: self.memory_kib.unwrap_or(defaults.memory_kib),
			iterations: self.iterations.unwrap_or(defaults.iterations),
			parallelism: self.parallelism.unwrap_or(defaults.parallelism),
			aead: self
				.aead
				.map(|a| a.to_ascii_lowercase())
				.unwrap_or(defaults.aead),
		}
	}
}
