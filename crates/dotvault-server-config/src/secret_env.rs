// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `VAR` / `VAR_FILE` secret lookup.
//!
//! When `{var}_FILE` is set its file contents win (one trailing newline is
//! stripped), otherwise `{var}` is used directly. Docker and Kubernetes
//! secret mounts both work this way.

use std::path::PathBuf;
use std::{env, fs};

use dotvault_common_secret::SecretString;

use crate::error::ConfigError;

pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, ConfigError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(ConfigError::Secret(format!("{file_var} is set but empty")));
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
			path: path.clone(),
			source: e,
		})?;

		let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(value)));
	}

	Ok(env::var(var)
		.ok()
		.filter(|v| !v.is_empty())
		.map(SecretString::new))
}
