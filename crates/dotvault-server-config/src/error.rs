// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{key}: {message}")]
	InvalidValue { key: String, message: String },

	#[error("could not parse {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("could not read {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The cache URL is neither `memory` nor a redis URL. The URL itself is
	/// not included since it may carry credentials.
	#[error("cache.url must be 'memory', redis:// or rediss://")]
	UnsupportedCacheUrl,

	#[error("invalid configuration: {0}")]
	Validation(String),

	#[error("secret {0}")]
	Secret(String),
}
