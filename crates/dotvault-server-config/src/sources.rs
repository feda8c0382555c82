// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file and the environment.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::secret_env::load_secret_env;
use crate::sections::{
	CacheConfigLayer, CipherConfigLayer, DatabaseConfigLayer, HttpConfigLayer, LogFormat,
	LoggingConfigLayer, RateLimitConfigLayer, RequestConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file source. A missing file contributes nothing.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/dotvault/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: DOTVAULT_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(load_database_from_env()?),
			cache: Some(load_cache_from_env()?),
			rate_limit: Some(load_rate_limit_from_env()?),
			cipher: Some(load_cipher_from_env()?),
			request: Some(load_request_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	env_parse(name, "u16")
}

fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
	env_parse(name, "u32")
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	env_parse(name, "u64")
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	env_parse(name, "usize")
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("DOTVAULT_SERVER_HOST"),
		port: env_u16("DOTVAULT_SERVER_PORT")?,
		trust_forwarded_headers: env_bool("DOTVAULT_SERVER_TRUST_FORWARDED_HEADERS"),
	})
}

fn load_database_from_env() -> Result<DatabaseConfigLayer, ConfigError> {
	Ok(DatabaseConfigLayer {
		url: env_var("DOTVAULT_SERVER_DATABASE_URL"),
		max_connections: env_u32("DOTVAULT_SERVER_DATABASE_MAX_CONNECTIONS")?,
		ping_timeout_ms: env_u64("DOTVAULT_SERVER_DATABASE_PING_TIMEOUT_MS")?,
	})
}

fn load_cache_from_env() -> Result<CacheConfigLayer, ConfigError> {
	Ok(CacheConfigLayer {
		url: load_secret_env("DOTVAULT_SERVER_CACHE_URL")?,
		ttl_secs: env_u64("DOTVAULT_SERVER_CACHE_TTL_SECS")?,
		op_timeout_ms: env_u64("DOTVAULT_SERVER_CACHE_OP_TIMEOUT_MS")?,
		pool_size: env_usize("DOTVAULT_SERVER_CACHE_POOL_SIZE")?,
		namespace: env_var("DOTVAULT_SERVER_CACHE_NAMESPACE"),
	})
}

fn load_rate_limit_from_env() -> Result<RateLimitConfigLayer, ConfigError> {
	Ok(RateLimitConfigLayer {
		redis_url: load_secret_env("DOTVAULT_SERVER_RATE_LIMIT_REDIS_URL")?,
		window_secs: env_u64("DOTVAULT_SERVER_RATE_LIMIT_WINDOW_SECS")?,
		upload_pre_auth: env_u32("DOTVAULT_SERVER_RATE_LIMIT_UPLOAD_PRE_AUTH")?,
		read_pre_auth: env_u32("DOTVAULT_SERVER_RATE_LIMIT_READ_PRE_AUTH")?,
		decrypt_pre_auth: env_u32("DOTVAULT_SERVER_RATE_LIMIT_DECRYPT_PRE_AUTH")?,
		health_pre_auth: env_u32("DOTVAULT_SERVER_RATE_LIMIT_HEALTH_PRE_AUTH")?,
		post_auth: env_u32("DOTVAULT_SERVER_RATE_LIMIT_POST_AUTH")?,
		sweep_interval_secs: env_u64("DOTVAULT_SERVER_RATE_LIMIT_SWEEP_INTERVAL_SECS")?,
		max_tracked_identities: env_usize("DOTVAULT_SERVER_RATE_LIMIT_MAX_TRACKED_IDENTITIES")?,
	})
}

fn load_cipher_from_env() -> Result<CipherConfigLayer, ConfigError> {
	Ok(CipherConfigLayer {
		kdf: env_var("DOTVAULT_SERVER_CIPHER_KDF"),
		memory_kib: env_u32("DOTVAULT_SERVER_CIPHER_MEMORY_KIB")?,
		iterations: env_u32("DOTVAULT_SERVER_CIPHER_ITERATIONS")?,
		parallelism: env_u32("DOTVAULT_SERVER_CIPHER_PARALLELISM")?,
		aead: env_var("DOTVAULT_SERVER_CIPHER_AEAD"),
	})
}

fn load_request_from_env() -> Result<RequestConfigLayer, ConfigError> {
	Ok(RequestConfigLayer {
		timeout_secs: env_u64("DOTVAULT_SERVER_REQUEST_TIMEOUT_SECS")?,
		max_content_bytes: env_usize("DOTVAULT_SERVER_MAX_CONTENT_BYTES")?,
		append_max_attempts: env_u32("DOTVAULT_SERVER_APPEND_MAX_ATTEMPTS")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = env_var("DOTVAULT_SERVER_LOG_FORMAT")
		.map(|v| {
			v.parse::<LogFormat>().map_err(|message| ConfigError::InvalidValue {
				key: "DOTVAULT_SERVER_LOG_FORMAT".to_string(),
				message,
			})
		})
		.transpose()?;

	Ok(LoggingConfigLayer {
		level: env_var("DOTVAULT_SERVER_LOG_LEVEL"),
		format,
	})
}
