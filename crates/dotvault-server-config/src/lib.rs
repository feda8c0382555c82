// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the dotvault server.
//!
//! Values are layered from built-in defaults, an optional TOML file
//! (`/etc/dotvault/server.toml`, or the path in `DOTVAULT_SERVER_CONFIG`) and
//! `DOTVAULT_SERVER_*` environment variables, in increasing precedence.
//!
//! ```ignore
//! use dotvault_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod secret_env;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use secret_env::load_secret_env;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub cache: CacheConfig,
	pub rate_limit: RateLimitConfig,
	pub cipher: CipherConfig,
	pub request: RequestConfig,
	pub logging: LoggingConfig,
}

impl ServerConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	let toml = match std::env::var("DOTVAULT_SERVER_CONFIG") {
		Ok(path) if !path.is_empty() => TomlSource::new(path),
		_ => TomlSource::system(),
	};

	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(toml),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer into a validated configuration.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		cache: layer.cache.unwrap_or_default().finalize(),
		rate_limit: layer.rate_limit.unwrap_or_default().finalize(),
		cipher: layer.cipher.unwrap_or_default().finalize(),
		request: layer.request.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	if config.cipher.below_recommended() {
		warn!(
			memory_kib = config.cipher.memory_kib,
			iterations = config.cipher.iterations,
			"key derivation parameters are below the recommended floor"
		);
	}

	let cache_backend = match config.cache.backend {
		CacheBackend::Memory => "memory",
		CacheBackend::Redis { .. } => "redis",
	};

	info!(
		addr = %config.socket_addr(),
		database = %config.database.url,
		cache_backend,
		cache_ttl_secs = config.cache.ttl_secs,
		rate_limit_window_secs = config.rate_limit.window_secs,
		kdf = %config.cipher.kdf,
		aead = %config.cipher.aead,
		"Server configuration loaded"
	);

	Ok(config)
}

fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	let cipher = &config.cipher;
	if !KNOWN_KDFS.contains(&cipher.kdf.as_str()) {
		return Err(ConfigError::InvalidValue {
			key: "cipher.kdf".to_string(),
			message: format!("unknown key derivation function '{}'", cipher.kdf),
		});
	}
	if !KNOWN_AEADS.contains(&cipher.aead.as_str()) {
		return Err(ConfigError::InvalidValue {
			key: "cipher.aead".to_string(),
			message: format!("unknown cipher '{}'", cipher.aead),
		});
	}
	if cipher.parallelism == 0 || cipher.iterations == 0 {
		return Err(ConfigError::Validation(
			"cipher.iterations and cipher.parallelism must be at least 1".to_string(),
		));
	}
	if cipher.memory_kib < 8 * cipher.parallelism {
		return Err(ConfigError::Validation(format!(
			"cipher.memory_kib must be at least {} for parallelism {}",
			8 * cipher.parallelism,
			cipher.parallelism
		)));
	}

	let limits = &config.rate_limit;
	if limits.window_secs == 0 {
		return Err(ConfigError::Validation(
			"rate_limit.window_secs must be positive".to_string(),
		));
	}
	let ceilings = [
		limits.upload_pre_auth,
		limits.read_pre_auth,
		limits.decrypt_pre_auth,
		limits.health_pre_auth,
		limits.post_auth,
	];
	if ceilings.contains(&0) {
		return Err(ConfigError::Validation(
			"rate limit ceilings must be at least 1".to_string(),
		));
	}
	if limits.sweep_interval_secs == 0 {
		return Err(ConfigError::Validation(
			"rate_limit.sweep_interval_secs must be positive".to_string(),
		));
	}

	if config.request.timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"request.timeout_secs must be positive".to_string(),
		));
	}
	if config.request.append_max_attempts == 0 {
		return Err(ConfigError::Validation(
			"request.append_max_attempts must be at least 1".to_string(),
		));
	}
	if config.cache.ttl_secs == 0 {
		return Err(ConfigError::Validation(
			"cache.ttl_secs must be positive".to_string(),
		));
	}
	if let CacheBackend::Redis { url } = &config.cache.backend {
		let url = url.expose();
		if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
			return Err(ConfigError::UnsupportedCacheUrl);
		}
	}

	Ok(())
}
