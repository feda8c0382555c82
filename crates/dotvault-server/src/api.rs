// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
	extract::DefaultBodyLimit,
	routing::{get, post},
	Json, Router,
};
use dotvault_server_cache::{
	CachedVersionStore, EnvFileCache, KvBackend, MemoryKv, RedisKv,
};
use dotvault_server_cipher::{Cipher, CipherScheme};
use dotvault_server_config::{CacheBackend, RequestConfig, ServerConfig};
use dotvault_server_db::{
	ApiKeyRepository, ApiKeyStore, EnvFileRepository, ProjectRepository, ProjectStore, SqlitePool,
};
use dotvault_server_ratelimit::{
	MemoryRateLimitStore, RateLimitRules, RateLimitStore, RateLimiter, RedisRateLimitStore,
};
use utoipa::OpenApi;

use crate::{api_docs::ApiDoc, error::ServerError, metrics::ServerMetrics, routes};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub cipher: Cipher,
	pub env_files: CachedVersionStore,
	pub projects: Arc<dyn ProjectStore>,
	pub api_keys: Arc<dyn ApiKeyStore>,
	pub limiter: RateLimiter,
	pub pool: SqlitePool,
	pub metrics: Arc<ServerMetrics>,
	pub request: RequestConfig,
	pub db_ping_timeout: Duration,
	pub trust_forwarded_headers: bool,
}

/// Build state with the cache and rate limit backends named in `config`.
pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> Result<AppState, ServerError> {
	let cache_backend: Arc<dyn KvBackend> = match &config.cache.backend {
		CacheBackend::Memory => Arc::new(MemoryKv::new()),
		CacheBackend::Redis { url } => Arc::new(
			RedisKv::new(
				url.expose(),
				config.cache.namespace.clone(),
				config.cache.pool_size,
			)
			.map_err(|e| ServerError::DependencyUnavailable(format!("cache: {e}")))?,
		),
	};

	let rate_store: Arc<dyn RateLimitStore> = match &config.rate_limit.redis_url {
		None => Arc::new(MemoryRateLimitStore::new(
			config.rate_limit.max_tracked_identities,
		)),
		Some(url) => Arc::new(
			RedisRateLimitStore::new(url.expose(), config.cache.pool_size)
				.map_err(|e| ServerError::DependencyUnavailable(format!("rate limit store: {e}")))?,
		),
	};

	create_app_state_with_backends(pool, config, cache_backend, rate_store)
}

/// Build state around caller-supplied cache and rate limit backends.
pub fn create_app_state_with_backends(
	pool: SqlitePool,
	config: &ServerConfig,
	cache_backend: Arc<dyn KvBackend>,
	rate_store: Arc<dyn RateLimitStore>,
) -> Result<AppState, ServerError> {
	let scheme = CipherScheme::from_parts(
		&config.cipher.kdf,
		config.cipher.memory_kib,
		config.cipher.iterations,
		config.cipher.parallelism,
		&config.cipher.aead,
	)
	.map_err(|e| ServerError::Internal(format!("cipher configuration: {e}")))?;

	let versions = Arc::new(
		EnvFileRepository::new(pool.clone()).with_max_attempts(config.request.append_max_attempts),
	);
	let cache = EnvFileCache::new(
		cache_backend,
		config.cache.ttl(),
		config.cache.op_timeout(),
	);
	let metrics = ServerMetrics::new()
		.map_err(|e| ServerError::Internal(format!("metrics registry: {e}")))?;

	tracing::info!(
		scheme = %scheme,
		cache = cache.backend_name(),
		rate_limit_store = rate_store.name(),
		"application state ready"
	);

	Ok(AppState {
		cipher: Cipher::new(scheme),
		env_files: CachedVersionStore::new(versions, cache),
		projects: Arc::new(ProjectRepository::new(pool.clone())),
		api_keys: Arc::new(ApiKeyRepository::new(pool.clone())),
		limiter: RateLimiter::new(rate_store, RateLimitRules::from_config(&config.rate_limit)),
		pool,
		metrics: Arc::new(metrics),
		request: config.request.clone(),
		db_ping_timeout: config.database.ping_timeout(),
		trust_forwarded_headers: config.http.trust_forwarded_headers,
	})
}

pub fn create_router(state: AppState) -> Router {
	let body_limit = state.request.body_limit();

	Router::new()
		.route(
			"/api/v1/env-files",
			post(routes::env_files::upload_env_file).get(routes::env_files::get_env_file),
		)
		.route(
			"/api/v1/env-files/versions",
			get(routes::env_files::list_env_file_versions),
		)
		.route(
			"/api/v1/env-files/decrypt",
			post(routes::env_files::decrypt_env_file),
		)
		.route("/health", get(routes::health::health_check))
		.route("/metrics", get(routes::health::prometheus_metrics))
		.route("/api/openapi.json", get(openapi_json))
		.layer(DefaultBodyLimit::max(body_limit))
		.with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
	Json(ApiDoc::openapi())
}

/// Bound `fut` by the request timeout. Only wrap work that leaves no trace
/// when abandoned.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ServerError>
where
	F: Future<Output = Result<T, ServerError>>,
{
	match tokio::time::timeout(limit, fut).await {
		Ok(result) => result,
		Err(_) => Err(ServerError::Timeout),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn slow_work_times_out() {
		let result: Result<(), ServerError> = with_timeout(Duration::from_secs(1), async {
			tokio::time::sleep(Duration::from_secs(5)).await;
			Ok(())
		})
		.await;
		assert!(matches!(result, Err(ServerError::Timeout)));
	}

	#[tokio::test(start_paused = true)]
	async fn fast_work_passes_through() {
		let result = with_timeout(Duration::from_secs(1), async { Ok::<_, ServerError>(7) }).await;
		assert_eq!(result.unwrap(), 7);

		let result: Result<(), ServerError> =
			with_timeout(Duration::from_secs(1), async { Err(ServerError::NotFound) }).await;
		assert!(matches!(result, Err(ServerError::NotFound)));
	}
}
