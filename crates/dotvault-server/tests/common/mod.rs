// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
	body::Body,
	http::{HeaderMap, Method, Request, StatusCode},
	Router,
};
use dotvault_server::{
	api::{create_app_state, create_app_state_with_backends, create_router, AppState},
	auth_middleware::{generate_token, hash_token},
	ServerConfig,
};
use dotvault_server_cache::KvBackend;
use dotvault_server_cipher::{AeadAlgorithm, Cipher, CipherScheme, KdfAlgorithm, KdfParams};
use dotvault_server_db::{ApiKeyId, ApiKeyRepository, OwnerId, ProjectId, ProjectRepository, SqlitePool};
use dotvault_server_ratelimit::MemoryRateLimitStore;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const ENDPOINT: &str = "/api/v1/env-files";

/// Argon2 parameters cheap enough for debug builds.
pub fn test_config() -> ServerConfig {
	let mut config = ServerConfig::default();
	config.cipher.memory_kib = 1024;
	config.cipher.iterations = 1;
	config.cipher.parallelism = 1;
	config.http.trust_forwarded_headers = true;
	config
}

pub fn test_cipher() -> Cipher {
	Cipher::new(CipherScheme::new(
		KdfAlgorithm::Argon2id,
		KdfParams::new(1024, 1, 1).unwrap(),
		AeadAlgorithm::Aes256Gcm,
	))
}

pub struct TestResponse {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Value,
	pub text: String,
}

pub struct TestApp {
	pub router: Router,
	pub state: AppState,
	pub pool: SqlitePool,
	pub owner: OwnerId,
	pub project_id: ProjectId,
	pub token: String,
	pub api_key_id: ApiKeyId,
	_temp_dir: TempDir,
}

impl TestApp {
	pub async fn new() -> Self {
		Self::with_config(test_config()).await
	}

	pub async fn with_config(config: ServerConfig) -> Self {
		let (temp_dir, pool) = open_pool(&config).await;
		let state = create_app_state(pool.clone(), &config).unwrap();
		Self::finish(temp_dir, pool, state).await
	}

	/// App whose env file cache sits on `cache`.
	pub async fn with_cache(config: ServerConfig, cache: Arc<dyn KvBackend>) -> Self {
		let (temp_dir, pool) = open_pool(&config).await;
		let rate_store = Arc::new(MemoryRateLimitStore::new(
			config.rate_limit.max_tracked_identities,
		));
		let state = create_app_state_with_backends(pool.clone(), &config, cache, rate_store).unwrap();
		Self::finish(temp_dir, pool, state).await
	}

	async fn finish(temp_dir: TempDir, pool: SqlitePool, state: AppState) -> Self {
		let owner = OwnerId::generate();
		let project_id = create_project(&pool, &owner).await;
		let (api_key_id, token) = create_api_key(&pool, &owner).await;
		let router = create_router(state.clone());

		Self {
			router,
			state,
			pool,
			owner,
			project_id,
			token,
			api_key_id,
			_temp_dir: temp_dir,
		}
	}

	pub async fn request(
		&self,
		method: Method,
		uri: &str,
		headers: &[(&str, &str)],
		body: Option<Value>,
	) -> TestResponse {
		let mut builder = Request::builder().method(method).uri(uri);
		for (name, value) in headers {
			builder = builder.header(*name, *value);
		}
		let request = match body {
			Some(body) => builder
				.header("content-type", "application/json")
				.body(Body::from(body.to_string()))
				.unwrap(),
			None => builder.body(Body::empty()).unwrap(),
		};

		let response = self.router.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let headers = response.headers().clone();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let text = String::from_utf8_lossy(&bytes).to_string();
		let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

		TestResponse {
			status,
			headers,
			body,
			text,
		}
	}

	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.token)
	}

	pub async fn upload(&self, body: Value) -> TestResponse {
		let auth = self.bearer();
		self.request(Method::POST, ENDPOINT, &[("authorization", &auth)], Some(body))
			.await
	}

	pub async fn upload_raw(&self, environment: &str, content: &str, passphrase: &str) -> TestResponse {
		self.upload(json!({
			"projectId": self.project_id.to_string(),
			"environment": environment,
			"content": content,
			"passphrase": passphrase,
		}))
		.await
	}

	pub async fn retrieve(&self, environment: &str) -> TestResponse {
		let uri = format!(
			"{ENDPOINT}?projectId={}&environment={environment}",
			self.project_id
		);
		self.get_authed(&uri).await
	}

	pub async fn get_authed(&self, uri: &str) -> TestResponse {
		let auth = self.bearer();
		self.request(Method::GET, uri, &[("authorization", &auth)], None)
			.await
	}
}

async fn open_pool(config: &ServerConfig) -> (TempDir, SqlitePool) {
	let temp_dir = tempfile::tempdir().unwrap();
	let db_url = format!("sqlite:{}", temp_dir.path().join("dotvault.db").display());
	let pool = dotvault_server_db::create_pool(&db_url, config.database.max_connections)
		.await
		.unwrap();
	dotvault_server_db::run_migrations(&pool).await.unwrap();
	(temp_dir, pool)
}

pub async fn create_project(pool: &SqlitePool, owner: &OwnerId) -> ProjectId {
	ProjectRepository::new(pool.clone())
		.create_project(owner, "test-project")
		.await
		.unwrap()
		.id
}

pub async fn create_api_key(pool: &SqlitePool, owner: &OwnerId) -> (ApiKeyId, String) {
	let token = generate_token();
	let id = ApiKeyRepository::new(pool.clone())
		.create_api_key(owner, "test-key", &hash_token(token.expose()))
		.await
		.unwrap();
	(id, token.expose().clone())
}
