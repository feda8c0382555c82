// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health and metrics HTTP handlers.

use axum::{
	extract::State,
	http::{header::CONTENT_TYPE, StatusCode},
	response::IntoResponse,
	Json,
};
use dotvault_server_ratelimit::Route;
use tokio::time::Instant;

pub use dotvault_server_api::health::*;
use dotvault_server_api::ErrorResponse;

use crate::{api::AppState, client_info::ClientAddr, error::ServerError, guard::admit_anonymous};

#[utoipa::path(
	get,
	path = "/health",
	responses(
		(status = 200, description = "Cache and database are reachable", body = HealthResponse),
		(status = 429, description = "Rate limited", body = ErrorResponse),
		(status = 503, description = "A dependency is unreachable", body = HealthResponse)
	),
	tag = "health"
)]
/// GET /health - Dependency health. No authentication, but rate limited.
pub async fn health_check(
	State(state): State<AppState>,
	client: ClientAddr,
) -> Result<impl IntoResponse, ServerError> {
	let rate_limit = admit_anonymous(&state, Route::Health, &client).await?;

	let (cache, database) = tokio::join!(check_cache(&state), check_database(&state));
	let components = HealthComponents { cache, database };

	let status = components.overall();
	let code = match status {
		HealthStatus::Healthy => StatusCode::OK,
		HealthStatus::Unhealthy => {
			tracing::warn!(
				cache = ?components.cache.status,
				database = ?components.database.status,
				"health check failing"
			);
			StatusCode::SERVICE_UNAVAILABLE
		}
	};

	Ok((
		code,
		rate_limit.headers(),
		Json(HealthResponse {
			status,
			version: env!("CARGO_PKG_VERSION").to_string(),
			components,
		}),
	))
}

async fn check_cache(state: &AppState) -> ComponentHealth {
	let cache = state.env_files.cache();
	let start = Instant::now();
	let result = cache.ping().await.map_err(|e| e.to_string());
	ComponentHealth::probe(cache.backend_name(), elapsed_ms(start), result)
}

async fn check_database(state: &AppState) -> ComponentHealth {
	let start = Instant::now();
	let ping = dotvault_server_db::ping(&state.pool);
	let result = match tokio::time::timeout(state.db_ping_timeout, ping).await {
		Ok(ping) => ping.map_err(|e| e.to_string()),
		Err(_) => Err(format!(
			"no response within {}ms",
			state.db_ping_timeout.as_millis()
		)),
	};
	ComponentHealth::probe("sqlite", elapsed_ms(start), result)
}

fn elapsed_ms(start: Instant) -> u64 {
	u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[utoipa::path(
	get,
	path = "/metrics",
	responses(
		(status = 200, description = "Prometheus text exposition", body = String)
	),
	tag = "health"
)]
/// GET /metrics - Prometheus metrics.
pub async fn prometheus_metrics(
	State(state): State<AppState>,
) -> Result<impl IntoResponse, ServerError> {
	match state.metrics.gather() {
		Ok(metrics) => Ok((
			StatusCode::OK,
			[(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
			metrics,
		)),
		Err(e) => {
			tracing::error!(error = %e, "failed to gather metrics");
			Err(ServerError::Internal(format!("Failed to gather metrics: {e}")))
		}
	}
}
