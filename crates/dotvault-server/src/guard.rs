// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request admission: pre-auth limit, authentication, post-auth limit.
//!
//! The pre-auth check runs before the body is parsed or the API key is
//! looked up, so floods of bad credentials are bounded per network address.
//! The post-auth check is keyed on the verified credential.

use axum::http::{HeaderMap, HeaderValue};
use dotvault_server_ratelimit::{Phase, RateLimitDecision, Route};

use crate::api::AppState;
use crate::auth_middleware::{authenticate, AuthenticatedKey};
use crate::client_info::ClientAddr;
use crate::error::ServerError;

/// Counter state reported back in response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
	pub limit: u32,
	pub remaining: u32,
}

impl RateLimitInfo {
	pub fn headers(&self) -> HeaderMap {
		let mut headers = HeaderMap::new();
		headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
		headers.insert("x-ratelimit-remaining", HeaderValue::from(self.remaining));
		headers
	}
}

#[derive(Debug, Clone, Copy)]
pub struct Admitted {
	pub key: AuthenticatedKey,
	pub rate_limit: RateLimitInfo,
}

/// Admit an authenticated request or explain why not.
#[tracing::instrument(skip_all, fields(route = %route, client = %client.0))]
pub async fn admit(
	state: &AppState,
	route: Route,
	client: &ClientAddr,
	headers: &HeaderMap,
) -> Result<Admitted, ServerError> {
	enforce(state, Phase::PreAuth, route, &client.0).await?;

	let key = authenticate(&state.api_keys, headers).await?;

	let rate_limit = enforce(
		state,
		Phase::PostAuth,
		route,
		&key.credential_id.to_string(),
	)
	.await?;

	Ok(Admitted { key, rate_limit })
}

/// Pre-auth limit only, for endpoints that take no credential.
pub async fn admit_anonymous(
	state: &AppState,
	route: Route,
	client: &ClientAddr,
) -> Result<RateLimitInfo, ServerError> {
	enforce(state, Phase::PreAuth, route, &client.0).await
}

async fn enforce(
	state: &AppState,
	phase: Phase,
	route: Route,
	identity: &str,
) -> Result<RateLimitInfo, ServerError> {
	match state.limiter.check(phase, route, identity).await {
		RateLimitDecision::Allowed {
			limit, remaining, ..
		} => Ok(RateLimitInfo { limit, remaining }),
		RateLimitDecision::Limited { limit, retry_after } => {
			state
				.metrics
				.rate_limited
				.with_label_values(&[phase.as_str(), route.as_str()])
				.inc();
			tracing::info!(
				phase = phase.as_str(),
				retry_after,
				"request rate limited"
			);
			Err(ServerError::RateLimited { limit, retry_after })
		}
	}
}
