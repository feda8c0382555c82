// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
	Healthy,
	Unhealthy,
}

/// Probe result for one dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ComponentHealth {
	pub status: HealthStatus,
	/// `memory`, `redis` or `sqlite`.
	pub backend: String,
	pub latency_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl ComponentHealth {
	pub fn probe(backend: &str, latency_ms: u64, result: Result<(), String>) -> Self {
		let (status, error) = match result {
			Ok(()) => (HealthStatus::Healthy, None),
			Err(e) => (HealthStatus::Unhealthy, Some(e)),
		};
		Self {
			status,
			backend: backend.to_string(),
			latency_ms,
			error,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct HealthComponents {
	pub cache: ComponentHealth,
	pub database: ComponentHealth,
}

impl HealthComponents {
	/// Healthy only if the cache and the database both answered.
	pub fn overall(&self) -> HealthStatus {
		if self.cache.status == HealthStatus::Healthy
			&& self.database.status == HealthStatus::Healthy
		{
			HealthStatus::Healthy
		} else {
			HealthStatus::Unhealthy
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub version: String,
	pub components: HealthComponents,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cache_outage_makes_service_unhealthy() {
		let components = HealthComponents {
			cache: ComponentHealth::probe("redis", 250, Err("timed out".to_string())),
			database: ComponentHealth::probe("sqlite", 1, Ok(())),
		};
		assert_eq!(components.overall(), HealthStatus::Unhealthy);
		assert_eq!(components.cache.error.as_deref(), Some("timed out"));
	}

	#[test]
	fn healthy_probe_omits_error_field() {
		let component = ComponentHealth::probe("memory", 0, Ok(()));
		let json = serde_json::to_value(&component).unwrap();
		assert_eq!(json["status"], "healthy");
		assert_eq!(json["backend"], "memory");
		assert!(json.get("error").is_none());
	}
}
