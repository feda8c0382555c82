// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dotvault_server_config::RateLimitConfig;
use tokio::time::Instant;

use crate::error::RateLimitError;
use crate::store::RateLimitStore;

/// Which identity a check is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
	/// Client network address, before any credential work.
	PreAuth,
	/// Verified API key.
	PostAuth,
}

impl Phase {
	pub fn as_str(&self) -> &'static str {
		match self {
			Phase::PreAuth => "pre",
			Phase::PostAuth => "post",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
	Upload,
	Retrieve,
	Versions,
	Decrypt,
	Health,
}

impl Route {
	pub fn as_str(&self) -> &'static str {
		match self {
			Route::Upload => "upload",
			Route::Retrieve => "retrieve",
			Route::Versions => "versions",
			Route::Decrypt => "decrypt",
			Route::Health => "health",
		}
	}
}

impl fmt::Display for Route {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
	pub limit: u32,
	pub window: Duration,
}

impl RateLimitRule {
	pub fn per_window(limit: u32, window: Duration) -> Self {
		Self { limit, window }
	}
}

/// Ceilings for every (phase, route) pair.
#[derive(Debug, Clone)]
pub struct RateLimitRules {
	pub upload: RateLimitRule,
	pub read: RateLimitRule,
	pub decrypt: RateLimitRule,
	pub health: RateLimitRule,
	pub post_auth: RateLimitRule,
}

impl RateLimitRules {
	pub fn from_config(config: &RateLimitConfig) -> Self {
		let window = config.window();
		Self {
			upload: RateLimitRule::per_window(config.upload_pre_auth, window),
			read: RateLimitRule::per_window(config.read_pre_auth, window),
			decrypt: RateLimitRule::per_window(config.decrypt_pre_auth, window),
			health: RateLimitRule::per_window(config.health_pre_auth, window),
			post_auth: RateLimitRule::per_window(config.post_auth, window),
		}
	}

	pub fn rule_for(&self, phase: Phase, route: Route) -> RateLimitRule {
		match (phase, route) {
			(Phase::PostAuth, _) => self.post_auth,
			(Phase::PreAuth, Route::Upload) => self.upload,
			(Phase::PreAuth, Route::Retrieve | Route::Versions) => self.read,
			(Phase::PreAuth, Route::Decrypt) => self.decrypt,
			(Phase::PreAuth, Route::Health) => self.health,
		}
	}

	/// Longest window in use, for sweeping.
	pub fn longest_window(&self) -> Duration {
		[
			self.upload.window,
			self.read.window,
			self.decrypt.window,
			self.health.window,
			self.post_auth.window,
		]
		.into_iter()
		.max()
		.unwrap_or_default()
	}
}

impl Default for RateLimitRules {
	fn default() -> Self {
		Self::from_config(&RateLimitConfig::default())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
	Allowed {
		limit: u32,
		remaining: u32,
		reset_after: Duration,
	},
	Limited {
		limit: u32,
		/// Whole seconds until the window closes, at least 1.
		retry_after: u64,
	},
}

impl RateLimitDecision {
	pub fn is_allowed(&self) -> bool {
		matches!(self, RateLimitDecision::Allowed { .. })
	}
}

#[derive(Clone)]
pub struct RateLimiter {
	store: Arc<dyn RateLimitStore>,
	rules: RateLimitRules,
}

impl RateLimiter {
	pub fn new(store: Arc<dyn RateLimitStore>, rules: RateLimitRules) -> Self {
		Self { store, rules }
	}

	pub fn rules(&self) -> &RateLimitRules {
		&self.rules
	}

	pub fn store(&self) -> &Arc<dyn RateLimitStore> {
		&self.store
	}

	/// Count a request by `identity` against the configured rule.
	pub async fn check(&self, phase: Phase, route: Route, identity: &str) -> RateLimitDecision {
		let rule = self.rules.rule_for(phase, route);
		let key = format!("{}:{}:{identity}", phase.as_str(), route.as_str());
		self.check_rule(&key, rule).await
	}

	/// Count a hit on `key` under an explicit rule.
	#[tracing::instrument(skip(self), fields(store = self.store.name()))]
	pub async fn check_rule(&self, key: &str, rule: RateLimitRule) -> RateLimitDecision {
		let snapshot = match self.store.hit(key, rule.window).await {
			Ok(snapshot) => snapshot,
			Err(RateLimitError::Capacity { tracked, retry_at }) => {
				let wait = retry_at.saturating_duration_since(Instant::now());
				let retry_after = ceil_secs(wait).clamp(1, ceil_secs(rule.window).max(1));
				tracing::warn!(tracked, retry_after, "rate limit store full, refusing new identity");
				return RateLimitDecision::Limited {
					limit: rule.limit,
					retry_after,
				};
			}
			Err(e) => {
				tracing::warn!(error = %e, "rate limit store unavailable, admitting request");
				return RateLimitDecision::Allowed {
					limit: rule.limit,
					remaining: rule.limit,
					reset_after: rule.window,
				};
			}
		};

		let reset_after = snapshot.reset_at.saturating_duration_since(Instant::now());
		if snapshot.count > rule.limit {
			let retry_after = ceil_secs(reset_after).clamp(1, ceil_secs(rule.window).max(1));
			tracing::debug!(count = snapshot.count, retry_after, "rate limited");
			return RateLimitDecision::Limited {
				limit: rule.limit,
				retry_after,
			};
		}

		RateLimitDecision::Allowed {
			limit: rule.limit,
			remaining: rule.limit - snapshot.count,
			reset_after,
		}
	}

	/// Drop counters whose window closed more than one window ago.
	pub async fn sweep(&self) -> usize {
		match self.store.sweep(self.rules.longest_window()).await {
			Ok(removed) => removed,
			Err(e) => {
				tracing::warn!(error = %e, "rate limit sweep failed");
				0
			}
		}
	}
}

fn ceil_secs(d: Duration) -> u64 {
	d.as_secs() + u64::from(d.subsec_nanos() > 0)
}
