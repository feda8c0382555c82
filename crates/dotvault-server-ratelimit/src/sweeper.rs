// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::limiter::RateLimiter;

/// Periodically reclaim expired counters until `shutdown` fires.
pub fn spawn_sweeper(
	limiter: RateLimiter,
	interval: Duration,
	mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		// The first tick completes immediately.
		ticker.tick().await;

		loop {
			tokio::select! {
				_ = ticker.tick() => {
					let removed = limiter.sweep().await;
					tracing::debug!(
						removed,
						tracked = ?limiter.store().tracked(),
						"swept rate limit counters"
					);
				}
				_ = shutdown.recv() => {
					tracing::info!("rate limit sweeper stopping");
					break;
				}
			}
		}
	})
}
