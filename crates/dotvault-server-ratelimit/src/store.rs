// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::RateLimitError;

/// State of one counter slot immediately after a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
	/// Hits in the current window, including this one.
	pub count: u32,
	/// When the current window closes.
	pub reset_at: Instant,
}

/// Counter storage behind [`crate::RateLimiter`].
#[async_trait]
pub trait RateLimitStore: Send + Sync {
	fn name(&self) -> &'static str;

	/// Atomically count a hit against `key`. Opens a fresh window of length
	/// `window` if none is open or the previous one has closed.
	async fn hit(&self, key: &str, window: Duration) -> Result<WindowSnapshot, RateLimitError>;

	/// Drop slots whose window closed more than `grace` ago. Returns how
	/// many were removed.
	async fn sweep(&self, grace: Duration) -> Result<usize, RateLimitError>;

	/// Slots currently held, when the store can tell cheaply.
	fn tracked(&self) -> Option<usize>;
}
