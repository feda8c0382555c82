// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum RateLimitError {
	#[error("Counter store connection error: {0}")]
	Connection(String),

	#[error("Counter store error: {0}")]
	Backend(String),

	/// The in-process store is full even after purging expired slots.
	/// `retry_at` is the earliest deadline among the held slots.
	#[error("Tracking {tracked} identities, at capacity")]
	Capacity { tracked: usize, retry_at: Instant },
}
