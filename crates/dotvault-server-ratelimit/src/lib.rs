// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixed-window admission control.
//!
//! Every protected route is checked twice: first by client address
//! ([`Phase::PreAuth`]) before the API key is looked at, then by API key
//! ([`Phase::PostAuth`]) once it has been verified. Counters live behind
//! [`RateLimitStore`], in process or in Redis.

mod error;
mod limiter;
mod memory;
mod redis_store;
mod store;
mod sweeper;

pub use error::RateLimitError;
pub use limiter::{Phase, RateLimitDecision, RateLimitRule, RateLimitRules, RateLimiter, Route};
pub use memory::MemoryRateLimitStore;
pub use redis_store::RedisRateLimitStore;
pub use store::{RateLimitStore, WindowSnapshot};
pub use sweeper::spawn_sweeper;
