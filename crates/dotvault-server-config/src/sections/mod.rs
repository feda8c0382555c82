// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod cache;
mod cipher;
mod database;
mod http;
mod logging;
mod rate_limit;
mod request;

pub use cache::{CacheBackend, CacheConfig, CacheConfigLayer};
pub use cipher::{
	CipherConfig, CipherConfigLayer, KNOWN_AEADS, KNOWN_KDFS, RECOMMENDED_ITERATIONS,
	RECOMMENDED_MEMORY_KIB,
};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use rate_limit::{RateLimitConfig, RateLimitConfigLayer};
pub use request::{RequestConfig, RequestConfigLayer};
