// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-through caching for env file versions.
//!
//! The cache holds the latest version of each (project, environment) pair
//! under `envfile:{projectId}:{environment}`. It is advisory: an unreachable
//! or slow backend only costs a store round trip.

pub mod backend;
pub mod env_file_cache;
pub mod error;
pub mod memory;
pub mod read_through;
pub mod redis_kv;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backend::KvBackend;
pub use env_file_cache::{EnvFileCache, DEFAULT_OP_TIMEOUT, DEFAULT_TTL};
pub use error::KvError;
pub use memory::MemoryKv;
pub use read_through::{CachedVersionStore, Source};
pub use redis_kv::RedisKv;
