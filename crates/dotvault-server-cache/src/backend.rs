// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;

use crate::error::KvError;

/// Minimal key-value capability the cache needs.
#[async_trait]
pub trait KvBackend: Send + Sync {
	/// Short name for logs and health output.
	fn name(&self) -> &'static str;

	async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

	/// Overwrites any existing value.
	async fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), KvError>;

	/// Stores `value` tagged with `fence` unless the key currently holds a
	/// higher fence. Returns whether the value was stored. A plain `put`
	/// clears the fence.
	async fn put_fenced(
		&self,
		key: &str,
		fence: i64,
		value: &[u8],
		ttl: Option<Duration>,
	) -> Result<bool, KvError>;

	/// Returns whether a value was removed. Deleting an absent key is not an error.
	async fn delete(&self, key: &str) -> Result<bool, KvError>;

	async fn ping(&self) -> Result<(), KvError>;
}
