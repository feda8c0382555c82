// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Misbehaving backends for exercising cache outages.

use std::time::Duration;

use async_trait::async_trait;

use crate::backend::KvBackend;
use crate::error::KvError;

/// Every operation fails immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingKv;

#[async_trait]
impl KvBackend for FailingKv {
	fn name(&self) -> &'static str {
		"failing"
	}

	async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, KvError> {
		Err(KvError::Connection("connection refused".to_string()))
	}

	async fn put(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> Result<(), KvError> {
		Err(KvError::Connection("connection refused".to_string()))
	}

	async fn put_fenced(
		&self,
		_key: &str,
		_fence: i64,
		_value: &[u8],
		_ttl: Option<Duration>,
	) -> Result<bool, KvError> {
		Err(KvError::Connection("connection refused".to_string()))
	}

	async fn delete(&self, _key: &str) -> Result<bool, KvError> {
		Err(KvError::Connection("connection refused".to_string()))
	}

	async fn ping(&self) -> Result<(), KvError> {
		Err(KvError::Connection("connection refused".to_string()))
	}
}

/// Every operation never completes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HangingKv;

#[async_trait]
impl KvBackend for HangingKv {
	fn name(&self) -> &'static str {
		"hanging"
	}

	async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, KvError> {
		std::future::pending().await
	}

	async fn put(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> Result<(), KvError> {
		std::future::pending().await
	}

	async fn put_fenced(
		&self,
		_key: &str,
		_fence: i64,
		_value: &[u8],
		_ttl: Option<Duration>,
	) -> Result<bool, KvError> {
		std::future::pending().await
	}

	async fn delete(&self, _key: &str) -> Result<bool, KvError> {
		std::future::pending().await
	}

	async fn ping(&self) -> Result<(), KvError> {
		std::future::pending().await
	}
}
