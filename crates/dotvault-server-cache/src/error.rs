// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
	#[error("Connection error: {0}")]
	Connection(String),

	#[error("Operation timed out")]
	Timeout,

	#[error("Serialisation error: {0}")]
	Serialisation(String),

	#[error("Backend error: {0}")]
	Backend(String),
}
