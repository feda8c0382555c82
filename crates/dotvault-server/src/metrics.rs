// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Prometheus metrics for the env file endpoints.

use prometheus::{
	Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

pub struct ServerMetrics {
	registry: Registry,

	pub uploads: IntCounterVec,
	pub retrievals: IntCounterVec,
	pub rate_limited: IntCounterVec,
	pub decrypt_failures: IntCounter,
	pub cipher_duration: Histogram,
}

impl ServerMetrics {
	pub fn new() -> Result<Self, prometheus::Error> {
		let registry = Registry::new();

		let uploads = IntCounterVec::new(
			Opts::new("dotvault_uploads_total", "Env file versions stored"),
			&["shape"],
		)?;
		registry.register(Box::new(uploads.clone()))?;

		let retrievals = IntCounterVec::new(
			Opts::new("dotvault_retrievals_total", "Env file reads by where they were served from"),
			&["source"],
		)?;
		registry.register(Box::new(retrievals.clone()))?;

		let rate_limited = IntCounterVec::new(
			Opts::new("dotvault_rate_limited_total", "Requests rejected by the rate limiter"),
			&["phase", "route"],
		)?;
		registry.register(Box::new(rate_limited.clone()))?;

		let decrypt_failures = IntCounter::new(
			"dotvault_decrypt_failures_total",
			"Server-side decryptions that failed authentication",
		)?;
		registry.register(Box::new(decrypt_failures.clone()))?;

		let cipher_duration = Histogram::with_opts(
			HistogramOpts::new(
				"dotvault_cipher_duration_seconds",
				"Time spent deriving keys and sealing or opening payloads",
			)
			.buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
		)?;
		registry.register(Box::new(cipher_duration.clone()))?;

		Ok(Self {
			registry,
			uploads,
			retrievals,
			rate_limited,
			decrypt_failures,
			cipher_duration,
		})
	}

	/// Text exposition format.
	pub fn gather(&self) -> Result<String, prometheus::Error> {
		let mut buffer = Vec::new();
		TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
		String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn counters_appear_in_exposition() {
		let metrics = ServerMetrics::new().unwrap();
		metrics.uploads.with_label_values(&["raw"]).inc();
		metrics.retrievals.with_label_values(&["cache"]).inc_by(2);
		metrics
			.rate_limited
			.with_label_values(&["pre", "upload"])
			.inc();

		let text = metrics.gather().unwrap();
		assert!(text.contains(r#"dotvault_uploads_total{shape="raw"} 1"#));
		assert!(text.contains(r#"dotvault_retrievals_total{source="cache"} 2"#));
		assert!(text.contains(r#"dotvault_rate_limited_total{phase="pre",route="upload"} 1"#));
	}

	#[test]
	fn registries_are_independent() {
		let a = ServerMetrics::new().unwrap();
		let b = ServerMetrics::new().unwrap();
		a.decrypt_failures.inc();
		assert!(!b.gather().unwrap().contains("dotvault_decrypt_failures_total 1"));
	}
}
