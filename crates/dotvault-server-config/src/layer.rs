// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	CacheConfigLayer, CipherConfigLayer, DatabaseConfigLayer, HttpConfigLayer, LoggingConfigLayer,
	RateLimitConfigLayer, RequestConfigLayer,
};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub cache: Option<CacheConfigLayer>,
	#[serde(default)]
	pub rate_limit: Option<RateLimitConfigLayer>,
	#[serde(default)]
	pub cipher: Option<CipherConfigLayer>,
	#[serde(default)]
	pub request: Option<RequestConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(
			&mut self.database,
			other.database,
			DatabaseConfigLayer::merge,
		);
		merge_option(&mut self.cache, other.cache, CacheConfigLayer::merge);
		merge_option(
			&mut self.rate_limit,
			other.rate_limit,
			RateLimitConfigLayer::merge,
		);
		merge_option(&mut self.cipher, other.cipher, CipherConfigLayer::merge);
		merge_option(&mut self.request, other.request, RequestConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_empty_layers() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer::default());
		assert!(base.http.is_none());
		assert!(base.rate_limit.is_none());
	}

	#[test]
	fn test_merge_fills_missing_section() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer {
			cache: Some(CacheConfigLayer {
				ttl_secs: Some(30),
				..Default::default()
			}),
			..Default::default()
		});
		assert_eq!(base.cache.unwrap().ttl_secs, Some(30));
	}

	#[test]
	fn test_merge_other_overwrites_field_by_field() {
		let mut base = ServerConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(9000),
				host: Some("127.0.0.1".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(8080),
				..Default::default()
			}),
			..Default::default()
		});

		let http = base.http.unwrap();
		assert_eq!(http.port, Some(8080));
		assert_eq!(http.host.as_deref(), Some("127.0.0.1"));
	}

	#[test]
	fn test_toml_with_all_sections() {
		let layer: ServerConfigLayer = toml::from_str(
			r#"
			[http]
			port = 9999

			[database]
			url = "sqlite::memory:"

			[cache]
			url = "memory"
			ttl_secs = 15

			[rate_limit]
			post_auth = 100

			[cipher]
			aead = "chacha20-poly1305"

			[request]
			timeout_secs = 5

			[logging]
			level = "warn"
			"#,
		)
		.unwrap();

		assert_eq!(layer.http.unwrap().port, Some(9999));
		assert_eq!(layer.cache.unwrap().ttl_secs, Some(15));
		assert_eq!(layer.rate_limit.unwrap().post_auth, Some(100));
		assert_eq!(layer.request.unwrap().timeout_secs, Some(5));
	}
}
