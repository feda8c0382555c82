// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Network identity used for pre-auth rate limiting.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
	extract::{ConnectInfo, FromRequestParts},
	http::{request::Parts, HeaderMap},
};

use crate::api::AppState;

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client address as a string, resolved per [`client_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

impl FromRequestParts<AppState> for ClientAddr {
	type Rejection = Infallible;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let peer = parts
			.extensions
			.get::<ConnectInfo<SocketAddr>>()
			.map(|ConnectInfo(addr)| *addr);
		Ok(ClientAddr(client_identity(
			&parts.headers,
			peer,
			state.trust_forwarded_headers,
		)))
	}
}

/// Proxy headers win when trusted, then the socket peer, then `unknown`.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> String {
	if trust_forwarded {
		if let Some(ip) = extract_forwarded_ip(headers) {
			return ip;
		}
	}
	peer.map(|addr| addr.ip().to_string())
		.unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Checks headers in order of preference:
/// 1. `X-Forwarded-For` (first IP in chain)
/// 2. `X-Real-IP`
/// 3. `CF-Connecting-IP`
fn extract_forwarded_ip(headers: &HeaderMap) -> Option<String> {
	let first_hop = headers
		.get("x-forwarded-for")
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.split(',').next());

	first_hop
		.into_iter()
		.chain(
			["x-real-ip", "cf-connecting-ip"]
				.into_iter()
				.filter_map(|name| headers.get(name).and_then(|v| v.to_str().ok())),
		)
		.map(str::trim)
		.find(|ip| !ip.is_empty())
		.map(str::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn peer() -> Option<SocketAddr> {
		Some("192.0.2.10:51234".parse().unwrap())
	}

	#[test]
	fn forwarded_for_first_hop() {
		let mut headers = HeaderMap::new();
		headers.insert(
			"x-forwarded-for",
			"203.0.113.195, 70.41.3.18".parse().unwrap(),
		);
		assert_eq!(client_identity(&headers, peer(), true), "203.0.113.195");
	}

	#[test]
	fn real_ip_then_cloudflare() {
		let mut headers = HeaderMap::new();
		headers.insert("cf-connecting-ip", "198.51.100.7".parse().unwrap());
		assert_eq!(client_identity(&headers, peer(), true), "198.51.100.7");

		headers.insert("x-real-ip", "198.51.100.178".parse().unwrap());
		assert_eq!(client_identity(&headers, peer(), true), "198.51.100.178");
	}

	#[test]
	fn untrusted_headers_are_ignored() {
		let mut headers = HeaderMap::new();
		headers.insert("x-forwarded-for", "203.0.113.195".parse().unwrap());
		assert_eq!(client_identity(&headers, peer(), false), "192.0.2.10");
	}

	#[test]
	fn blank_forwarded_falls_back_to_peer() {
		let mut headers = HeaderMap::new();
		headers.insert("x-forwarded-for", " ".parse().unwrap());
		assert_eq!(client_identity(&headers, peer(), true), "192.0.2.10");
	}

	#[test]
	fn unknown_without_peer() {
		assert_eq!(client_identity(&HeaderMap::new(), None, true), UNKNOWN_CLIENT);
	}
}
