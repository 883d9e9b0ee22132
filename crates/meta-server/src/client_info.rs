// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client metadata for sessions, activity logs and audit entries.

use axum::http::{header::USER_AGENT, HeaderMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
}

impl ClientInfo {
	pub fn from_headers(headers: &HeaderMap) -> Self {
		Self {
			ip_address: extract_client_ip(headers),
			user_agent: headers
				.get(USER_AGENT)
				.and_then(|v| v.to_str().ok())
				.map(str::to_string),
		}
	}
}

/// Checks `X-Forwarded-For` (first hop), then `X-Real-IP`.
fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
	let forwarded = headers
		.get("x-forwarded-for")
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.split(',').next());
	let real_ip = headers.get("x-real-ip").and_then(|v| v.to_str().ok());

	forwarded
		.into_iter()
		.chain(real_ip)
		.map(str::trim)
		.find(|ip| !ip.is_empty())
		.map(str::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn first_forwarded_hop_wins() {
		let mut headers = HeaderMap::new();
		headers.insert(
			"x-forwarded-for",
			"203.0.113.195, 70.41.3.18".parse().unwrap(),
		);
		headers.insert("x-real-ip", "198.51.100.178".parse().unwrap());
		assert_eq!(
			extract_client_ip(&headers),
			Some("203.0.113.195".to_string())
		);
	}

	#[test]
	fn falls_back_to_real_ip() {
		let mut headers = HeaderMap::new();
		headers.insert("x-forwarded-for", " ".parse().unwrap());
		headers.insert("x-real-ip", "198.51.100.178".parse().unwrap());
		assert_eq!(
			extract_client_ip(&headers),
			Some("198.51.100.178".to_string())
		);
	}

	#[test]
	fn user_agent_is_captured() {
		let mut headers = HeaderMap::new();
		headers.insert(USER_AGENT, "curl/8.5".parse().unwrap());
		let info = ClientInfo::from_headers(&headers);
		assert_eq!(info.user_agent.as_deref(), Some("curl/8.5"));
		assert_eq!(info.ip_address, None);
	}

	proptest! {
		#[test]
		fn any_ipv4_chain_yields_its_first_hop(
			hops in prop::collection::vec(any::<[u8; 4]>(), 1..5)
		) {
			let chain: Vec<String> = hops
				.iter()
				.map(|o| format!("{}.{}.{}.{}", o[0], o[1], o[2], o[3]))
				.collect();
			let mut headers = HeaderMap::new();
			headers.insert("x-forwarded-for", chain.join(", ").parse().unwrap());
			prop_assert_eq!(extract_client_ip(&headers), Some(chain[0].clone()));
		}
	}
}
