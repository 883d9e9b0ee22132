// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-side sessions.
//!
//! A session is created at login and carries a small key/value map. The
//! browser only ever holds the random token; the store keeps its SHA-256
//! hash (see [`crate::hash_token`]).
//!
//! Sessions use sliding expiry: every resolved request pushes `expires_at`
//! forward by the configured TTL.

use crate::types::{SessionId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Session key holding the authenticated username.
pub const USERNAME_KEY: &str = "username";

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
	pub id: SessionId,
	pub data: Map<String, Value>,
	pub created_at: DateTime<Utc>,
	pub last_used_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
}

impl Session {
	/// Create an empty session expiring `ttl` from now.
	#[instrument(level = "debug", skip_all, fields(ttl_secs = ttl.num_seconds()))]
	pub fn new(ttl: Duration) -> Self {
		let now = Utc::now();
		Self {
			id: SessionId::generate(),
			data: Map::new(),
			created_at: now,
			last_used_at: now,
			expires_at: now + ttl,
			ip_address: None,
			user_agent: None,
		}
	}

	/// Create a session for a freshly authenticated user.
	pub fn for_user(username: &str, user_id: UserId, ttl: Duration) -> Self {
		let mut session = Self::new(ttl);
		session.set(USERNAME_KEY, username);
		session.set(USER_ID_KEY, user_id.to_string());
		session
	}

	pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.data.get(key)
	}

	/// The value under `key` if it is a non-empty string.
	pub fn get_str(&self, key: &str) -> Option<&str> {
		self
			.data
			.get(key)
			.and_then(Value::as_str)
			.filter(|s| !s.is_empty())
	}

	pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
		self.data.insert(key.into(), value.into());
	}

	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.data.remove(key)
	}

	pub fn username(&self) -> Option<&str> {
		self.get_str(USERNAME_KEY)
	}

	pub fn user_id(&self) -> Option<UserId> {
		self.get_str(USER_ID_KEY).and_then(|s| s.parse().ok())
	}

	pub fn is_expired(&self) -> bool {
		Utc::now() > self.expires_at
	}

	/// Slide the expiry window forward.
	pub fn extend(&mut self, ttl: Duration) {
		let now = Utc::now();
		self.last_used_at = now;
		self.expires_at = now + ttl;
	}
}

/// Generates a cryptographically secure random session token.
pub fn generate_session_token() -> String {
	use rand::Rng;
	let mut rng = rand::thread_rng();
	let bytes: [u8; 32] = rng.gen();
	hex::encode(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ttl() -> Duration {
		Duration::hours(DEFAULT_SESSION_TTL_HOURS)
	}

	mod session_creation {
		use super::*;

		#[test]
		fn for_user_records_username_and_id() {
			let user_id = UserId::generate();
			let session = Session::for_user("alice", user_id, ttl());
			assert_eq!(session.username(), Some("alice"));
			assert_eq!(session.user_id(), Some(user_id));
		}

		#[test]
		fn expiry_is_ttl_from_creation() {
			let session = Session::new(ttl());
			let diff = (session.expires_at - (session.created_at + ttl()))
				.num_seconds()
				.abs();
			assert!(diff < 1);
		}

		#[test]
		fn builder_methods_set_metadata() {
			let session = Session::new(ttl())
				.with_ip("10.0.0.1")
				.with_user_agent("curl/8.0");
			assert_eq!(session.ip_address.as_deref(), Some("10.0.0.1"));
			assert_eq!(session.user_agent.as_deref(), Some("curl/8.0"));
		}
	}

	mod session_data {
		use super::*;

		#[test]
		fn empty_username_is_treated_as_missing() {
			let mut session = Session::new(ttl());
			session.set(USERNAME_KEY, "");
			assert_eq!(session.username(), None);
		}

		#[test]
		fn non_string_username_is_treated_as_missing() {
			let mut session = Session::new(ttl());
			session.set(USERNAME_KEY, 42);
			assert_eq!(session.username(), None);
		}

		#[test]
		fn remove_drops_the_key() {
			let mut session = Session::for_user("alice", UserId::generate(), ttl());
			assert!(session.remove(USERNAME_KEY).is_some());
			assert_eq!(session.username(), None);
		}
	}

	mod session_expiry {
		use super::*;

		#[test]
		fn new_session_is_not_expired() {
			assert!(!Session::new(ttl()).is_expired());
		}

		#[test]
		fn past_expiry_is_detected() {
			let mut session = Session::new(ttl());
			session.expires_at = Utc::now() - Duration::seconds(1);
			assert!(session.is_expired());
		}

		#[test]
		fn extend_revives_the_window() {
			let mut session = Session::new(ttl());
			session.expires_at = Utc::now() + Duration::minutes(1);
			session.extend(ttl());
			let expected = Utc::now() + ttl();
			assert!((session.expires_at - expected).num_seconds().abs() < 2);
		}
	}

	mod token_generation {
		use super::*;
		use std::collections::HashSet;

		#[test]
		fn tokens_are_64_hex_chars() {
			let token = generate_session_token();
			assert_eq!(token.len(), 64);
			assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
		}

		#[test]
		fn tokens_are_unique() {
			let tokens: HashSet<String> = (0..100).map(|_| generate_session_token()).collect();
			assert_eq!(tokens.len(), 100);
		}
	}
}
