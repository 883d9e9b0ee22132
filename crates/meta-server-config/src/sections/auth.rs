// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication and session configuration.

use std::fmt;

use serde::Deserialize;

const DEFAULT_COOKIE_NAME: &str = "meta_session";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Authentication configuration (runtime, fully resolved).
#[derive(Clone)]
pub struct AuthConfig {
	/// Deployment environment name; `production` enables stricter validation.
	pub environment: String,
	pub session_cookie_name: String,
	pub session_ttl_hours: i64,
	/// Add the `Secure` attribute to the session cookie.
	pub secure_cookie: bool,
	pub session_cleanup_interval_secs: u64,
	/// Root account created at startup if no user with this name exists.
	pub bootstrap_root_username: Option<String>,
	pub bootstrap_root_password: Option<String>,
}

impl AuthConfig {
	pub fn is_production(&self) -> bool {
		self.environment.eq_ignore_ascii_case("production")
	}
}

impl fmt::Debug for AuthConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AuthConfig")
			.field("environment", &self.environment)
			.field("session_cookie_name", &self.session_cookie_name)
			.field("session_ttl_hours", &self.session_ttl_hours)
			.field("secure_cookie", &self.secure_cookie)
			.field(
				"session_cleanup_interval_secs",
				&self.session_cleanup_interval_secs,
			)
			.field("bootstrap_root_username", &self.bootstrap_root_username)
			.field(
				"bootstrap_root_password",
				&self.bootstrap_root_password.as_ref().map(|_| "[REDACTED]"),
			)
			.finish()
	}
}

impl Default for AuthConfig {
	fn default() -> Self {
		AuthConfigLayer::default().finalize()
	}
}

/// Authentication configuration layer (partial, for merging).
#[derive(Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	pub session_cookie_name: Option<String>,
	#[serde(default)]
	pub session_ttl_hours: Option<i64>,
	#[serde(default)]
	pub secure_cookie: Option<bool>,
	#[serde(default)]
	pub session_cleanup_interval_secs: Option<u64>,
	#[serde(default)]
	pub bootstrap_root_username: Option<String>,
	#[serde(default)]
	pub bootstrap_root_password: Option<String>,
}

impl fmt::Debug for AuthConfigLayer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AuthConfigLayer")
			.field("environment", &self.environment)
			.field("session_cookie_name", &self.session_cookie_name)
			.field("bootstrap_root_username", &self.bootstrap_root_username)
			.finish_non_exhaustive()
	}
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.environment.is_some() {
			self.environment = other.environment;
		}
		if other.session_cookie_name.is_some() {
			self.session_cookie_name = other.session_cookie_name;
		}
		if other.session_ttl_hours.is_some() {
			self.session_ttl_hours = other.session_ttl_hours;
		}
		if other.secure_cookie.is_some() {
			self.secure_cookie = other.secure_cookie;
		}
		if other.session_cleanup_interval_secs.is_some() {
			self.session_cleanup_interval_secs = other.session_cleanup_interval_secs;
		}
		if other.bootstrap_root_username.is_some() {
			self.bootstrap_root_username = other.bootstrap_root_username;
		}
		if other.bootstrap_root_password.is_some() {
			self.bootstrap_root_password = other.bootstrap_root_password;
		}
	}

	pub fn finalize(self) -> AuthConfig {
		let environment = self
			.environment
			.unwrap_or_else(|| "development".to_string());
		// Secure cookies default on outside development.
		let secure_cookie = self
			.secure_cookie
			.unwrap_or(!environment.eq_ignore_ascii_case("development"));

		AuthConfig {
			environment,
			session_cookie_name: self
				.session_cookie_name
				.unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
			session_ttl_hours: self.session_ttl_hours.unwrap_or(DEFAULT_SESSION_TTL_HOURS),
			secure_cookie,
			session_cleanup_interval_secs: self
				.session_cleanup_interval_secs
				.unwrap_or(DEFAULT_CLEANUP_INTERVAL_SECS),
			bootstrap_root_username: self.bootstrap_root_username,
			bootstrap_root_password: self.bootstrap_root_password,
		}
	}
}
