// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy enforcement configuration.

use serde::Deserialize;

const DEFAULT_PROTECTED_PREFIX: &str = "/api/";
const DEFAULT_MAX_ROLE_DEPTH: usize = 10;

/// Authorization configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthzConfig {
	/// Requests whose path starts with this prefix are policy-checked.
	pub protected_prefix: String,
	/// Insert the baseline rules at startup.
	pub seed_baseline: bool,
	/// Let protected traffic through while the policy engine is not ready.
	/// Development only; rejected in production.
	pub bootstrap_mode: bool,
	pub max_role_depth: usize,
}

impl Default for AuthzConfig {
	fn default() -> Self {
		AuthzConfigLayer::default().finalize()
	}
}

/// Authorization configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthzConfigLayer {
	#[serde(default)]
	pub protected_prefix: Option<String>,
	#[serde(default)]
	pub seed_baseline: Option<bool>,
	#[serde(default)]
	pub bootstrap_mode: Option<bool>,
	#[serde(default)]
	pub max_role_depth: Option<usize>,
}

impl AuthzConfigLayer {
	pub fn merge(&mut self, other: AuthzConfigLayer) {
		if other.protected_prefix.is_some() {
			self.protected_prefix = other.protected_prefix;
		}
		if other.seed_baseline.is_some() {
			self.seed_baseline = other.seed_baseline;
		}
		if other.bootstrap_mode.is_some() {
			self.bootstrap_mode = other.bootstrap_mode;
		}
		if other.max_role_depth.is_some() {
			self.max_role_depth = other.max_role_depth;
		}
	}

	pub fn finalize(self) -> AuthzConfig {
		AuthzConfig {
			protected_prefix: self
				.protected_prefix
				.unwrap_or_else(|| DEFAULT_PROTECTED_PREFIX.to_string()),
			seed_baseline: self.seed_baseline.unwrap_or(true),
			bootstrap_mode: self.bootstrap_mode.unwrap_or(false),
			max_role_depth: self.max_role_depth.unwrap_or(DEFAULT_MAX_ROLE_DEPTH),
		}
	}
}
