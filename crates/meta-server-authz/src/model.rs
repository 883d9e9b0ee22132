// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy model and rule types.
//!
//! Rules are persisted as flat `(ptype, v0, v1, v2)` tuples. In memory they
//! are split into [`Permission`] (`p`) and [`RoleBinding`] (`g`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthzError;
use crate::matcher::{KEY_MATCH, REGEX_MATCH};

/// Subject pattern that applies to every authenticated principal.
pub const WILDCARD_SUBJECT: &str = "*";

/// Default bound on role-of-role expansion.
pub const DEFAULT_MAX_ROLE_DEPTH: usize = 10;

/// Discriminator of a stored rule tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
	#[serde(rename = "p")]
	Permission,
	#[serde(rename = "g")]
	Grouping,
}

impl PolicyType {
	pub fn as_str(&self) -> &'static str {
		match self {
			PolicyType::Permission => "p",
			PolicyType::Grouping => "g",
		}
	}
}

impl fmt::Display for PolicyType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PolicyType {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"p" => Ok(PolicyType::Permission),
			"g" => Ok(PolicyType::Grouping),
			other => Err(AuthzError::InvalidRule(format!(
				"unknown policy type '{other}'"
			))),
		}
	}
}

/// Grants `subject` the `action` pattern on the `resource` pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
	pub subject: String,
	pub resource: String,
	pub action: String,
}

impl Permission {
	pub fn new(
		subject: impl Into<String>,
		resource: impl Into<String>,
		action: impl Into<String>,
	) -> Result<Self, AuthzError> {
		let permission = Self {
			subject: subject.into(),
			resource: resource.into(),
			action: action.into(),
		};
		require_non_empty("subject", &permission.subject)?;
		require_non_empty("resource", &permission.resource)?;
		require_non_empty("action", &permission.action)?;
		Ok(permission)
	}

	pub fn applies_to_everyone(&self) -> bool {
		self.subject == WILDCARD_SUBJECT
	}
}

/// Assigns `role` to `user`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleBinding {
	pub user: String,
	pub role: String,
}

impl RoleBinding {
	pub fn new(user: impl Into<String>, role: impl Into<String>) -> Result<Self, AuthzError> {
		let binding = Self {
			user: user.into(),
			role: role.into(),
		};
		require_non_empty("user", &binding.user)?;
		require_non_empty("role", &binding.role)?;
		Ok(binding)
	}
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AuthzError> {
	if value.trim().is_empty() {
		return Err(AuthzError::InvalidRule(format!("{field} must not be empty")));
	}
	Ok(())
}

/// A stored rule tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "ptype")]
pub enum PolicyRule {
	#[serde(rename = "p")]
	Permission(Permission),
	#[serde(rename = "g")]
	Grouping(RoleBinding),
}

impl PolicyRule {
	pub fn policy_type(&self) -> PolicyType {
		match self {
			PolicyRule::Permission(_) => PolicyType::Permission,
			PolicyRule::Grouping(_) => PolicyType::Grouping,
		}
	}

	/// The `(v0, v1, v2)` columns of the tuple. Grouping rules leave `v2` empty.
	pub fn values(&self) -> [&str; 3] {
		match self {
			PolicyRule::Permission(p) => [p.subject.as_str(), p.resource.as_str(), p.action.as_str()],
			PolicyRule::Grouping(g) => [g.user.as_str(), g.role.as_str(), ""],
		}
	}

	/// Rebuilds a rule from its stored columns.
	pub fn from_parts(ptype: &str, v0: &str, v1: &str, v2: &str) -> Result<Self, AuthzError> {
		match ptype.parse::<PolicyType>()? {
			PolicyType::Permission => Ok(PolicyRule::Permission(Permission::new(v0, v1, v2)?)),
			PolicyType::Grouping => Ok(PolicyRule::Grouping(RoleBinding::new(v0, v1)?)),
		}
	}
}

impl fmt::Display for PolicyRule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let [v0, v1, v2] = self.values();
		match self {
			PolicyRule::Permission(_) => write!(f, "p, {v0}, {v1}, {v2}"),
			PolicyRule::Grouping(_) => write!(f, "g, {v0}, {v1}"),
		}
	}
}

impl From<Permission> for PolicyRule {
	fn from(p: Permission) -> Self {
		PolicyRule::Permission(p)
	}
}

impl From<RoleBinding> for PolicyRule {
	fn from(g: RoleBinding) -> Self {
		PolicyRule::Grouping(g)
	}
}

/// The fixed request/policy/matcher shape evaluated by the enforcer.
///
/// A request `(sub, obj, act)` is allowed by a permission `(p.sub, p.obj,
/// p.act)` when `p.sub` is `sub`, `*`, or a role reachable from `sub`, and
/// both named matchers accept their pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyModel {
	/// Matcher applied to `(request path, rule resource)`.
	pub resource_matcher: String,
	/// Matcher applied to `(request method, rule action)`.
	pub action_matcher: String,
	/// Maximum number of grouping hops followed from a subject. `1` keeps the
	/// model flat (user to role only).
	pub max_role_depth: usize,
}

impl Default for PolicyModel {
	fn default() -> Self {
		Self {
			resource_matcher: KEY_MATCH.to_string(),
			action_matcher: REGEX_MATCH.to_string(),
			max_role_depth: DEFAULT_MAX_ROLE_DEPTH,
		}
	}
}

impl PolicyModel {
	pub fn with_max_role_depth(mut self, depth: usize) -> Self {
		self.max_role_depth = depth;
		self
	}
}
