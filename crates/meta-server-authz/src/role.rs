// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User roles and the role assignment entry point.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::enforcer::PolicyEnforcer;
use crate::error::{AuthzError, Result};
use crate::model::WILDCARD_SUBJECT;

/// Built-in roles a user record can carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
	Root,
	Admin,
	#[default]
	Inspector,
}

impl Role {
	pub const ALL: [Role; 3] = [Role::Root, Role::Admin, Role::Inspector];

	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Root => "Root",
			Role::Admin => "Admin",
			Role::Inspector => "Inspector",
		}
	}

	/// Whether `name` can never be a username: the wildcard subject or a
	/// built-in role name. A user named after a role would inherit its
	/// permissions through the subject closure.
	pub fn is_reserved_name(name: &str) -> bool {
		name == WILDCARD_SUBJECT || Role::ALL.iter().any(|role| role.as_str() == name)
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = AuthzError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"Root" => Ok(Role::Root),
			"Admin" => Ok(Role::Admin),
			"Inspector" => Ok(Role::Inspector),
			other => Err(AuthzError::InvalidRule(format!("unknown role '{other}'"))),
		}
	}
}

/// Mutates the grouping relation on behalf of user management.
#[derive(Debug, Clone)]
pub struct RoleAssigner {
	enforcer: Arc<PolicyEnforcer>,
	bootstrap_mode: bool,
}

impl RoleAssigner {
	pub fn new(enforcer: Arc<PolicyEnforcer>, bootstrap_mode: bool) -> Self {
		Self {
			enforcer,
			bootstrap_mode,
		}
	}

	pub fn enforcer(&self) -> &Arc<PolicyEnforcer> {
		&self.enforcer
	}

	/// Grants `role` to `username`.
	///
	/// While the enforcer is not ready this is a no-op in bootstrap mode and
	/// [`AuthzError::NotReady`] otherwise.
	#[instrument(skip(self))]
	pub async fn assign_role(&self, username: &str, role: &str) -> Result<()> {
		self.validate(username, role)?;
		if !self.proceed(username, role)? {
			return Ok(());
		}

		let added = self.enforcer.add_grouping_policy(username, role).await?;
		info!(username, role, added, "role assigned");
		Ok(())
	}

	/// Makes `role` the only role of `username`.
	///
	/// The new role is granted before the others are revoked, so the user is
	/// never left without a role by a partial failure. If a revocation fails
	/// the bindings changed so far are restored before the error is returned.
	#[instrument(skip(self))]
	pub async fn replace_role(&self, username: &str, role: &str) -> Result<()> {
		self.validate(username, role)?;
		if !self.proceed(username, role)? {
			return Ok(());
		}

		let added = self.enforcer.add_grouping_policy(username, role).await?;
		let mut revoked = Vec::new();
		for previous in self.enforcer.roles_for_user(username) {
			if previous == role {
				continue;
			}
			if let Err(e) = self
				.enforcer
				.remove_grouping_policy(username, &previous)
				.await
			{
				self.roll_back(username, role, added, &revoked).await;
				return Err(e);
			}
			info!(username, role = %previous, "role revoked");
			revoked.push(previous);
		}
		info!(username, role, "role replaced");
		Ok(())
	}

	async fn roll_back(&self, username: &str, role: &str, added: bool, revoked: &[String]) {
		for previous in revoked {
			if let Err(e) = self.enforcer.add_grouping_policy(username, previous).await {
				warn!(username, role = %previous, error = %e, "failed to restore role");
			}
		}
		if added {
			if let Err(e) = self.enforcer.remove_grouping_policy(username, role).await {
				warn!(username, role, error = %e, "failed to withdraw role");
			}
		}
	}

	/// Removes every role of `username`, returning how many were revoked.
	#[instrument(skip(self))]
	pub async fn revoke_roles(&self, username: &str) -> Result<usize> {
		if username.trim().is_empty() {
			return Err(AuthzError::InvalidRule("username must not be empty".to_string()));
		}
		if !self.proceed(username, "*")? {
			return Ok(0);
		}

		let mut revoked = 0;
		for role in self.enforcer.roles_for_user(username) {
			if self.enforcer.remove_grouping_policy(username, &role).await? {
				revoked += 1;
			}
		}
		info!(username, revoked, "roles revoked");
		Ok(revoked)
	}

	fn proceed(&self, username: &str, role: &str) -> Result<bool> {
		if self.enforcer.is_ready() {
			return Ok(true);
		}
		if self.bootstrap_mode {
			warn!(
				username,
				role, "policy engine not ready, skipping role assignment in bootstrap mode"
			);
			return Ok(false);
		}
		Err(AuthzError::NotReady)
	}

	fn validate(&self, username: &str, role: &str) -> Result<()> {
		if username.trim().is_empty() {
			return Err(AuthzError::InvalidRule("username must not be empty".to_string()));
		}
		if role.trim().is_empty() {
			return Err(AuthzError::InvalidRule("role must not be empty".to_string()));
		}
		if Role::is_reserved_name(username) || self.enforcer.is_role_name(username) {
			return Err(AuthzError::InvalidRule(format!(
				"username '{username}' collides with a role name"
			)));
		}
		Ok(())
	}
}
