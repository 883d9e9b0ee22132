// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The policy enforcer.
//!
//! # Concurrency
//!
//! - The rule set lives behind a [`std::sync::RwLock`]. [`PolicyEnforcer::enforce`]
//!   holds the read lock for one synchronous evaluation and never touches storage.
//! - Writers queue on an async write gate that is held across the adapter call.
//!   The in-memory change is applied under the write lock only after the adapter
//!   accepted it, so a failed write leaves memory untouched and readers never see
//!   a provisional tuple.
//!
//! # Readiness
//!
//! A freshly built enforcer is not ready. Every evaluation and mutation fails
//! with [`AuthzError::NotReady`] until [`PolicyEnforcer::load`] succeeds.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::adapter::PolicyAdapter;
use crate::error::{AuthzError, Result};
use crate::matcher::{Matcher, MatcherRegistry};
use crate::model::{Permission, PolicyModel, PolicyRule, RoleBinding, WILDCARD_SUBJECT};

#[derive(Debug, Default)]
struct PolicyState {
	permissions: Vec<Permission>,
	roles: HashMap<String, BTreeSet<String>>,
}

impl PolicyState {
	fn from_rules(rules: Vec<PolicyRule>) -> Self {
		let mut state = Self::default();
		for rule in rules {
			state.insert(rule);
		}
		state
	}

	fn contains(&self, rule: &PolicyRule) -> bool {
		match rule {
			PolicyRule::Permission(p) => self.permissions.contains(p),
			PolicyRule::Grouping(g) => self
				.roles
				.get(&g.user)
				.is_some_and(|roles| roles.contains(&g.role)),
		}
	}

	fn insert(&mut self, rule: PolicyRule) -> bool {
		match rule {
			PolicyRule::Permission(p) => {
				if self.permissions.contains(&p) {
					return false;
				}
				self.permissions.push(p);
				true
			}
			PolicyRule::Grouping(g) => self.roles.entry(g.user).or_default().insert(g.role),
		}
	}

	fn remove(&mut self, rule: &PolicyRule) -> bool {
		match rule {
			PolicyRule::Permission(p) => {
				let before = self.permissions.len();
				self.permissions.retain(|existing| existing != p);
				before != self.permissions.len()
			}
			PolicyRule::Grouping(g) => {
				let Some(roles) = self.roles.get_mut(&g.user) else {
					return false;
				};
				let removed = roles.remove(&g.role);
				if roles.is_empty() {
					self.roles.remove(&g.user);
				}
				removed
			}
		}
	}

	/// `subject` plus every role reachable from it within `max_depth` hops.
	fn subject_closure<'a>(&'a self, subject: &'a str, max_depth: usize) -> HashSet<&'a str> {
		let mut seen: HashSet<&str> = HashSet::from([subject]);
		let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(subject, 0)]);

		while let Some((current, depth)) = queue.pop_front() {
			if depth >= max_depth {
				continue;
			}
			let Some(roles) = self.roles.get(current) else {
				continue;
			};
			for role in roles {
				if seen.insert(role.as_str()) {
					queue.push_back((role.as_str(), depth + 1));
				}
			}
		}

		seen
	}
}

/// Evaluates `(subject, resource, action)` requests against loaded rules.
///
/// Build one per process at the composition root and share it by `Arc`.
pub struct PolicyEnforcer {
	model: PolicyModel,
	resource_matcher: Arc<dyn Matcher>,
	action_matcher: Arc<dyn Matcher>,
	adapter: Arc<dyn PolicyAdapter>,
	state: RwLock<PolicyState>,
	ready: AtomicBool,
	write_gate: Mutex<()>,
}

impl std::fmt::Debug for PolicyEnforcer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PolicyEnforcer")
			.field("model", &self.model)
			.field("ready", &self.is_ready())
			.finish_non_exhaustive()
	}
}

impl PolicyEnforcer {
	/// Builds an enforcer whose model matchers are resolved from `registry`.
	///
	/// # Errors
	/// [`AuthzError::UnknownMatcher`] if the model names an unregistered matcher.
	pub fn new(
		model: PolicyModel,
		registry: &MatcherRegistry,
		adapter: Arc<dyn PolicyAdapter>,
	) -> Result<Self> {
		let resource_matcher = registry.resolve(&model.resource_matcher)?;
		let action_matcher = registry.resolve(&model.action_matcher)?;

		Ok(Self {
			model,
			resource_matcher,
			action_matcher,
			adapter,
			state: RwLock::new(PolicyState::default()),
			ready: AtomicBool::new(false),
			write_gate: Mutex::new(()),
		})
	}

	/// Default model with the built-in `keyMatch` and `regexMatch` matchers.
	pub fn with_defaults(adapter: Arc<dyn PolicyAdapter>) -> Result<Self> {
		Self::new(
			PolicyModel::default(),
			&MatcherRegistry::with_defaults(),
			adapter,
		)
	}

	pub fn model(&self) -> &PolicyModel {
		&self.model
	}

	pub fn is_ready(&self) -> bool {
		self.ready.load(Ordering::Acquire)
	}

	/// Replaces the in-memory state with everything the adapter holds and marks
	/// the enforcer ready. Returns the number of rules loaded.
	#[instrument(skip(self))]
	pub async fn load(&self) -> Result<usize> {
		let _gate = self.write_gate.lock().await;

		let rules = self.adapter.load_policy().await?;
		let count = rules.len();

		for rule in &rules {
			if let PolicyRule::Permission(p) = rule {
				if let Err(e) = self.action_matcher.validate(&p.action) {
					warn!(rule = %rule, error = %e, "stored rule has an unusable action pattern");
				}
			}
		}

		*self.write_state() = PolicyState::from_rules(rules);
		self.ready.store(true, Ordering::Release);

		info!(rules = count, "policy loaded");
		Ok(count)
	}

	/// Decides whether `subject` may perform `action` on `resource`.
	///
	/// `Ok(false)` is an ordinary deny. `Err` means the decision could not be
	/// made (not ready, or a stored pattern is malformed).
	pub fn enforce(&self, subject: &str, resource: &str, action: &str) -> Result<bool> {
		self.ensure_ready()?;

		let state = self.read_state();
		let subjects = state.subject_closure(subject, self.model.max_role_depth);

		for permission in &state.permissions {
			if !permission.applies_to_everyone() && !subjects.contains(permission.subject.as_str()) {
				continue;
			}
			if !self
				.resource_matcher
				.matches(resource, &permission.resource)?
			{
				continue;
			}
			if !self.action_matcher.matches(action, &permission.action)? {
				continue;
			}

			debug!(
				subject,
				resource,
				action,
				rule_subject = %permission.subject,
				rule_resource = %permission.resource,
				"policy matched"
			);
			return Ok(true);
		}

		debug!(subject, resource, action, "no policy matched");
		Ok(false)
	}

	/// Adds a permission rule. Returns `false` if it already existed.
	#[instrument(skip(self))]
	pub async fn add_policy(&self, subject: &str, resource: &str, action: &str) -> Result<bool> {
		let permission = Permission::new(subject, resource, action)?;
		self.action_matcher.validate(&permission.action)?;
		self.insert(permission.into()).await
	}

	/// Removes a permission rule. Returns `false` if it did not exist.
	#[instrument(skip(self))]
	pub async fn remove_policy(&self, subject: &str, resource: &str, action: &str) -> Result<bool> {
		let permission = Permission::new(subject, resource, action)?;
		self.delete(permission.into()).await
	}

	/// Assigns `role` to `user`. Returns `false` if the assignment existed.
	#[instrument(skip(self))]
	pub async fn add_grouping_policy(&self, user: &str, role: &str) -> Result<bool> {
		let binding = RoleBinding::new(user, role)?;
		self.insert(binding.into()).await
	}

	/// Removes `role` from `user`. Returns `false` if it was not assigned.
	#[instrument(skip(self))]
	pub async fn remove_grouping_policy(&self, user: &str, role: &str) -> Result<bool> {
		let binding = RoleBinding::new(user, role)?;
		self.delete(binding.into()).await
	}

	/// Roles assigned directly to `user`, sorted.
	pub fn roles_for_user(&self, user: &str) -> Vec<String> {
		self
			.read_state()
			.roles
			.get(user)
			.map(|roles| roles.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Roles reachable from `user` through the grouping relation, sorted.
	pub fn implicit_roles_for_user(&self, user: &str) -> Vec<String> {
		let state = self.read_state();
		let mut roles: Vec<String> = state
			.subject_closure(user, self.model.max_role_depth)
			.into_iter()
			.filter(|s| *s != user)
			.map(str::to_string)
			.collect();
		roles.sort_unstable();
		roles
	}

	/// Whether some grouping rule binds a member to `name` as a role.
	pub fn is_role_name(&self, name: &str) -> bool {
		self
			.read_state()
			.roles
			.values()
			.any(|roles| roles.contains(name))
	}

	/// Whether `name` appears anywhere in the policy set, as the wildcard,
	/// a permission subject, a grouping member or a grouping role.
	pub fn is_known_subject(&self, name: &str) -> bool {
		if name == WILDCARD_SUBJECT {
			return true;
		}
		let state = self.read_state();
		state.permissions.iter().any(|p| p.subject == name)
			|| state.roles.contains_key(name)
			|| state.roles.values().any(|roles| roles.contains(name))
	}

	/// Snapshot of every permission rule in load order.
	pub fn policies(&self) -> Vec<Permission> {
		self.read_state().permissions.clone()
	}

	/// Snapshot of every role assignment, sorted by user then role.
	pub fn grouping_policies(&self) -> Vec<RoleBinding> {
		let state = self.read_state();
		let mut bindings: Vec<RoleBinding> = state
			.roles
			.iter()
			.flat_map(|(user, roles)| {
				roles.iter().map(move |role| RoleBinding {
					user: user.clone(),
					role: role.clone(),
				})
			})
			.collect();
		bindings.sort_by(|a, b| (&a.user, &a.role).cmp(&(&b.user, &b.role)));
		bindings
	}

	async fn insert(&self, rule: PolicyRule) -> Result<bool> {
		self.ensure_ready()?;
		let _gate = self.write_gate.lock().await;

		let exists = self.read_state().contains(&rule);
		if exists {
			debug!(rule = %rule, "rule already present");
			return Ok(false);
		}

		if let Err(e) = self.adapter.add_policy(&rule).await {
			warn!(rule = %rule, error = %e, "failed to persist rule");
			return Err(e);
		}

		self.write_state().insert(rule.clone());
		info!(rule = %rule, "rule added");
		Ok(true)
	}

	async fn delete(&self, rule: PolicyRule) -> Result<bool> {
		self.ensure_ready()?;
		let _gate = self.write_gate.lock().await;

		let exists = self.read_state().contains(&rule);
		if !exists {
			debug!(rule = %rule, "rule not present");
			return Ok(false);
		}

		if let Err(e) = self.adapter.remove_policy(&rule).await {
			warn!(rule = %rule, error = %e, "failed to delete persisted rule");
			return Err(e);
		}

		self.write_state().remove(&rule);
		info!(rule = %rule, "rule removed");
		Ok(true)
	}

	fn ensure_ready(&self) -> Result<()> {
		if self.is_ready() {
			Ok(())
		} else {
			Err(AuthzError::NotReady)
		}
	}

	fn read_state(&self) -> RwLockReadGuard<'_, PolicyState> {
		self.state.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write_state(&self) -> RwLockWriteGuard<'_, PolicyState> {
		self.state.write().unwrap_or_else(PoisonError::into_inner)
	}
}
