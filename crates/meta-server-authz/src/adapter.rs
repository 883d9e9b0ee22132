// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage contract for policy rules.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::model::PolicyRule;

/// Durable backing store for the enforcer.
///
/// Implementations only need to load everything and append or delete one
/// tuple at a time. Duplicate detection happens in the enforcer.
#[async_trait]
pub trait PolicyAdapter: Send + Sync {
	async fn load_policy(&self) -> Result<Vec<PolicyRule>>;

	async fn add_policy(&self, rule: &PolicyRule) -> Result<()>;

	async fn remove_policy(&self, rule: &PolicyRule) -> Result<()>;
}

/// Process-local adapter. Rules are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
	rules: Mutex<Vec<PolicyRule>>,
}

impl MemoryAdapter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_rules(rules: impl IntoIterator<Item = PolicyRule>) -> Self {
		Self {
			rules: Mutex::new(rules.into_iter().collect()),
		}
	}

	pub async fn len(&self) -> usize {
		self.rules.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.rules.lock().await.is_empty()
	}
}

#[async_trait]
impl PolicyAdapter for MemoryAdapter {
	async fn load_policy(&self) -> Result<Vec<PolicyRule>> {
		Ok(self.rules.lock().await.clone())
	}

	async fn add_policy(&self, rule: &PolicyRule) -> Result<()> {
		let mut rules = self.rules.lock().await;
		if !rules.contains(rule) {
			rules.push(rule.clone());
		}
		Ok(())
	}

	async fn remove_policy(&self, rule: &PolicyRule) -> Result<()> {
		self.rules.lock().await.retain(|r| r != rule);
		Ok(())
	}
}
