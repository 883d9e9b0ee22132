// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy rule repository.
//!
//! Backs the policy enforcer: every stored row is one `(ptype, v0, v1, v2)`
//! tuple and the table's unique constraint makes inserts idempotent.

use async_trait::async_trait;
use chrono::Utc;
use meta_server_authz::{AuthzError, PolicyAdapter, PolicyRule};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::{DbError, Result};

#[derive(Clone)]
pub struct PolicyRepository {
	pool: SqlitePool,
}

impl PolicyRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Returns every stored rule in insertion order.
	///
	/// Rows that no longer form a valid rule are skipped with a warning.
	#[tracing::instrument(skip(self))]
	pub async fn list_rules(&self) -> Result<Vec<PolicyRule>> {
		let rows = sqlx::query("SELECT ptype, v0, v1, v2 FROM policy_rules ORDER BY id")
			.fetch_all(&self.pool)
			.await?;

		let rules = rows
			.into_iter()
			.filter_map(|row| {
				let ptype: String = row.get("ptype");
				let v0: String = row.get("v0");
				let v1: String = row.get("v1");
				let v2: String = row.get("v2");
				match PolicyRule::from_parts(&ptype, &v0, &v1, &v2) {
					Ok(rule) => Some(rule),
					Err(e) => {
						tracing::warn!(%ptype, %v0, %v1, %v2, error = %e, "skipping invalid policy row");
						None
					}
				}
			})
			.collect();

		Ok(rules)
	}

	/// Inserts `rule`, returning `false` if the tuple was already stored.
	#[tracing::instrument(skip(self, rule), fields(rule = %rule))]
	pub async fn insert_rule(&self, rule: &PolicyRule) -> Result<bool> {
		let [v0, v1, v2] = rule.values();
		let result = sqlx::query(
			r#"
			INSERT OR IGNORE INTO policy_rules (ptype, v0, v1, v2, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(rule.policy_type().as_str())
		.bind(v0)
		.bind(v1)
		.bind(v2)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self, rule), fields(rule = %rule))]
	pub async fn delete_rule(&self, rule: &PolicyRule) -> Result<bool> {
		let [v0, v1, v2] = rule.values();
		let result =
			sqlx::query("DELETE FROM policy_rules WHERE ptype = ? AND v0 = ? AND v1 = ? AND v2 = ?")
				.bind(rule.policy_type().as_str())
				.bind(v0)
				.bind(v1)
				.bind(v2)
				.execute(&self.pool)
				.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_rules(&self) -> Result<i64> {
		let row = sqlx::query("SELECT COUNT(*) AS cnt FROM policy_rules")
			.fetch_one(&self.pool)
			.await?;
		Ok(row.get("cnt"))
	}
}

fn adapter_error(e: DbError) -> AuthzError {
	AuthzError::Adapter(e.to_string())
}

#[async_trait]
impl PolicyAdapter for PolicyRepository {
	async fn load_policy(&self) -> meta_server_authz::Result<Vec<PolicyRule>> {
		self.list_rules().await.map_err(adapter_error)
	}

	async fn add_policy(&self, rule: &PolicyRule) -> meta_server_authz::Result<()> {
		self.insert_rule(rule).await.map(|_| ()).map_err(adapter_error)
	}

	async fn remove_policy(&self, rule: &PolicyRule) -> meta_server_authz::Result<()> {
		self.delete_rule(rule).await.map(|_| ()).map_err(adapter_error)
	}
}
