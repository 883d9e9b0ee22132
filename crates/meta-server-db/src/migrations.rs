// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::Result;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"001_policy_rules",
		include_str!("../migrations/001_policy_rules.sql"),
	),
	("002_users", include_str!("../migrations/002_users.sql")),
	("003_sessions", include_str!("../migrations/003_sessions.sql")),
	(
		"004_audit_logs",
		include_str!("../migrations/004_audit_logs.sql"),
	),
	(
		"005_user_activity_logs",
		include_str!("../migrations/005_user_activity_logs.sql"),
	),
];

/// Applies every embedded migration. Safe to run on every start.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	for (name, sql) in MIGRATIONS {
		for stmt in sql.split(';').filter(|s| !s.trim().is_empty()) {
			if let Err(e) = sqlx::query(stmt).execute(pool).await {
				let msg = e.to_string();
				if !msg.contains("already exists") && !msg.contains("duplicate column") {
					return Err(e.into());
				}
			}
		}
		tracing::debug!(migration = name, "migration applied");
	}

	tracing::info!(count = MIGRATIONS.len(), "database migrations complete");
	Ok(())
}
