// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AuditSinkError;
use crate::event::AuditLogEntry;
use crate::filter::AuditFilterConfig;
use crate::sink::AuditSink;

/// Writes entries into the `audit_logs` table.
pub struct SqliteAuditSink {
	pool: SqlitePool,
	filter: AuditFilterConfig,
	name: String,
}

impl SqliteAuditSink {
	pub fn new(pool: SqlitePool, filter: AuditFilterConfig) -> Self {
		Self {
			pool,
			filter,
			name: "sqlite".to_string(),
		}
	}
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
	fn name(&self) -> &str {
		&self.name
	}

	fn filter(&self) -> &AuditFilterConfig {
		&self.filter
	}

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		let details_json = serde_json::to_string(&entry.details)
			.map_err(|e| AuditSinkError::Permanent(format!("failed to serialize details: {e}")))?;

		let now = chrono::Utc::now();

		sqlx::query(
			r#"
			INSERT INTO audit_logs (
				id, timestamp, event_type, severity, actor, actor_user_id,
				resource_type, resource_id, action, ip_address, user_agent,
				details, created_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(entry.id.to_string())
		.bind(entry.timestamp.to_rfc3339())
		.bind(entry.event_type.to_string())
		.bind(entry.severity.to_string())
		.bind(&entry.actor)
		.bind(entry.actor_user_id.as_ref().map(|u| u.to_string()))
		.bind(&entry.resource_type)
		.bind(&entry.resource_id)
		.bind(&entry.action)
		.bind(&entry.ip_address)
		.bind(&entry.user_agent)
		.bind(&details_json)
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| {
			if is_transient_error(&e) {
				AuditSinkError::Transient(format!("database error: {e}"))
			} else {
				AuditSinkError::Permanent(format!("database error: {e}"))
			}
		})?;

		Ok(())
	}

	async fn health_check(&self) -> Result<(), AuditSinkError> {
		sqlx::query("SELECT 1")
			.execute(&self.pool)
			.await
			.map_err(|e| AuditSinkError::Transient(format!("health check failed: {e}")))?;
		Ok(())
	}
}

fn is_transient_error(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Io(_) => true,
		sqlx::Error::PoolTimedOut => true,
		sqlx::Error::PoolClosed => true,
		sqlx::Error::Database(db_err) => {
			let msg = db_err.message().to_lowercase();
			msg.contains("busy") || msg.contains("locked") || msg.contains("timeout")
		}
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::AuditEventType;
	use sqlx::Row;

	async fn audit_pool() -> SqlitePool {
		let pool = SqlitePool::connect(":memory:").await.unwrap();
		sqlx::query(
			r#"
			CREATE TABLE audit_logs (
				id TEXT PRIMARY KEY,
				timestamp TEXT NOT NULL,
				event_type TEXT NOT NULL,
				severity TEXT NOT NULL,
				actor TEXT,
				actor_user_id TEXT,
				resource_type TEXT,
				resource_id TEXT,
				action TEXT NOT NULL,
				ip_address TEXT,
				user_agent TEXT,
				details TEXT,
				created_at TEXT NOT NULL
			)
			"#,
		)
		.execute(&pool)
		.await
		.unwrap();
		pool
	}

	#[tokio::test]
	async fn publish_inserts_row() {
		let pool = audit_pool().await;
		let sink = SqliteAuditSink::new(pool.clone(), AuditFilterConfig::default());

		let entry = AuditLogEntry::builder(AuditEventType::AccessDenied)
			.actor("alice")
			.resource("route", "/api/users")
			.details(serde_json::json!({ "method": "DELETE" }))
			.build();
		let id = entry.id.to_string();
		sink.publish(Arc::new(entry)).await.unwrap();

		let row = sqlx::query("SELECT event_type, severity, actor, details FROM audit_logs WHERE id = ?")
			.bind(&id)
			.fetch_one(&pool)
			.await
			.unwrap();
		assert_eq!(row.get::<String, _>("event_type"), "access_denied");
		assert_eq!(row.get::<String, _>("severity"), "warning");
		assert_eq!(row.get::<Option<String>, _>("actor").as_deref(), Some("alice"));
		assert!(row.get::<String, _>("details").contains("DELETE"));
	}

	#[tokio::test]
	async fn missing_table_is_permanent_error() {
		let pool = SqlitePool::connect(":memory:").await.unwrap();
		let sink = SqliteAuditSink::new(pool, AuditFilterConfig::default());

		let entry = AuditLogEntry::builder(AuditEventType::Login).build();
		let err = sink.publish(Arc::new(entry)).await.unwrap_err();
		assert!(matches!(err, AuditSinkError::Permanent(_)));
	}

	#[tokio::test]
	async fn health_check_succeeds_on_open_pool() {
		let pool = SqlitePool::connect(":memory:").await.unwrap();
		let sink = SqliteAuditSink::new(pool, AuditFilterConfig::default());
		assert!(sink.health_check().await.is_ok());
	}
}
