// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read side of the audit log. Rows are written by
//! `meta_server_audit::SqliteAuditSink`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use meta_server_audit::{AuditEventType, AuditLogEntry, AuditSeverity};
use serde::Deserialize;
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;

use crate::error::Result;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Filters for [`AuditStore::query_logs`]. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogQuery {
	pub event_type: Option<String>,
	pub actor: Option<String>,
	pub actor_user_id: Option<String>,
	pub resource_type: Option<String>,
	pub resource_id: Option<String>,
	pub from: Option<DateTime<Utc>>,
	pub to: Option<DateTime<Utc>>,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

#[async_trait]
pub trait AuditStore: Send + Sync {
	async fn query_logs(&self, query: &AuditLogQuery) -> Result<(Vec<AuditLogEntry>, i64)>;
	async fn cleanup_old_logs(&self, retention_days: i64) -> Result<u64>;
}

pub struct AuditRepository {
	pool: SqlitePool,
}

impl AuditRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Returns one page of matching entries, newest first, and the total
	/// number of matches.
	#[tracing::instrument(skip(self))]
	pub async fn query_logs(&self, query: &AuditLogQuery) -> Result<(Vec<AuditLogEntry>, i64)> {
		let limit = query
			.limit
			.unwrap_or(DEFAULT_PAGE_SIZE)
			.clamp(1, MAX_PAGE_SIZE);
		let offset = query.offset.unwrap_or(0).max(0);

		let mut conditions = vec!["1=1"];
		let mut binds: Vec<String> = Vec::new();
		let text_filters = [
			("event_type = ?", &query.event_type),
			("actor = ?", &query.actor),
			("actor_user_id = ?", &query.actor_user_id),
			("resource_type = ?", &query.resource_type),
			("resource_id = ?", &query.resource_id),
		];
		for (condition, value) in text_filters {
			if let Some(v) = value {
				conditions.push(condition);
				binds.push(v.clone());
			}
		}
		if let Some(from) = query.from {
			conditions.push("timestamp >= ?");
			binds.push(from.to_rfc3339());
		}
		if let Some(to) = query.to {
			conditions.push("timestamp <= ?");
			binds.push(to.to_rfc3339());
		}

		let where_clause = conditions.join(" AND ");

		let count_sql = format!("SELECT COUNT(*) as cnt FROM audit_logs WHERE {where_clause}");
		let mut count_query = sqlx::query(&count_sql);
		for v in &binds {
			count_query = count_query.bind(v);
		}
		let total: i64 = count_query.fetch_one(&self.pool).await?.get("cnt");

		let data_sql = format!(
			"SELECT id, timestamp, event_type, severity, actor, actor_user_id, \
			 resource_type, resource_id, action, ip_address, user_agent, details \
			 FROM audit_logs WHERE {where_clause} ORDER BY timestamp DESC LIMIT ? OFFSET ?"
		);
		let mut data_query = sqlx::query(&data_sql);
		for v in &binds {
			data_query = data_query.bind(v);
		}
		data_query = data_query.bind(limit).bind(offset);

		let rows = data_query.fetch_all(&self.pool).await?;
		let logs: Vec<AuditLogEntry> = rows
			.into_iter()
			.filter_map(|row| {
				let id_str: String = row.get("id");
				let id = Uuid::parse_str(&id_str).ok()?;

				let ts_str: String = row.get("timestamp");
				let timestamp = DateTime::parse_from_rfc3339(&ts_str)
					.map(|dt| dt.with_timezone(&Utc))
					.unwrap_or_else(|_| Utc::now());

				let event_type_str: String = row.get("event_type");
				let event_type = event_type_str.parse::<AuditEventType>().ok()?;

				let severity_str: String = row.get("severity");
				let severity = severity_str
					.parse::<AuditSeverity>()
					.unwrap_or_else(|_| event_type.default_severity());

				let actor_user_id: Option<String> = row.get("actor_user_id");
				let details_str: Option<String> = row.get("details");

				Some(AuditLogEntry {
					id,
					timestamp,
					event_type,
					severity,
					actor: row.get("actor"),
					actor_user_id: actor_user_id.and_then(|s| s.parse().ok()),
					resource_type: row.get("resource_type"),
					resource_id: row.get("resource_id"),
					action: row.get("action"),
					ip_address: row.get("ip_address"),
					user_agent: row.get("user_agent"),
					details: details_str
						.and_then(|s| serde_json::from_str(&s).ok())
						.unwrap_or(serde_json::Value::Null),
				})
			})
			.collect();

		Ok((logs, total))
	}

	/// Deletes entries older than `retention_days`.
	#[tracing::instrument(skip(self))]
	pub async fn cleanup_old_logs(&self, retention_days: i64) -> Result<u64> {
		let cutoff = Utc::now() - Duration::days(retention_days);
		let result = sqlx::query("DELETE FROM audit_logs WHERE timestamp < ?")
			.bind(cutoff.to_rfc3339())
			.execute(&self.pool)
			.await?;

		let removed = result.rows_affected();
		if removed > 0 {
			tracing::info!(removed, retention_days, "old audit logs removed");
		}
		Ok(removed)
	}
}

#[async_trait]
impl AuditStore for AuditRepository {
	async fn query_logs(&self, query: &AuditLogQuery) -> Result<(Vec<AuditLogEntry>, i64)> {
		self.query_logs(query).await
	}

	async fn cleanup_old_logs(&self, retention_days: i64) -> Result<u64> {
		self.cleanup_old_logs(retention_days).await
	}
}
