// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User activity log: logins, logouts, role changes and profile edits, keyed
//! by user.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use meta_server_auth::UserId;
use serde::{Deserialize, Serialize};
use sqlx::{
	sqlite::{SqlitePool, SqliteRow},
	Row,
};

use crate::error::{DbError, Result};
use crate::parse_timestamp;

/// Activity names written by the server.
pub mod activities {
	pub const LOGIN: &str = "login";
	pub const LOGOUT: &str = "logout";
	pub const ROLE_CHANGED: &str = "role_changed";
	pub const PROFILE_UPDATED: &str = "profile_updated";
	pub const PASSWORD_CHANGED: &str = "password_changed";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserActivity {
	pub id: i64,
	pub user_id: UserId,
	pub activity: String,
	pub details: String,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	pub created_at: DateTime<Utc>,
}

/// Input for [`ActivityStore::log_activity`].
#[derive(Debug, Clone)]
pub struct NewActivity<'a> {
	pub user_id: &'a UserId,
	pub activity: &'a str,
	pub details: &'a str,
	pub ip_address: Option<&'a str>,
	pub user_agent: Option<&'a str>,
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
	async fn log_activity(&self, activity: NewActivity<'_>) -> Result<i64>;
	async fn get_user_activities(
		&self,
		user_id: &UserId,
		page: i64,
		page_size: i64,
	) -> Result<(Vec<UserActivity>, i64)>;
	async fn get_activities_by_time_range(
		&self,
		start: DateTime<Utc>,
		end: DateTime<Utc>,
	) -> Result<Vec<UserActivity>>;
	async fn get_activity_stats(&self, days: i64) -> Result<BTreeMap<String, i64>>;
	async fn cleanup_old_logs(&self, days: i64) -> Result<u64>;
}

fn activity_from_row(row: &SqliteRow) -> Result<UserActivity> {
	let user_id: String = row.get("user_id");
	let user_id = user_id
		.parse::<UserId>()
		.map_err(|e| DbError::Internal(format!("invalid user id {user_id}: {e}")))?;

	Ok(UserActivity {
		id: row.get("id"),
		user_id,
		activity: row.get("activity"),
		details: row.get("details"),
		ip_address: row.get("ip_address"),
		user_agent: row.get("user_agent"),
		created_at: parse_timestamp(row.get("created_at"))?,
	})
}

const ACTIVITY_COLUMNS: &str = "id, user_id, activity, details, ip_address, user_agent, created_at";

#[derive(Clone)]
pub struct ActivityRepository {
	pool: SqlitePool,
}

impl ActivityRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, activity), fields(user_id = %activity.user_id, activity = activity.activity))]
	pub async fn log_activity(&self, activity: NewActivity<'_>) -> Result<i64> {
		let result = sqlx::query(
			r#"
			INSERT INTO user_activity_logs (
				user_id, activity, details, ip_address, user_agent, created_at
			) VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(activity.user_id.to_string())
		.bind(activity.activity)
		.bind(activity.details)
		.bind(activity.ip_address)
		.bind(activity.user_agent)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(result.last_insert_rowid())
	}

	/// One page of a user's activities, newest first. `page` is 1-based.
	#[tracing::instrument(skip(self))]
	pub async fn get_user_activities(
		&self,
		user_id: &UserId,
		page: i64,
		page_size: i64,
	) -> Result<(Vec<UserActivity>, i64)> {
		let page = page.max(1);
		let page_size = page_size.clamp(1, 1000);
		let offset = (page - 1) * page_size;

		let total: i64 =
			sqlx::query("SELECT COUNT(*) AS cnt FROM user_activity_logs WHERE user_id = ?")
				.bind(user_id.to_string())
				.fetch_one(&self.pool)
				.await?
				.get("cnt");

		let sql = format!(
			"SELECT {ACTIVITY_COLUMNS} FROM user_activity_logs WHERE user_id = ? \
			 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
		);
		let rows = sqlx::query(&sql)
			.bind(user_id.to_string())
			.bind(page_size)
			.bind(offset)
			.fetch_all(&self.pool)
			.await?;

		let activities = rows
			.iter()
			.map(activity_from_row)
			.collect::<Result<Vec<_>>>()?;
		Ok((activities, total))
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_activities_by_time_range(
		&self,
		start: DateTime<Utc>,
		end: DateTime<Utc>,
	) -> Result<Vec<UserActivity>> {
		let sql = format!(
			"SELECT {ACTIVITY_COLUMNS} FROM user_activity_logs \
			 WHERE created_at BETWEEN ? AND ? ORDER BY created_at DESC, id DESC"
		);
		let rows = sqlx::query(&sql)
			.bind(start.to_rfc3339())
			.bind(end.to_rfc3339())
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(activity_from_row).collect()
	}

	/// Counts per activity name over the last `days` days.
	#[tracing::instrument(skip(self))]
	pub async fn get_activity_stats(&self, days: i64) -> Result<BTreeMap<String, i64>> {
		let since = Utc::now() - Duration::days(days);
		let rows = sqlx::query(
			r#"
			SELECT activity, COUNT(*) AS cnt
			FROM user_activity_logs
			WHERE created_at >= ?
			GROUP BY activity
			"#,
		)
		.bind(since.to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		Ok(rows
			.iter()
			.map(|row| (row.get("activity"), row.get("cnt")))
			.collect())
	}

	/// Deletes activities older than `days` days.
	#[tracing::instrument(skip(self))]
	pub async fn cleanup_old_logs(&self, days: i64) -> Result<u64> {
		let cutoff = Utc::now() - Duration::days(days);
		let result = sqlx::query("DELETE FROM user_activity_logs WHERE created_at < ?")
			.bind(cutoff.to_rfc3339())
			.execute(&self.pool)
			.await?;

		let removed = result.rows_affected();
		if removed > 0 {
			tracing::info!(removed, days, "old activity logs removed");
		}
		Ok(removed)
	}
}

#[async_trait]
impl ActivityStore for ActivityRepository {
	async fn log_activity(&self, activity: NewActivity<'_>) -> Result<i64> {
		self.log_activity(activity).await
	}

	async fn get_user_activities(
		&self,
		user_id: &UserId,
		page: i64,
		page_size: i64,
	) -> Result<(Vec<UserActivity>, i64)> {
		self.get_user_activities(user_id, page, page_size).await
	}

	async fn get_activities_by_time_range(
		&self,
		start: DateTime<Utc>,
		end: DateTime<Utc>,
	) -> Result<Vec<UserActivity>> {
		self.get_activities_by_time_range(start, end).await
	}

	async fn get_activity_stats(&self, days: i64) -> Result<BTreeMap<String, i64>> {
		self.get_activity_stats(days).await
	}

	async fn cleanup_old_logs(&self, days: i64) -> Result<u64> {
		self.cleanup_old_logs(days).await
	}
}
