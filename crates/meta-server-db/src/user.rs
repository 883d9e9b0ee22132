// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User repository for database operations.
//!
//! Users carry exactly one role name. The role column mirrors the grouping
//! rule held by the policy enforcer; the enforcer remains the authority for
//! access decisions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meta_server_auth::UserId;
use meta_server_authz::Role;
use serde::{Deserialize, Serialize};
use sqlx::{
	sqlite::{SqlitePool, SqliteRow},
	Row,
};

use crate::error::{DbError, Result};
use crate::parse_timestamp;

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user(&self, user: &User) -> Result<()>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>>;
	async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
	async fn list_users(
		&self,
		limit: i64,
		offset: i64,
		search: Option<&str>,
	) -> Result<(Vec<User>, i64)>;
	async fn update_user(&self, user: &User) -> Result<()>;
	async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<()>;
	async fn soft_delete_user(&self, id: &UserId) -> Result<()>;
	async fn delete_user(&self, id: &UserId) -> Result<bool>;
	async fn count_users(&self) -> Result<i64>;
}

/// A stored user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub username: String,
	#[serde(skip_serializing, default)]
	pub password_hash: String,
	pub email: Option<String>,
	pub role: Role,
	pub active: bool,
	pub deleted: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl User {
	pub fn new(
		username: impl Into<String>,
		password_hash: impl Into<String>,
		email: Option<String>,
		role: Role,
	) -> Self {
		let now = Utc::now();
		Self {
			id: UserId::generate(),
			username: username.into(),
			password_hash: password_hash.into(),
			email,
			role,
			active: true,
			deleted: false,
			created_at: now,
			updated_at: now,
		}
	}

	/// Whether the account may log in.
	pub fn can_login(&self) -> bool {
		self.active && !self.deleted
	}
}

const USER_COLUMNS: &str =
	"id, username, password_hash, email, role, active, deleted, created_at, updated_at";

fn user_from_row(row: &SqliteRow) -> Result<User> {
	let id: String = row.get("id");
	let id = id
		.parse::<UserId>()
		.map_err(|e| DbError::Internal(format!("invalid user id {id}: {e}")))?;
	let role: String = row.get("role");
	let role = role
		.parse::<Role>()
		.map_err(|e| DbError::Internal(format!("invalid role for user {id}: {e}")))?;

	Ok(User {
		id,
		username: row.get("username"),
		password_hash: row.get("password_hash"),
		email: row.get("email"),
		role,
		active: row.get::<i64, _>("active") != 0,
		deleted: row.get::<i64, _>("deleted") != 0,
		created_at: parse_timestamp(row.get("created_at"))?,
		updated_at: parse_timestamp(row.get("updated_at"))?,
	})
}

/// Repository for user database operations.
///
/// All user IDs are UUIDs stored as strings in SQLite.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// # Errors
	/// Returns `DbError::Conflict` if the username is taken.
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id, username = %user.username))]
	pub async fn create_user(&self, user: &User) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO users (
				id, username, password_hash, email, role, active, deleted,
				created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(user.id.to_string())
		.bind(&user.username)
		.bind(&user.password_hash)
		.bind(&user.email)
		.bind(user.role.as_str())
		.bind(user.active as i64)
		.bind(user.deleted as i64)
		.bind(user.created_at.to_rfc3339())
		.bind(user.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::from_insert(e, "username"))?;

		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
		let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
		let row = sqlx::query(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;
		row.as_ref().map(user_from_row).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
		let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
		let row = sqlx::query(&sql)
			.bind(username)
			.fetch_optional(&self.pool)
			.await?;
		row.as_ref().map(user_from_row).transpose()
	}

	/// Lists users that are not deleted, newest first.
	#[tracing::instrument(skip(self))]
	pub async fn list_users(
		&self,
		limit: i64,
		offset: i64,
		search: Option<&str>,
	) -> Result<(Vec<User>, i64)> {
		let pattern = search
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(|s| format!("%{s}%"));

		let where_clause = if pattern.is_some() {
			"deleted = 0 AND (username LIKE ? OR email LIKE ?)"
		} else {
			"deleted = 0"
		};

		let count_sql = format!("SELECT COUNT(*) AS cnt FROM users WHERE {where_clause}");
		let mut count_query = sqlx::query(&count_sql);
		if let Some(ref p) = pattern {
			count_query = count_query.bind(p).bind(p);
		}
		let total: i64 = count_query.fetch_one(&self.pool).await?.get("cnt");

		let data_sql = format!(
			"SELECT {USER_COLUMNS} FROM users WHERE {where_clause} \
			 ORDER BY created_at DESC, username LIMIT ? OFFSET ?"
		);
		let mut data_query = sqlx::query(&data_sql);
		if let Some(ref p) = pattern {
			data_query = data_query.bind(p).bind(p);
		}
		let rows = data_query
			.bind(limit)
			.bind(offset)
			.fetch_all(&self.pool)
			.await?;

		let users = rows.iter().map(user_from_row).collect::<Result<Vec<_>>>()?;
		Ok((users, total))
	}

	/// Writes every mutable column and bumps `updated_at`.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if no such user exists and
	/// `DbError::Conflict` if the new username is taken.
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
	pub async fn update_user(&self, user: &User) -> Result<()> {
		let result = sqlx::query(
			r#"
			UPDATE users
			SET username = ?, email = ?, role = ?, active = ?, deleted = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&user.username)
		.bind(&user.email)
		.bind(user.role.as_str())
		.bind(user.active as i64)
		.bind(user.deleted as i64)
		.bind(Utc::now().to_rfc3339())
		.bind(user.id.to_string())
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::from_insert(e, "username"))?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {}", user.id)));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self, password_hash))]
	pub async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<()> {
		let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
			.bind(password_hash)
			.bind(Utc::now().to_rfc3339())
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {id}")));
		}
		Ok(())
	}

	/// Marks the user deleted and inactive. The row is kept for audit
	/// history.
	#[tracing::instrument(skip(self))]
	pub async fn soft_delete_user(&self, id: &UserId) -> Result<()> {
		let result = sqlx::query(
			"UPDATE users SET deleted = 1, active = 0, updated_at = ? WHERE id = ? AND deleted = 0",
		)
		.bind(Utc::now().to_rfc3339())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {id}")));
		}
		Ok(())
	}

	/// Removes the row entirely. Used to undo a creation whose role
	/// assignment failed.
	#[tracing::instrument(skip(self))]
	pub async fn delete_user(&self, id: &UserId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM users WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_users(&self) -> Result<i64> {
		let row = sqlx::query("SELECT COUNT(*) AS cnt FROM users WHERE deleted = 0")
			.fetch_one(&self.pool)
			.await?;
		Ok(row.get("cnt"))
	}
}

#[async_trait]
impl UserStore for UserRepository {
	async fn create_user(&self, user: &User) -> Result<()> {
		self.create_user(user).await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
		self.get_user_by_id(id).await
	}

	async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
		self.get_user_by_username(username).await
	}

	async fn list_users(
		&self,
		limit: i64,
		offset: i64,
		search: Option<&str>,
	) -> Result<(Vec<User>, i64)> {
		self.list_users(limit, offset, search).await
	}

	async fn update_user(&self, user: &User) -> Result<()> {
		self.update_user(user).await
	}

	async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<()> {
		self.update_password(id, password_hash).await
	}

	async fn soft_delete_user(&self, id: &UserId) -> Result<()> {
		self.soft_delete_user(id).await
	}

	async fn delete_user(&self, id: &UserId) -> Result<bool> {
		self.delete_user(id).await
	}

	async fn count_users(&self) -> Result<i64> {
		self.count_users().await
	}
}
