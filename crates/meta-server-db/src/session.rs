// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session repository.
//!
//! Sessions are looked up by the SHA-256 hash of the cookie token; the raw
//! token never reaches the database.

use async_trait::async_trait;
use chrono::Utc;
use meta_server_auth::{AuthError, Session, SessionId, SessionStore};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::{DbError, Result};
use crate::parse_timestamp;

#[derive(Clone)]
pub struct SessionRepository {
	pool: SqlitePool,
}

impl SessionRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, session, token_hash), fields(session_id = %session.id))]
	pub async fn create_session(&self, session: &Session, token_hash: &str) -> Result<()> {
		let data = serde_json::to_string(&session.data)?;
		sqlx::query(
			r#"
			INSERT INTO sessions (
				id, token_hash, data, created_at, last_used_at, expires_at,
				ip_address, user_agent
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(session.id.to_string())
		.bind(token_hash)
		.bind(data)
		.bind(session.created_at.to_rfc3339())
		.bind(session.last_used_at.to_rfc3339())
		.bind(session.expires_at.to_rfc3339())
		.bind(&session.ip_address)
		.bind(&session.user_agent)
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::from_insert(e, "session"))?;

		Ok(())
	}

	#[tracing::instrument(skip(self, token_hash))]
	pub async fn get_session_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>> {
		let row = sqlx::query(
			r#"
			SELECT id, data, created_at, last_used_at, expires_at, ip_address, user_agent
			FROM sessions
			WHERE token_hash = ?
			"#,
		)
		.bind(token_hash)
		.fetch_optional(&self.pool)
		.await?;

		let Some(row) = row else {
			return Ok(None);
		};

		let id: String = row.get("id");
		let id = id
			.parse::<SessionId>()
			.map_err(|e| DbError::Internal(format!("invalid session id {id}: {e}")))?;
		let data: String = row.get("data");

		Ok(Some(Session {
			id,
			data: serde_json::from_str(&data)?,
			created_at: parse_timestamp(row.get("created_at"))?,
			last_used_at: parse_timestamp(row.get("last_used_at"))?,
			expires_at: parse_timestamp(row.get("expires_at"))?,
			ip_address: row.get("ip_address"),
			user_agent: row.get("user_agent"),
		}))
	}

	/// Persists the session data and its sliding expiry.
	#[tracing::instrument(skip(self, session), fields(session_id = %session.id))]
	pub async fn update_session(&self, session: &Session) -> Result<()> {
		let data = serde_json::to_string(&session.data)?;
		let result = sqlx::query(
			r#"
			UPDATE sessions
			SET data = ?, last_used_at = ?, expires_at = ?
			WHERE id = ?
			"#,
		)
		.bind(data)
		.bind(session.last_used_at.to_rfc3339())
		.bind(session.expires_at.to_rfc3339())
		.bind(session.id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("session {}", session.id)));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_session(&self, id: &SessionId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	/// Deletes every session whose data names `username`.
	#[tracing::instrument(skip(self))]
	pub async fn delete_sessions_for_user(&self, username: &str) -> Result<u64> {
		let result = sqlx::query("DELETE FROM sessions WHERE json_extract(data, '$.username') = ?")
			.bind(username)
			.execute(&self.pool)
			.await?;

		let removed = result.rows_affected();
		if removed > 0 {
			tracing::info!(removed, "user sessions removed");
		}
		Ok(removed)
	}

	#[tracing::instrument(skip(self))]
	pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
			.bind(&now)
			.execute(&self.pool)
			.await?;

		let removed = result.rows_affected();
		if removed > 0 {
			tracing::info!(removed, "expired sessions removed");
		}
		Ok(removed)
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_sessions(&self) -> Result<i64> {
		let row = sqlx::query("SELECT COUNT(*) AS cnt FROM sessions")
			.fetch_one(&self.pool)
			.await?;
		Ok(row.get("cnt"))
	}
}

fn store_error(e: DbError) -> AuthError {
	AuthError::Store(e.to_string())
}

#[async_trait]
impl SessionStore for SessionRepository {
	async fn create(&self, session: &Session, token_hash: &str) -> meta_server_auth::Result<()> {
		self
			.create_session(session, token_hash)
			.await
			.map_err(store_error)
	}

	async fn get_by_token_hash(&self, token_hash: &str) -> meta_server_auth::Result<Option<Session>> {
		self
			.get_session_by_token_hash(token_hash)
			.await
			.map_err(store_error)
	}

	async fn save(&self, session: &Session) -> meta_server_auth::Result<()> {
		self.update_session(session).await.map_err(store_error)
	}

	async fn destroy(&self, id: &SessionId) -> meta_server_auth::Result<bool> {
		self.delete_session(id).await.map_err(store_error)
	}

	async fn destroy_for_user(&self, username: &str) -> meta_server_auth::Result<u64> {
		self
			.delete_sessions_for_user(username)
			.await
			.map_err(store_error)
	}

	async fn cleanup_expired(&self) -> meta_server_auth::Result<u64> {
		self.cleanup_expired_sessions().await.map_err(store_error)
	}
}
