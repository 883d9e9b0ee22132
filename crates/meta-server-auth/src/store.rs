// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The session store contract.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::session::Session;
use crate::types::SessionId;

/// Persistence for [`Session`] records.
///
/// Login, logout, `/auth/me` and the principal resolver all go through the
/// same injected store.
#[async_trait]
pub trait SessionStore: Send + Sync {
	/// Persist a new session under the hash of its cookie token.
	async fn create(&self, session: &Session, token_hash: &str) -> Result<()>;

	async fn get_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>>;

	/// Write back `data`, `last_used_at` and `expires_at`.
	async fn save(&self, session: &Session) -> Result<()>;

	/// Returns whether a session was removed.
	async fn destroy(&self, id: &SessionId) -> Result<bool>;

	/// Removes every session signed in as `username`, returning how many
	/// were deleted.
	async fn destroy_for_user(&self, username: &str) -> Result<u64>;

	/// Removes expired sessions, returning how many were deleted.
	async fn cleanup_expired(&self) -> Result<u64>;
}

/// Process-local store, used by tests and single-node development setups.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
	sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn len(&self) -> usize {
		self.sessions.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.sessions.lock().await.is_empty()
	}
}

#[async_trait]
impl SessionStore for MemorySessionStore {
	async fn create(&self, session: &Session, token_hash: &str) -> Result<()> {
		self
			.sessions
			.lock()
			.await
			.insert(token_hash.to_string(), session.clone());
		Ok(())
	}

	async fn get_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>> {
		Ok(self.sessions.lock().await.get(token_hash).cloned())
	}

	async fn save(&self, session: &Session) -> Result<()> {
		let mut sessions = self.sessions.lock().await;
		if let Some(stored) = sessions.values_mut().find(|s| s.id == session.id) {
			*stored = session.clone();
		}
		Ok(())
	}

	async fn destroy(&self, id: &SessionId) -> Result<bool> {
		let mut sessions = self.sessions.lock().await;
		let before = sessions.len();
		sessions.retain(|_, s| s.id != *id);
		Ok(sessions.len() != before)
	}

	async fn destroy_for_user(&self, username: &str) -> Result<u64> {
		let mut sessions = self.sessions.lock().await;
		let before = sessions.len();
		sessions.retain(|_, s| s.username() != Some(username));
		Ok((before - sessions.len()) as u64)
	}

	async fn cleanup_expired(&self) -> Result<u64> {
		let now = Utc::now();
		let mut sessions = self.sessions.lock().await;
		let before = sessions.len();
		sessions.retain(|_, s| s.expires_at >= now);
		Ok((before - sessions.len()) as u64)
	}
}
