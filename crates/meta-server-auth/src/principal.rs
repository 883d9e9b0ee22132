// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Principal resolution.
//!
//! ```text
//! Cookie header -> token -> SHA-256 -> SessionStore -> expiry check -> username
//! ```
//!
//! Every failure collapses to [`AuthError::Unauthenticated`] or
//! [`AuthError::SessionExpired`] for the caller. Store faults are logged here
//! and never surfaced as anything other than "not authenticated".

use std::sync::Arc;

use chrono::Duration;
use http::HeaderMap;
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use crate::error::{AuthError, Result};
use crate::middleware::{extract_session_cookie_with_name, SESSION_COOKIE_NAME};
use crate::session::{Session, DEFAULT_SESSION_TTL_HOURS};
use crate::store::SessionStore;
use crate::types::{SessionId, UserId};

/// The authenticated identity of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
	pub username: String,
	pub user_id: Option<UserId>,
	pub session_id: SessionId,
}

/// Turns request headers into a [`Principal`] via the session store.
#[derive(Clone)]
pub struct PrincipalResolver {
	store: Arc<dyn SessionStore>,
	cookie_name: String,
	ttl: Duration,
}

impl std::fmt::Debug for PrincipalResolver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PrincipalResolver")
			.field("cookie_name", &self.cookie_name)
			.field("ttl", &self.ttl)
			.finish_non_exhaustive()
	}
}

impl PrincipalResolver {
	pub fn new(store: Arc<dyn SessionStore>) -> Self {
		Self {
			store,
			cookie_name: SESSION_COOKIE_NAME.to_string(),
			ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
		}
	}

	pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
		self.cookie_name = name.into();
		self
	}

	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;
		self
	}

	pub fn cookie_name(&self) -> &str {
		&self.cookie_name
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	pub fn store(&self) -> &Arc<dyn SessionStore> {
		&self.store
	}

	/// Loads the live session referenced by the request cookie.
	///
	/// The session's expiry is slid forward and saved. A failure to save is
	/// logged and does not reject the request.
	#[instrument(name = "principal.session", skip_all)]
	pub async fn session(&self, headers: &HeaderMap) -> Result<Session> {
		let token = extract_session_cookie_with_name(headers, &self.cookie_name)
			.ok_or(AuthError::Unauthenticated)?;
		let token_hash = crate::hash_token(&token);

		let mut session = match self.store.get_by_token_hash(&token_hash).await {
			Ok(Some(session)) => session,
			Ok(None) => {
				debug!("session cookie does not match a stored session");
				return Err(AuthError::Unauthenticated);
			}
			Err(e) => {
				error!(error = %e, "session lookup failed");
				return Err(AuthError::Unauthenticated);
			}
		};

		if session.is_expired() {
			debug!(session_id = %session.id, "session expired");
			return Err(AuthError::SessionExpired);
		}

		session.extend(self.ttl);
		if let Err(e) = self.store.save(&session).await {
			warn!(session_id = %session.id, error = %e, "failed to extend session");
		}

		Ok(session)
	}

	/// Resolves the request's [`Principal`].
	#[instrument(name = "principal.resolve", skip_all, fields(username = tracing::field::Empty))]
	pub async fn resolve(&self, headers: &HeaderMap) -> Result<Principal> {
		let session = self.session(headers).await?;

		let Some(username) = session.username() else {
			debug!(session_id = %session.id, "session carries no username");
			return Err(AuthError::Unauthenticated);
		};
		tracing::Span::current().record("username", username);

		Ok(Principal {
			username: username.to_string(),
			user_id: session.user_id(),
			session_id: session.id,
		})
	}
}
