// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Startup: policy load, baseline seeding and the bootstrap root account.

use meta_server_auth::hash_password;
use meta_server_authz::{seed_baseline, Role};
use meta_server_db::{DbError, User};
use tracing::{info, instrument, warn};

use crate::api::AppState;
use crate::error::ServerError;

/// Loads the stored policy, seeds the baseline rules when configured and
/// makes sure the configured root account exists.
///
/// On success the enforcer is ready.
#[instrument(skip(state))]
pub async fn bootstrap(state: &AppState) -> Result<(), ServerError> {
	let loaded = state.enforcer.load().await?;
	info!(rules = loaded, "policy engine ready");

	if state.config.authz.seed_baseline {
		seed_baseline(&state.enforcer).await?;
	}

	ensure_root_user(state).await
}

/// Creates the configured root account if no user holds its username, and
/// (re)grants it the `Root` role either way.
#[instrument(skip(state))]
async fn ensure_root_user(state: &AppState) -> Result<(), ServerError> {
	let auth = &state.config.auth;
	let (Some(username), Some(password)) = (
		auth.bootstrap_root_username.as_deref(),
		auth.bootstrap_root_password.as_deref(),
	) else {
		return Ok(());
	};

	match state.user_repo.get_user_by_username(username).await? {
		Some(user) if user.deleted => {
			warn!(username, "bootstrap root user was deleted; not recreating it");
			return Ok(());
		}
		Some(_) => {}
		None => {
			let user = User::new(username, hash_password(password)?, None, Role::Root);
			match state.user_repo.create_user(&user).await {
				Ok(()) => info!(username, "bootstrap root user created"),
				// Another instance created it first.
				Err(DbError::Conflict(_)) => {}
				Err(e) => return Err(e.into()),
			}
		}
	}

	state
		.role_assigner
		.assign_role(username, Role::Root.as_str())
		.await?;
	Ok(())
}
