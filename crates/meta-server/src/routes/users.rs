// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User management.
//!
//! Every mutation that touches a user's role goes through the
//! [`RoleAssigner`](meta_server_authz::RoleAssigner) before the response is
//! sent, so the policy engine and the `users.role` column agree.

use axum::{
	extract::{Path, Query, State},
	http::{HeaderMap, StatusCode},
	Extension, Json,
};
use meta_server_audit::AuditEventType;
use meta_server_auth::{hash_password, verify_password, Principal};
use meta_server_authz::Role;
use meta_server_db::{activities, NewActivity, User, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::instrument;

use super::{audit_entry, parse_user_id};
use crate::api::AppState;
use crate::auth_middleware::RequireAuth;
use crate::client_info::ClientInfo;
use crate::error::ServerError;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
	pub username: String,
	pub password: String,
	pub email: Option<String>,
	/// Defaults to `Inspector`.
	pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
	pub limit: Option<i64>,
	pub offset: Option<i64>,
	pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListUsersResponse {
	pub users: Vec<User>,
	pub total: i64,
	pub limit: i64,
	pub offset: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
	pub email: Option<String>,
	pub password: Option<String>,
	pub current_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
	pub email: Option<String>,
	pub role: Option<Role>,
	pub active: Option<bool>,
}

fn validate_password(password: &str) -> Result<(), ServerError> {
	if password.chars().count() < MIN_PASSWORD_LEN {
		return Err(ServerError::BadRequest(format!(
			"password must be at least {MIN_PASSWORD_LEN} characters"
		)));
	}
	Ok(())
}

fn normalize_email(email: Option<String>) -> Option<String> {
	email
		.map(|e| e.trim().to_string())
		.filter(|e| !e.is_empty())
}

/// POST /api/users - Create a user and assign their role.
///
/// If the role assignment fails the new row is removed again and the request
/// fails with `failed to update role`.
///
/// Names of built-in roles, the wildcard subject and any subject already in
/// the policy set are rejected.
#[instrument(skip_all, fields(username = tracing::field::Empty))]
pub async fn create_user(
	State(state): State<AppState>,
	actor: Option<Extension<Principal>>,
	headers: HeaderMap,
	Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ServerError> {
	let username = body.username.trim();
	tracing::Span::current().record("username", username);
	if username.is_empty() {
		return Err(ServerError::BadRequest("username must not be empty".to_string()));
	}
	if Role::is_reserved_name(username) {
		return Err(ServerError::BadRequest(format!("username '{username}' is reserved")));
	}
	if state.user_repo.get_user_by_username(username).await?.is_some() {
		return Err(ServerError::Conflict(format!("user '{username}' already exists")));
	}
	// A new user sharing a name with a policy subject would inherit its grants.
	if state.role_assigner.enforcer().is_known_subject(username) {
		return Err(ServerError::BadRequest(format!("username '{username}' is reserved")));
	}
	validate_password(&body.password)?;

	let role = body.role.unwrap_or_default();
	let user = User::new(
		username,
		hash_password(&body.password)?,
		normalize_email(body.email),
		role,
	);
	state.user_repo.create_user(&user).await?;

	if let Err(e) = state.role_assigner.assign_role(&user.username, role.as_str()).await {
		if let Err(cleanup) = state.user_repo.delete_user(&user.id).await {
			tracing::error!(
				user_id = %user.id,
				error = %cleanup,
				"failed to remove user after role assignment failure"
			);
		}
		return Err(ServerError::RoleUpdate(e));
	}

	let client = ClientInfo::from_headers(&headers);
	let actor = actor.map(|Extension(p)| p);
	state.audit_service.log(
		audit_entry(AuditEventType::UserCreated, actor.as_ref(), &client)
			.resource("user", user.id.to_string())
			.action("create")
			.details(json!({ "username": user.username, "role": role.as_str() }))
			.build(),
	);
	tracing::info!(user_id = %user.id, role = %role, "user created");

	Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users - List users that are not deleted.
#[instrument(skip(state))]
pub async fn list_users(
	State(state): State<AppState>,
	Query(query): Query<ListUsersQuery>,
) -> Result<Json<ListUsersResponse>, ServerError> {
	let limit = query
		.limit
		.unwrap_or(DEFAULT_PAGE_SIZE)
		.clamp(1, MAX_PAGE_SIZE);
	let offset = query.offset.unwrap_or(0).max(0);

	let (users, total) = state
		.user_repo
		.list_users(limit, offset, query.search.as_deref())
		.await?;

	Ok(Json(ListUsersResponse {
		users,
		total,
		limit,
		offset,
	}))
}

/// PATCH /api/users/profile - Update the caller's own email or password.
///
/// Changing the password requires the current one.
#[instrument(skip_all, fields(username = tracing::field::Empty))]
pub async fn update_profile(
	State(state): State<AppState>,
	RequireAuth(principal): RequireAuth,
	headers: HeaderMap,
	Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ServerError> {
	tracing::Span::current().record("username", principal.username.as_str());
	let mut user = state
		.user_repo
		.get_user_by_username(&principal.username)
		.await?
		.filter(|u| !u.deleted)
		.ok_or_else(|| ServerError::NotFound(format!("user {}", principal.username)))?;
	let client = ClientInfo::from_headers(&headers);

	if let Some(email) = body.email {
		let email = normalize_email(Some(email));
		if email != user.email {
			let previous = std::mem::replace(&mut user.email, email);
			state.user_repo.update_user(&user).await?;

			state
				.activity_repo
				.log_activity(NewActivity {
					user_id: &user.id,
					activity: activities::PROFILE_UPDATED,
					details: "email",
					ip_address: client.ip_address.as_deref(),
					user_agent: client.user_agent.as_deref(),
				})
				.await?;
			state.audit_service.log(
				audit_entry(AuditEventType::ProfileUpdated, Some(&principal), &client)
					.resource("user", user.id.to_string())
					.action("update_profile")
					.details(json!({ "changes": { "email": [previous, user.email] } }))
					.build(),
			);
		}
	}

	if let Some(password) = body.password {
		let current = body.current_password.unwrap_or_default();
		if !verify_password(&current, &user.password_hash) {
			return Err(ServerError::BadRequest(
				"current password is incorrect".to_string(),
			));
		}
		validate_password(&password)?;

		let hash = hash_password(&password)?;
		state.user_repo.update_password(&user.id, &hash).await?;
		user.password_hash = hash;

		state
			.activity_repo
			.log_activity(NewActivity {
				user_id: &user.id,
				activity: activities::PASSWORD_CHANGED,
				details: "",
				ip_address: client.ip_address.as_deref(),
				user_agent: client.user_agent.as_deref(),
			})
			.await?;
		state.audit_service.log(
			audit_entry(AuditEventType::PasswordChanged, Some(&principal), &client)
				.resource("user", user.id.to_string())
				.action("change_password")
				.build(),
		);
	}

	Ok(Json(user))
}

/// PATCH /api/users/{id} - Update email, active flag or role.
///
/// A role change replaces every previous role binding of the user. The
/// binding is changed first; if that fails nothing is written.
///
/// Deactivating a user ends every session they hold.
#[instrument(skip(state, actor, headers, body))]
pub async fn update_user(
	State(state): State<AppState>,
	actor: Option<Extension<Principal>>,
	Path(id): Path<String>,
	headers: HeaderMap,
	Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>, ServerError> {
	let id = parse_user_id(&id)?;
	let mut user = state
		.user_repo
		.get_user_by_id(&id)
		.await?
		.filter(|u| !u.deleted)
		.ok_or_else(|| ServerError::NotFound(format!("user {id}")))?;

	let mut changes = Map::new();

	if let Some(email) = body.email {
		let email = normalize_email(Some(email));
		if email != user.email {
			changes.insert("email".into(), json!([user.email, email]));
			user.email = email;
		}
	}
	let deactivated = user.active && body.active == Some(false);
	if let Some(active) = body.active {
		if active != user.active {
			changes.insert("active".into(), json!([user.active, active]));
			user.active = active;
		}
	}

	let role_change = body.role.filter(|role| *role != user.role);
	if let Some(role) = role_change {
		state
			.role_assigner
			.replace_role(&user.username, role.as_str())
			.await
			.map_err(ServerError::RoleUpdate)?;
		changes.insert("role".into(), json!([user.role.as_str(), role.as_str()]));
		user.role = role;
	}

	if changes.is_empty() {
		return Ok(Json(user));
	}
	state.user_repo.update_user(&user).await?;

	if deactivated {
		let ended = state
			.principal_resolver
			.store()
			.destroy_for_user(&user.username)
			.await?;
		tracing::info!(user_id = %user.id, sessions = ended, "sessions ended on deactivation");
	}

	let client = ClientInfo::from_headers(&headers);
	let actor = actor.map(|Extension(p)| p);

	if let Some(role) = role_change {
		state
			.activity_repo
			.log_activity(NewActivity {
				user_id: &user.id,
				activity: activities::ROLE_CHANGED,
				details: role.as_str(),
				ip_address: client.ip_address.as_deref(),
				user_agent: client.user_agent.as_deref(),
			})
			.await?;
		state.audit_service.log(
			audit_entry(AuditEventType::RoleChanged, actor.as_ref(), &client)
				.resource("user", user.id.to_string())
				.action("change_role")
				.details(json!({ "username": user.username, "role": role.as_str() }))
				.build(),
		);
	}

	state.audit_service.log(
		audit_entry(AuditEventType::UserUpdated, actor.as_ref(), &client)
			.resource("user", user.id.to_string())
			.action("update")
			.details(json!({ "changes": Value::Object(changes) }))
			.build(),
	);
	tracing::info!(user_id = %user.id, "user updated");

	Ok(Json(user))
}

/// DELETE /api/users/{id} - Revoke a user's roles, then soft-delete them and
/// end their sessions.
///
/// Roles go first so a failed revocation leaves the user intact. If the soft
/// delete fails afterwards, the user's role is granted back.
#[instrument(skip(state, actor, headers))]
pub async fn delete_user(
	State(state): State<AppState>,
	actor: Option<Extension<Principal>>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Result<StatusCode, ServerError> {
	let id = parse_user_id(&id)?;
	let user = state
		.user_repo
		.get_user_by_id(&id)
		.await?
		.filter(|u| !u.deleted)
		.ok_or_else(|| ServerError::NotFound(format!("user {id}")))?;

	let actor = actor.map(|Extension(p)| p);
	if actor.as_ref().is_some_and(|p| p.username == user.username) {
		return Err(ServerError::BadRequest(
			"cannot delete your own account".to_string(),
		));
	}

	let revoked = state
		.role_assigner
		.revoke_roles(&user.username)
		.await
		.map_err(ServerError::RoleUpdate)?;

	if let Err(e) = state.user_repo.soft_delete_user(&user.id).await {
		if let Err(restore) = state
			.role_assigner
			.assign_role(&user.username, user.role.as_str())
			.await
		{
			tracing::error!(
				user_id = %user.id,
				error = %restore,
				"failed to restore role after soft delete failure"
			);
		}
		return Err(e.into());
	}

	let sessions = state
		.principal_resolver
		.store()
		.destroy_for_user(&user.username)
		.await?;

	let client = ClientInfo::from_headers(&headers);
	state.audit_service.log(
		audit_entry(AuditEventType::UserDeleted, actor.as_ref(), &client)
			.resource("user", user.id.to_string())
			.action("delete")
			.details(json!({ "username": user.username, "roles_revoked": revoked }))
			.build(),
	);
	tracing::info!(user_id = %user.id, revoked, sessions, "user deleted");

	Ok(StatusCode::NO_CONTENT)
}
