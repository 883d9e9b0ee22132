// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password login, logout and the current-session endpoint.

use axum::{
	extract::State,
	http::{header::SET_COOKIE, HeaderMap, StatusCode},
	response::IntoResponse,
	Json,
};
use meta_server_audit::AuditEventType;
use meta_server_auth::{
	clear_session_cookie, generate_session_token, hash_token, session_cookie, verify_password,
	AuthError, Principal, Session, UserId,
};
use meta_server_authz::Role;
use meta_server_db::{activities, NewActivity};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::audit_entry;
use crate::api::AppState;
use crate::auth_middleware::RequireAuth;
use crate::client_info::ClientInfo;
use crate::error::ServerError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
	pub username: String,
	pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
	pub username: String,
	pub user_id: UserId,
	pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
	pub username: String,
	pub user_id: Option<UserId>,
	pub roles: Vec<String>,
}

/// POST /auth/login - Verify credentials and start a session.
#[instrument(skip_all, fields(username = tracing::field::Empty))]
pub async fn login(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServerError> {
	let client = ClientInfo::from_headers(&headers);
	tracing::Span::current().record("username", body.username.as_str());

	let user = state
		.user_repo
		.get_user_by_username(&body.username)
		.await?
		.filter(|u| u.can_login() && verify_password(&body.password, &u.password_hash));

	let Some(user) = user else {
		tracing::info!("login failed");
		state.audit_service.log(
			audit_entry(AuditEventType::LoginFailed, None, &client)
				.actor(body.username.as_str())
				.action("login")
				.build(),
		);
		return Err(AuthError::InvalidCredentials.into());
	};

	let ttl = state.principal_resolver.ttl();
	let mut session = Session::for_user(&user.username, user.id, ttl);
	if let Some(ip) = &client.ip_address {
		session = session.with_ip(ip.as_str());
	}
	if let Some(ua) = &client.user_agent {
		session = session.with_user_agent(ua.as_str());
	}

	let token = generate_session_token();
	state
		.principal_resolver
		.store()
		.create(&session, &hash_token(&token))
		.await?;

	state
		.activity_repo
		.log_activity(NewActivity {
			user_id: &user.id,
			activity: activities::LOGIN,
			details: "",
			ip_address: client.ip_address.as_deref(),
			user_agent: client.user_agent.as_deref(),
		})
		.await?;

	let principal = Principal {
		username: user.username.clone(),
		user_id: Some(user.id),
		session_id: session.id,
	};
	state.audit_service.log(
		audit_entry(AuditEventType::Login, Some(&principal), &client)
			.resource("session", session.id.to_string())
			.action("login")
			.build(),
	);
	tracing::info!(user_id = %user.id, "login succeeded");

	let cookie = session_cookie(
		state.principal_resolver.cookie_name(),
		&token,
		ttl.num_seconds(),
		state.config.auth.secure_cookie,
	);

	Ok((
		[(SET_COOKIE, cookie)],
		Json(LoginResponse {
			username: user.username,
			user_id: user.id,
			role: user.role,
		}),
	))
}

/// POST /auth/logout - Destroy the current session, if any, and clear the
/// cookie.
#[instrument(skip(state, headers))]
pub async fn logout(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<impl IntoResponse, ServerError> {
	let client = ClientInfo::from_headers(&headers);

	if let Ok(session) = state.principal_resolver.session(&headers).await {
		state.principal_resolver.store().destroy(&session.id).await?;

		if let Some(user_id) = session.user_id() {
			state
				.activity_repo
				.log_activity(NewActivity {
					user_id: &user_id,
					activity: activities::LOGOUT,
					details: "",
					ip_address: client.ip_address.as_deref(),
					user_agent: client.user_agent.as_deref(),
				})
				.await?;
		}

		let principal = session.username().map(|username| Principal {
			username: username.to_string(),
			user_id: session.user_id(),
			session_id: session.id,
		});
		state.audit_service.log(
			audit_entry(AuditEventType::Logout, principal.as_ref(), &client)
				.resource("session", session.id.to_string())
				.action("logout")
				.build(),
		);
	}

	let cookie = clear_session_cookie(
		state.principal_resolver.cookie_name(),
		state.config.auth.secure_cookie,
	);
	Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]))
}

/// GET /auth/me - The signed-in user and the roles the policy engine
/// resolves for them.
pub async fn me(
	State(state): State<AppState>,
	RequireAuth(principal): RequireAuth,
) -> Json<MeResponse> {
	Json(MeResponse {
		roles: state.enforcer.implicit_roles_for_user(&principal.username),
		username: principal.username,
		user_id: principal.user_id,
	})
}
