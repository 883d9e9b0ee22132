// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read and extend the policy held by the enforcer.

use axum::{
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	Extension, Json,
};
use meta_server_audit::AuditEventType;
use meta_server_auth::Principal;
use meta_server_authz::{Permission, RoleBinding};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::audit_entry;
use crate::api::AppState;
use crate::client_info::ClientInfo;
use crate::error::ServerError;

#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyListResponse {
	pub policies: Vec<Permission>,
	pub grouping_policies: Vec<RoleBinding>,
}

#[derive(Debug, Deserialize)]
pub struct AddPolicyRequest {
	pub subject: String,
	pub resource: String,
	pub action: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddPolicyResponse {
	pub added: bool,
	pub policy: Permission,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserRolesResponse {
	pub username: String,
	pub roles: Vec<String>,
	pub implicit_roles: Vec<String>,
}

/// GET /api/policies - Snapshot of every permission and grouping rule.
pub async fn list_policies(State(state): State<AppState>) -> Json<PolicyListResponse> {
	Json(PolicyListResponse {
		policies: state.enforcer.policies(),
		grouping_policies: state.enforcer.grouping_policies(),
	})
}

/// POST /api/policies - Add a permission rule.
///
/// Answers 201 when the rule is new and 200 when it already existed. A
/// malformed action pattern is a 400.
#[instrument(skip(state, actor, headers))]
pub async fn add_policy(
	State(state): State<AppState>,
	actor: Option<Extension<Principal>>,
	headers: HeaderMap,
	Json(body): Json<AddPolicyRequest>,
) -> Result<(StatusCode, Json<AddPolicyResponse>), ServerError> {
	let policy = Permission::new(body.subject, body.resource, body.action)?;
	let added = state
		.enforcer
		.add_policy(&policy.subject, &policy.resource, &policy.action)
		.await?;

	if !added {
		return Ok((StatusCode::OK, Json(AddPolicyResponse { added, policy })));
	}

	let client = ClientInfo::from_headers(&headers);
	let actor = actor.map(|Extension(p)| p);
	state.audit_service.log(
		audit_entry(AuditEventType::PolicyAdded, actor.as_ref(), &client)
			.resource("policy", format!("{}, {}, {}", policy.subject, policy.resource, policy.action))
			.action("add")
			.details(json!({ "policy": policy }))
			.build(),
	);
	tracing::info!(
		subject = %policy.subject,
		resource = %policy.resource,
		action = %policy.action,
		"policy added"
	);

	Ok((StatusCode::CREATED, Json(AddPolicyResponse { added, policy })))
}

/// GET /api/policies/roles/{username} - Direct and inherited roles.
pub async fn roles_for_user(
	State(state): State<AppState>,
	Path(username): Path<String>,
) -> Json<UserRolesResponse> {
	Json(UserRolesResponse {
		roles: state.enforcer.roles_for_user(&username),
		implicit_roles: state.enforcer.implicit_roles_for_user(&username),
		username,
	})
}
