// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use std::sync::Arc;

use axum::{
	middleware::from_fn_with_state,
	routing::{get, patch, post},
	Router,
};
use meta_server_audit::{
	AuditFilterConfig, AuditService, AuditSink, SqliteAuditSink, TracingAuditSink,
};
use meta_server_auth::PrincipalResolver;
use meta_server_authz::{MatcherRegistry, PolicyEnforcer, PolicyModel, RoleAssigner};
use meta_server_config::ServerConfig;
use meta_server_db::{
	ActivityRepository, AuditRepository, PolicyRepository, SessionRepository, UserRepository,
};
use sqlx::SqlitePool;

use crate::auth_middleware::principal_layer;
use crate::error::ServerError;
use crate::policy_middleware::EnforcePolicy;
use crate::routes;

/// Shared handles for every request handler.
///
/// Built once by [`create_app_state`]; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub enforcer: Arc<PolicyEnforcer>,
	pub role_assigner: RoleAssigner,
	pub principal_resolver: Arc<PrincipalResolver>,
	pub user_repo: Arc<UserRepository>,
	pub activity_repo: Arc<ActivityRepository>,
	pub audit_repo: Arc<AuditRepository>,
	pub audit_service: Arc<AuditService>,
	pub audit_sinks: Vec<Arc<dyn AuditSink>>,
	pub config: Arc<ServerConfig>,
}

/// Wires repositories, the policy engine and the audit pipeline together.
///
/// The enforcer is returned unloaded; [`crate::bootstrap::bootstrap`] loads
/// it. Until then protected routes answer 503 (or pass in bootstrap mode).
pub async fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> Result<AppState, ServerError> {
	let model = PolicyModel::default().with_max_role_depth(config.authz.max_role_depth);
	let enforcer = Arc::new(PolicyEnforcer::new(
		model,
		&MatcherRegistry::with_defaults(),
		Arc::new(PolicyRepository::new(pool.clone())),
	)?);
	let role_assigner = RoleAssigner::new(Arc::clone(&enforcer), config.authz.bootstrap_mode);

	let principal_resolver = Arc::new(
		PrincipalResolver::new(Arc::new(SessionRepository::new(pool.clone())))
			.with_cookie_name(config.auth.session_cookie_name.clone())
			.with_ttl(chrono::Duration::hours(config.auth.session_ttl_hours)),
	);

	let audit_filter = AuditFilterConfig::from_min_severity_str(&config.audit.min_severity)
		.map_err(|e| ServerError::Internal(e.to_string()))?;
	let audit_sinks: Vec<Arc<dyn AuditSink>> = if config.audit.enabled {
		vec![
			Arc::new(SqliteAuditSink::new(pool.clone(), audit_filter.clone())),
			Arc::new(TracingAuditSink::new(audit_filter.clone())),
		]
	} else {
		tracing::info!("audit logging disabled");
		Vec::new()
	};
	let audit_service = Arc::new(AuditService::new(
		audit_filter,
		config.audit.queue_capacity,
		config.audit.queue_overflow_policy,
		audit_sinks.clone(),
	));

	Ok(AppState {
		user_repo: Arc::new(UserRepository::new(pool.clone())),
		activity_repo: Arc::new(ActivityRepository::new(pool.clone())),
		audit_repo: Arc::new(AuditRepository::new(pool.clone())),
		pool,
		enforcer,
		role_assigner,
		principal_resolver,
		audit_service,
		audit_sinks,
		config: Arc::new(config.clone()),
	})
}

pub fn create_router(state: AppState) -> Router {
	// Public routes - no session required
	let public = Router::new()
		.route("/healthz", get(routes::health::health_check))
		.route("/auth/login", post(routes::auth::login))
		.route("/auth/logout", post(routes::auth::logout))
		.route("/auth/me", get(routes::auth::me));

	// Policy-protected routes - every request passes EnforcePolicy
	let api = Router::new()
		.route(
			"/api/users",
			post(routes::users::create_user).get(routes::users::list_users),
		)
		.route("/api/users/profile", patch(routes::users::update_profile))
		.route(
			"/api/users/{id}",
			patch(routes::users::update_user).delete(routes::users::delete_user),
		)
		.route(
			"/api/users/{id}/activities",
			get(routes::activity::user_activities),
		)
		.route("/api/activity/stats", get(routes::activity::activity_stats))
		.route("/api/audit-logs", get(routes::audit::query_audit_logs))
		.route(
			"/api/policies",
			get(routes::policies::list_policies).post(routes::policies::add_policy),
		)
		.route(
			"/api/policies/roles/{username}",
			get(routes::policies::roles_for_user),
		);

	let enforce = EnforcePolicy::new(
		Arc::clone(&state.enforcer),
		state.config.authz.protected_prefix.as_str(),
	)
	.with_audit(Arc::clone(&state.audit_service))
	.with_bootstrap_mode(state.config.authz.bootstrap_mode);

	public
		.merge(api)
		.layer(enforce)
		.layer(from_fn_with_state(state.clone(), principal_layer))
		.with_state(state)
}
