// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
	api::AppState,
	health::{self, HealthComponents, HealthResponse, HealthStatus},
};

/// GET /healthz - Liveness plus database, policy engine and audit checks.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	use tokio::time::Instant;

	let overall_start = Instant::now();

	let (database, audit) = tokio::join!(
		health::check_database(&state.pool),
		health::check_audit(&state.audit_sinks),
	);
	let policy_engine =
		health::check_policy_engine(&state.enforcer, state.config.authz.bootstrap_mode);

	let components = HealthComponents {
		database,
		policy_engine,
		audit,
	};

	let status = health::aggregate_status(&components);
	let response = HealthResponse {
		status,
		timestamp: chrono::Utc::now().to_rfc3339(),
		duration_ms: overall_start.elapsed().as_millis() as u64,
		version: env!("CARGO_PKG_VERSION"),
		components,
	};

	let http_status = match status {
		HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
		HealthStatus::Unhealthy | HealthStatus::Unknown => StatusCode::SERVICE_UNAVAILABLE,
	};

	(http_status, Json(response))
}
