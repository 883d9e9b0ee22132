// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	extract::{Query, State},
	Json,
};
use meta_server_audit::AuditLogEntry;
use meta_server_db::{AuditLogQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::AppState;
use crate::error::ServerError;

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLogPage {
	pub logs: Vec<AuditLogEntry>,
	pub total: i64,
	pub limit: i64,
	pub offset: i64,
}

/// GET /api/audit-logs - Filtered audit log, newest first.
#[instrument(skip(state))]
pub async fn query_audit_logs(
	State(state): State<AppState>,
	Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditLogPage>, ServerError> {
	let (logs, total) = state.audit_repo.query_logs(&query).await?;

	Ok(Json(AuditLogPage {
		logs,
		total,
		limit: query
			.limit
			.unwrap_or(DEFAULT_PAGE_SIZE)
			.clamp(1, MAX_PAGE_SIZE),
		offset: query.offset.unwrap_or(0).max(0),
	}))
}
