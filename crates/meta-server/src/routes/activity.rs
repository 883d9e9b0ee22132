// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-user activity history and activity statistics.

use std::collections::BTreeMap;

use axum::{
	extract::{Path, Query, State},
	Json,
};
use meta_server_db::UserActivity;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::parse_user_id;
use crate::api::AppState;
use crate::error::ServerError;

const DEFAULT_ACTIVITY_PAGE_SIZE: i64 = 20;
const DEFAULT_STATS_DAYS: i64 = 7;
const MAX_STATS_DAYS: i64 = 365;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityPageQuery {
	pub page: Option<i64>,
	pub page_size: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivityPage {
	pub activities: Vec<UserActivity>,
	pub total: i64,
	pub page: i64,
	pub page_size: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
	pub days: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivityStats {
	pub days: i64,
	pub stats: BTreeMap<String, i64>,
}

/// GET /api/users/{id}/activities - Newest first, 1-based pages.
#[instrument(skip(state))]
pub async fn user_activities(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Query(query): Query<ActivityPageQuery>,
) -> Result<Json<ActivityPage>, ServerError> {
	let user_id = parse_user_id(&id)?;
	let page = query.page.unwrap_or(1).max(1);
	let page_size = query
		.page_size
		.unwrap_or(DEFAULT_ACTIVITY_PAGE_SIZE)
		.clamp(1, 100);

	let (activities, total) = state
		.activity_repo
		.get_user_activities(&user_id, page, page_size)
		.await?;

	Ok(Json(ActivityPage {
		activities,
		total,
		page,
		page_size,
	}))
}

/// GET /api/activity/stats - Activity counts per type over the last `days`.
#[instrument(skip(state))]
pub async fn activity_stats(
	State(state): State<AppState>,
	Query(query): Query<StatsQuery>,
) -> Result<Json<ActivityStats>, ServerError> {
	let days = query
		.days
		.unwrap_or(DEFAULT_STATS_DAYS)
		.clamp(1, MAX_STATS_DAYS);
	let stats = state.activity_repo.get_activity_stats(days).await?;
	Ok(Json(ActivityStats { days, stats }))
}
