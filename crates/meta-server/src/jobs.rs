// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic housekeeping.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::api::AppState;

/// Counts from one cleanup pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
	pub sessions: u64,
	pub activities: u64,
	pub audit_logs: u64,
}

/// Deletes expired sessions plus activity and audit rows older than the
/// retention window.
///
/// A failing step is logged and counted as zero; the other steps still run.
#[instrument(skip(state))]
pub async fn run_cleanup(state: &AppState) -> CleanupReport {
	let retention_days = state.config.audit.retention_days;
	let mut report = CleanupReport::default();

	match state.principal_resolver.store().cleanup_expired().await {
		Ok(n) => report.sessions = n,
		Err(e) => warn!(error = %e, "session cleanup failed"),
	}
	match state.activity_repo.cleanup_old_logs(retention_days).await {
		Ok(n) => report.activities = n,
		Err(e) => warn!(error = %e, "activity cleanup failed"),
	}
	match state.audit_repo.cleanup_old_logs(retention_days).await {
		Ok(n) => report.audit_logs = n,
		Err(e) => warn!(error = %e, "audit log cleanup failed"),
	}

	debug!(
		sessions = report.sessions,
		activities = report.activities,
		audit_logs = report.audit_logs,
		"cleanup finished"
	);
	report
}

/// Runs [`run_cleanup`] every `interval` (at least one second) until the
/// returned task is aborted.
pub fn spawn_cleanup(state: AppState, interval: Duration) -> JoinHandle<()> {
	let interval = interval.max(Duration::from_secs(1));
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		// The first tick completes immediately.
		ticker.tick().await;
		loop {
			ticker.tick().await;
			run_cleanup(&state).await;
		}
	})
}
