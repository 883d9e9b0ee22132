// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health check types and component checking logic.

use std::sync::Arc;
use std::time::Duration;

use meta_server_audit::{check_sink, AuditSink};
use meta_server_authz::PolicyEnforcer;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::time::{timeout, Instant};

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Health status for components and overall system.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
	Unknown,
}

/// Database component health.
#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
	pub status: HealthStatus,
	pub latency_ms: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PolicyEngineHealth {
	pub status: HealthStatus,
	pub ready: bool,
	pub rules: usize,
	pub bootstrap_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct AuditHealth {
	pub status: HealthStatus,
	pub sinks: usize,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub failing: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
	pub database: DatabaseHealth,
	pub policy_engine: PolicyEngineHealth,
	pub audit: AuditHealth,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: HealthStatus,
	pub timestamp: String,
	pub duration_ms: u64,
	pub version: &'static str,
	pub components: HealthComponents,
}

pub async fn check_database(pool: &SqlitePool) -> DatabaseHealth {
	let start = Instant::now();

	let result = timeout(
		DB_CHECK_TIMEOUT,
		sqlx::query("SELECT 1").execute(pool),
	)
	.await;
	let latency_ms = start.elapsed().as_millis() as u64;

	match result {
		Ok(Ok(_)) => DatabaseHealth {
			status: HealthStatus::Healthy,
			latency_ms,
			error: None,
		},
		Ok(Err(e)) => DatabaseHealth {
			status: HealthStatus::Unhealthy,
			latency_ms,
			error: Some(e.to_string()),
		},
		Err(_) => DatabaseHealth {
			status: HealthStatus::Unhealthy,
			latency_ms,
			error: Some("database health check timed out".to_string()),
		},
	}
}

/// An unloaded engine is unhealthy, or degraded when bootstrap mode lets
/// requests through anyway.
pub fn check_policy_engine(enforcer: &PolicyEnforcer, bootstrap_mode: bool) -> PolicyEngineHealth {
	let ready = enforcer.is_ready();
	let status = match (ready, bootstrap_mode) {
		(true, _) => HealthStatus::Healthy,
		(false, true) => HealthStatus::Degraded,
		(false, false) => HealthStatus::Unhealthy,
	};

	PolicyEngineHealth {
		status,
		ready,
		rules: enforcer.policies().len() + enforcer.grouping_policies().len(),
		bootstrap_mode,
	}
}

pub async fn check_audit(sinks: &[Arc<dyn AuditSink>]) -> AuditHealth {
	let mut failing = Vec::new();
	for sink in sinks {
		if let Err(e) = check_sink(sink.as_ref()).await {
			tracing::warn!(sink = sink.name(), error = %e, "audit sink unhealthy");
			failing.push(sink.name().to_string());
		}
	}

	AuditHealth {
		status: if failing.is_empty() {
			HealthStatus::Healthy
		} else {
			HealthStatus::Degraded
		},
		sinks: sinks.len(),
		failing,
	}
}

/// Worst component status; degraded components do not fail the check.
pub fn aggregate_status(components: &HealthComponents) -> HealthStatus {
	let statuses = [
		components.database.status,
		components.policy_engine.status,
		components.audit.status,
	];

	if statuses.contains(&HealthStatus::Unhealthy) {
		HealthStatus::Unhealthy
	} else if statuses.contains(&HealthStatus::Unknown) {
		HealthStatus::Unknown
	} else if statuses.contains(&HealthStatus::Degraded) {
		HealthStatus::Degraded
	} else {
		HealthStatus::Healthy
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use meta_server_authz::MemoryAdapter;

	fn components(db: HealthStatus, engine: HealthStatus, audit: HealthStatus) -> HealthComponents {
		HealthComponents {
			database: DatabaseHealth {
				status: db,
				latency_ms: 1,
				error: None,
			},
			policy_engine: PolicyEngineHealth {
				status: engine,
				ready: engine == HealthStatus::Healthy,
				rules: 0,
				bootstrap_mode: false,
			},
			audit: AuditHealth {
				status: audit,
				sinks: 0,
				failing: Vec::new(),
			},
		}
	}

	#[test]
	fn worst_status_wins() {
		use HealthStatus::*;
		assert_eq!(aggregate_status(&components(Healthy, Healthy, Healthy)), Healthy);
		assert_eq!(aggregate_status(&components(Healthy, Healthy, Degraded)), Degraded);
		assert_eq!(aggregate_status(&components(Healthy, Unhealthy, Degraded)), Unhealthy);
	}

	#[tokio::test]
	async fn engine_status_follows_readiness() {
		let enforcer = PolicyEnforcer::with_defaults(Arc::new(MemoryAdapter::new())).unwrap();
		assert_eq!(check_policy_engine(&enforcer, false).status, HealthStatus::Unhealthy);
		assert_eq!(check_policy_engine(&enforcer, true).status, HealthStatus::Degraded);

		enforcer.load().await.unwrap();
		assert_eq!(check_policy_engine(&enforcer, false).status, HealthStatus::Healthy);
	}

	#[tokio::test]
	async fn database_check_reports_latency() {
		let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
		let health = check_database(&pool).await;
		assert_eq!(health.status, HealthStatus::Healthy);
		assert!(health.error.is_none());

		pool.close().await;
		let health = check_database(&pool).await;
		assert_eq!(health.status, HealthStatus::Unhealthy);
	}

	#[tokio::test]
	async fn no_sinks_is_healthy() {
		let health = check_audit(&[]).await;
		assert_eq!(health.status, HealthStatus::Healthy);
		assert_eq!(health.sinks, 0);
	}
}
