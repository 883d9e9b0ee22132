// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Level;

use super::{AuditSink, AuditSinkError};
use crate::event::{AuditLogEntry, AuditSeverity};
use crate::filter::AuditFilterConfig;

/// Emits every entry as a structured `tracing` event under the `meta_audit`
/// target.
pub struct TracingAuditSink {
	filter: AuditFilterConfig,
}

impl TracingAuditSink {
	pub fn new(filter: AuditFilterConfig) -> Self {
		Self { filter }
	}
}

pub fn severity_to_level(severity: AuditSeverity) -> Level {
	match severity {
		AuditSeverity::Debug => Level::DEBUG,
		AuditSeverity::Info | AuditSeverity::Notice => Level::INFO,
		AuditSeverity::Warning => Level::WARN,
		AuditSeverity::Error | AuditSeverity::Critical => Level::ERROR,
	}
}

macro_rules! emit_audit_event {
	($macro:ident, $entry:ident, $details:ident) => {
		tracing::$macro!(
			target: "meta_audit",
			event_type = %$entry.event_type,
			severity = %$entry.severity,
			id = %$entry.id,
			timestamp = %$entry.timestamp.to_rfc3339(),
			action = %$entry.action,
			actor = $entry.actor.as_deref(),
			actor_user_id = $entry.actor_user_id.map(|u| u.to_string()),
			resource_type = $entry.resource_type.as_deref(),
			resource_id = $entry.resource_id.as_deref(),
			ip_address = $entry.ip_address.as_deref(),
			user_agent = $entry.user_agent.as_deref(),
			details = $details,
			"audit event"
		)
	};
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		"tracing"
	}

	fn filter(&self) -> &AuditFilterConfig {
		&self.filter
	}

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		let details = if entry.details.is_null() {
			None
		} else {
			Some(entry.details.to_string())
		};

		match severity_to_level(entry.severity) {
			Level::DEBUG => emit_audit_event!(debug, entry, details),
			Level::INFO => emit_audit_event!(info, entry, details),
			Level::WARN => emit_audit_event!(warn, entry, details),
			Level::ERROR => emit_audit_event!(error, entry, details),
			Level::TRACE => emit_audit_event!(trace, entry, details),
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::AuditEventType;

	#[test]
	fn severity_to_level_mappings() {
		assert_eq!(severity_to_level(AuditSeverity::Debug), Level::DEBUG);
		assert_eq!(severity_to_level(AuditSeverity::Info), Level::INFO);
		assert_eq!(severity_to_level(AuditSeverity::Notice), Level::INFO);
		assert_eq!(severity_to_level(AuditSeverity::Warning), Level::WARN);
		assert_eq!(severity_to_level(AuditSeverity::Error), Level::ERROR);
		assert_eq!(severity_to_level(AuditSeverity::Critical), Level::ERROR);
	}

	#[test]
	fn tracing_sink_name_and_filter() {
		let sink = TracingAuditSink::new(AuditFilterConfig::with_min_severity(AuditSeverity::Warning));
		assert_eq!(sink.name(), "tracing");
		assert_eq!(sink.filter().min_severity, AuditSeverity::Warning);
	}

	#[tokio::test]
	async fn publish_never_fails() {
		let sink = TracingAuditSink::new(AuditFilterConfig::default());
		for severity in AuditSeverity::all() {
			let entry = AuditLogEntry::builder(AuditEventType::AccessDenied)
				.severity(*severity)
				.actor("alice")
				.resource("route", "/api/users")
				.details(serde_json::json!({ "method": "DELETE" }))
				.build();
			assert!(sink.publish(Arc::new(entry)).await.is_ok());
		}
	}
}
