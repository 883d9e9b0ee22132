// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};
use crate::event::{AuditEventType, AuditLogEntry, AuditSeverity};

/// Decides which entries reach the pipeline (global filter) or a sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditFilterConfig {
	pub min_severity: AuditSeverity,
	pub include_events: Option<Vec<AuditEventType>>,
	pub exclude_events: Option<Vec<AuditEventType>>,
}

impl Default for AuditFilterConfig {
	fn default() -> Self {
		Self {
			min_severity: AuditSeverity::Info,
			include_events: None,
			exclude_events: None,
		}
	}
}

impl AuditFilterConfig {
	pub fn with_min_severity(min_severity: AuditSeverity) -> Self {
		Self {
			min_severity,
			..Self::default()
		}
	}

	/// Builds the global filter from the `min_severity` configuration string.
	pub fn from_min_severity_str(min_severity: &str) -> AuditResult<Self> {
		let min_severity = min_severity
			.parse::<AuditSeverity>()
			.map_err(AuditError::ConfigError)?;
		Ok(Self::with_min_severity(min_severity))
	}

	pub fn allows(&self, entry: &AuditLogEntry) -> bool {
		if entry.severity < self.min_severity {
			return false;
		}

		if let Some(ref exclude) = self.exclude_events {
			if exclude.contains(&entry.event_type) {
				return false;
			}
		}

		if let Some(ref include) = self.include_events {
			if !include.contains(&entry.event_type) {
				return false;
			}
		}

		true
	}
}
