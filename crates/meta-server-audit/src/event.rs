// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core event types for audit logging.
//!
//! - [`AuditEventType`]: every auditable event
//! - [`AuditSeverity`]: RFC 5424-compatible severity levels
//! - [`AuditLogEntry`]: a complete audit record
//! - [`AuditLogBuilder`]: fluent construction of entries

use chrono::{DateTime, Utc};
use meta_server_auth::UserId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default retention period for audit logs in days.
pub const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 90;

/// Types of events that can be recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
	// Authentication events
	Login,
	Logout,
	LoginFailed,

	// Session lifecycle
	SessionCreated,
	SessionExpired,

	// Authorization decisions
	AccessGranted,
	AccessDenied,

	// User management
	UserCreated,
	UserUpdated,
	UserDeleted,
	RoleChanged,
	PasswordChanged,
	ProfileUpdated,

	// Policy administration
	PolicyAdded,
	PolicyRemoved,
}

impl AuditEventType {
	pub fn all() -> &'static [AuditEventType] {
		&[
			AuditEventType::Login,
			AuditEventType::Logout,
			AuditEventType::LoginFailed,
			AuditEventType::SessionCreated,
			AuditEventType::SessionExpired,
			AuditEventType::AccessGranted,
			AuditEventType::AccessDenied,
			AuditEventType::UserCreated,
			AuditEventType::UserUpdated,
			AuditEventType::UserDeleted,
			AuditEventType::RoleChanged,
			AuditEventType::PasswordChanged,
			AuditEventType::ProfileUpdated,
			AuditEventType::PolicyAdded,
			AuditEventType::PolicyRemoved,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AuditEventType::Login => "login",
			AuditEventType::Logout => "logout",
			AuditEventType::LoginFailed => "login_failed",
			AuditEventType::SessionCreated => "session_created",
			AuditEventType::SessionExpired => "session_expired",
			AuditEventType::AccessGranted => "access_granted",
			AuditEventType::AccessDenied => "access_denied",
			AuditEventType::UserCreated => "user_created",
			AuditEventType::UserUpdated => "user_updated",
			AuditEventType::UserDeleted => "user_deleted",
			AuditEventType::RoleChanged => "role_changed",
			AuditEventType::PasswordChanged => "password_changed",
			AuditEventType::ProfileUpdated => "profile_updated",
			AuditEventType::PolicyAdded => "policy_added",
			AuditEventType::PolicyRemoved => "policy_removed",
		}
	}

	/// Severity used when the builder is not given one explicitly.
	pub fn default_severity(&self) -> AuditSeverity {
		match self {
			AuditEventType::AccessGranted => AuditSeverity::Debug,

			AuditEventType::Login
			| AuditEventType::Logout
			| AuditEventType::SessionCreated
			| AuditEventType::SessionExpired
			| AuditEventType::ProfileUpdated => AuditSeverity::Info,

			AuditEventType::UserCreated
			| AuditEventType::UserUpdated
			| AuditEventType::UserDeleted
			| AuditEventType::RoleChanged
			| AuditEventType::PasswordChanged
			| AuditEventType::PolicyAdded
			| AuditEventType::PolicyRemoved => AuditSeverity::Notice,

			AuditEventType::LoginFailed | AuditEventType::AccessDenied => AuditSeverity::Warning,
		}
	}
}

impl fmt::Display for AuditEventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditEventType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AuditEventType::all()
			.iter()
			.copied()
			.find(|t| t.as_str() == s)
			.ok_or_else(|| format!("unknown audit event type: {s}"))
	}
}

/// Severity levels for audit events, compatible with RFC 5424 syslog.
///
/// The numeric values are the syslog severity codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
	Debug = 7,
	#[default]
	Info = 6,
	Notice = 5,
	Warning = 4,
	Error = 3,
	Critical = 2,
}

impl AuditSeverity {
	/// Returns the RFC 5424 numeric severity code.
	pub fn as_syslog_code(&self) -> u8 {
		*self as u8
	}

	/// Returns all severity levels from least to most severe.
	pub fn all() -> &'static [AuditSeverity] {
		&[
			AuditSeverity::Debug,
			AuditSeverity::Info,
			AuditSeverity::Notice,
			AuditSeverity::Warning,
			AuditSeverity::Error,
			AuditSeverity::Critical,
		]
	}
}

impl PartialOrd for AuditSeverity {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for AuditSeverity {
	fn cmp(&self, other: &Self) -> Ordering {
		// Lower numeric value = higher severity (Critical=2 > Debug=7)
		(*other as u8).cmp(&(*self as u8))
	}
}

impl fmt::Display for AuditSeverity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AuditSeverity::Debug => "debug",
			AuditSeverity::Info => "info",
			AuditSeverity::Notice => "notice",
			AuditSeverity::Warning => "warning",
			AuditSeverity::Error => "error",
			AuditSeverity::Critical => "critical",
		};
		f.write_str(s)
	}
}

impl FromStr for AuditSeverity {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lowered = s.trim().to_ascii_lowercase();
		AuditSeverity::all()
			.iter()
			.copied()
			.find(|sev| sev.to_string() == lowered)
			.ok_or_else(|| format!("unknown audit severity: {s}"))
	}
}

/// An entry in the audit log recording a security-relevant event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
	pub id: Uuid,
	pub timestamp: DateTime<Utc>,
	pub event_type: AuditEventType,
	pub severity: AuditSeverity,

	/// Username of the principal that caused the event.
	pub actor: Option<String>,
	pub actor_user_id: Option<UserId>,

	/// The entity affected, e.g. `user`, `policy`, `route`.
	pub resource_type: Option<String>,
	pub resource_id: Option<String>,

	pub action: String,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	/// Event-specific details. Entity updates carry a `changes` object.
	pub details: serde_json::Value,
}

impl AuditLogEntry {
	pub fn builder(event_type: AuditEventType) -> AuditLogBuilder {
		AuditLogBuilder::new(event_type)
	}
}

#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
	event_type: AuditEventType,
	severity: Option<AuditSeverity>,
	actor: Option<String>,
	actor_user_id: Option<UserId>,
	resource_type: Option<String>,
	resource_id: Option<String>,
	action: Option<String>,
	ip_address: Option<String>,
	user_agent: Option<String>,
	details: serde_json::Value,
}

impl AuditLogBuilder {
	pub fn new(event_type: AuditEventType) -> Self {
		Self {
			event_type,
			severity: None,
			actor: None,
			actor_user_id: None,
			resource_type: None,
			resource_id: None,
			action: None,
			ip_address: None,
			user_agent: None,
			details: serde_json::Value::Null,
		}
	}

	pub fn severity(mut self, severity: AuditSeverity) -> Self {
		self.severity = Some(severity);
		self
	}

	pub fn actor(mut self, username: impl Into<String>) -> Self {
		self.actor = Some(username.into());
		self
	}

	pub fn actor_user_id(mut self, user_id: UserId) -> Self {
		self.actor_user_id = Some(user_id);
		self
	}

	pub fn resource(
		mut self,
		resource_type: impl Into<String>,
		resource_id: impl Into<String>,
	) -> Self {
		self.resource_type = Some(resource_type.into());
		self.resource_id = Some(resource_id.into());
		self
	}

	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.details = details;
		self
	}

	pub fn build(self) -> AuditLogEntry {
		AuditLogEntry {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			event_type: self.event_type,
			severity: self
				.severity
				.unwrap_or_else(|| self.event_type.default_severity()),
			actor: self.actor,
			actor_user_id: self.actor_user_id,
			resource_type: self.resource_type,
			resource_id: self.resource_id,
			action: self.action.unwrap_or_else(|| self.event_type.to_string()),
			ip_address: self.ip_address,
			user_agent: self.user_agent,
			details: self.details,
		}
	}
}
