// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP route handlers.

pub mod activity;
pub mod audit;
pub mod auth;
pub mod health;
pub mod policies;
pub mod users;

use meta_server_audit::{AuditEventType, AuditLogBuilder, AuditLogEntry};
use meta_server_auth::{Principal, UserId};

use crate::client_info::ClientInfo;
use crate::error::ServerError;

/// Starts an audit entry attributed to `actor` with the request's client
/// metadata.
pub(crate) fn audit_entry(
	event_type: AuditEventType,
	actor: Option<&Principal>,
	client: &ClientInfo,
) -> AuditLogBuilder {
	let mut builder = AuditLogEntry::builder(event_type);
	if let Some(principal) = actor {
		builder = builder.actor(principal.username.as_str());
		if let Some(user_id) = principal.user_id {
			builder = builder.actor_user_id(user_id);
		}
	}
	if let Some(ip) = &client.ip_address {
		builder = builder.ip_address(ip.as_str());
	}
	if let Some(ua) = &client.user_agent {
		builder = builder.user_agent(ua.as_str());
	}
	builder
}

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, ServerError> {
	raw
		.parse::<UserId>()
		.map_err(|_| ServerError::BadRequest(format!("invalid user id '{raw}'")))
}
