// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use meta_server_auth::AuthError;
use meta_server_authz::AuthzError;
use meta_server_db::DbError;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// Database error from meta-server-db.
	#[error("Database error: {0}")]
	Db(#[from] DbError),

	/// Policy engine error.
	#[error("Authorization error: {0}")]
	Authz(#[from] AuthzError),

	/// Session or credential error.
	#[error("Authentication error: {0}")]
	Auth(#[from] AuthError),

	/// The role assignment for a user mutation failed.
	#[error("Role update failed: {0}")]
	RoleUpdate(#[source] AuthzError),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	/// Invalid request payload.
	#[error("Invalid request: {0}")]
	BadRequest(String),

	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	#[error("Forbidden: {0}")]
	Forbidden(String),

	#[error("Service unavailable: {0}")]
	ServiceUnavailable(String),

	/// Internal server error.
	#[error("Internal error: {0}")]
	Internal(String),
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error: error.into(),
			message: message.into(),
		}
	}
}

fn reply(status: StatusCode, error: &str, message: impl Into<String>) -> (StatusCode, ErrorResponse) {
	(status, ErrorResponse::new(error, message))
}

fn internal() -> (StatusCode, ErrorResponse) {
	reply(
		StatusCode::INTERNAL_SERVER_ERROR,
		"internal_error",
		"An internal error occurred",
	)
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, error_response) = match &self {
			ServerError::Db(DbError::NotFound(what)) => {
				reply(StatusCode::NOT_FOUND, "not_found", format!("Not found: {what}"))
			}
			ServerError::Db(DbError::Conflict(what)) => {
				reply(StatusCode::CONFLICT, "conflict", format!("Already exists: {what}"))
			}
			ServerError::Db(e) => {
				tracing::error!(error = %e, "database error");
				internal()
			}
			ServerError::Authz(AuthzError::NotReady) => {
				tracing::warn!("policy engine not ready");
				reply(
					StatusCode::SERVICE_UNAVAILABLE,
					"service_unavailable",
					"Authorization is not available yet",
				)
			}
			ServerError::Authz(
				e @ (AuthzError::InvalidRule(_) | AuthzError::Match(_) | AuthzError::UnknownMatcher(_)),
			) => reply(StatusCode::BAD_REQUEST, "bad_request", e.to_string()),
			ServerError::Authz(e) => {
				tracing::error!(error = %e, "policy store error");
				internal()
			}
			ServerError::Auth(e) if e.is_internal() => {
				tracing::error!(error = %e, "authentication backend error");
				internal()
			}
			ServerError::Auth(AuthError::InvalidCredentials) => reply(
				StatusCode::UNAUTHORIZED,
				"unauthorized",
				"Invalid username or password",
			),
			ServerError::Auth(_) => reply(
				StatusCode::UNAUTHORIZED,
				"unauthorized",
				"Authentication required",
			),
			ServerError::RoleUpdate(e) => {
				tracing::error!(error = %e, "role assignment failed");
				reply(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal_error",
					"failed to update role",
				)
			}
			ServerError::NotFound(msg) => reply(StatusCode::NOT_FOUND, "not_found", msg.clone()),
			ServerError::Conflict(msg) => reply(StatusCode::CONFLICT, "conflict", msg.clone()),
			ServerError::BadRequest(msg) => reply(StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
			ServerError::Unauthorized(msg) => {
				tracing::warn!(error = %msg, "unauthorized");
				reply(StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
			}
			ServerError::Forbidden(msg) => reply(StatusCode::FORBIDDEN, "forbidden", msg.clone()),
			ServerError::ServiceUnavailable(msg) => {
				tracing::warn!(error = %msg, "service unavailable");
				reply(
					StatusCode::SERVICE_UNAVAILABLE,
					"service_unavailable",
					msg.clone(),
				)
			}
			ServerError::Internal(msg) => {
				tracing::error!(error = %msg, "internal error");
				internal()
			}
		};

		(status, Json(error_response)).into_response()
	}
}

pub type Result<T> = std::result::Result<T, ServerError>;
