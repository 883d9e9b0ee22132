// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Principal resolution for HTTP requests.
//!
//! [`principal_layer`] runs on every request. When the session cookie names a
//! live session, the resolved [`Principal`] is stored in the request
//! extensions; otherwise the request continues without one. Rejecting
//! anonymous requests is left to the policy layer and to [`RequireAuth`].

use axum::{
	body::Body,
	extract::{FromRequestParts, State},
	http::{request::Parts, Request, StatusCode},
	middleware::Next,
	response::{IntoResponse, Response},
	Json,
};
use meta_server_auth::{AuthError, Principal};
use tracing::instrument;

use crate::api::AppState;
use crate::error::ErrorResponse;

/// Resolves the session cookie into a [`Principal`] request extension.
///
/// # Security
///
/// - Tokens are hashed before lookup; raw tokens are never logged
/// - Resolution failures are logged at debug level only
#[instrument(
	name = "principal_layer",
	skip(state, request, next),
	fields(username = tracing::field::Empty)
)]
pub async fn principal_layer(
	State(state): State<AppState>,
	mut request: Request<Body>,
	next: Next,
) -> Response {
	match state.principal_resolver.resolve(request.headers()).await {
		Ok(principal) => {
			tracing::Span::current().record("username", principal.username.as_str());
			request.extensions_mut().insert(principal);
		}
		Err(AuthError::Unauthenticated) => {}
		Err(e) => {
			tracing::debug!(error = %e, "request carries no usable session");
		}
	}

	next.run(request).await
}

/// Extractor for routes that need a signed-in user but no policy check.
///
/// Rejects with 401 when the principal layer did not resolve a principal.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Principal);

impl<S> FromRequestParts<S> for RequireAuth
where
	S: Send + Sync,
{
	type Rejection = Response;

	#[instrument(name = "RequireAuth::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		match parts.extensions.get::<Principal>().cloned() {
			Some(principal) => {
				tracing::debug!(username = %principal.username, "authentication required: success");
				Ok(RequireAuth(principal))
			}
			None => {
				tracing::debug!("authentication required: no valid session");
				Err(unauthorized_response())
			}
		}
	}
}

pub(crate) fn unauthorized_response() -> Response {
	(
		StatusCode::UNAUTHORIZED,
		Json(ErrorResponse::new("unauthorized", "Authentication required")),
	)
		.into_response()
}
