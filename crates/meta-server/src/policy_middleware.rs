// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Policy enforcement layer for the protected API surface.
//!
//! [`EnforcePolicy`] sits behind the principal layer and asks the
//! [`PolicyEnforcer`] whether the resolved principal may perform the request
//! method on the request path.
//!
//! # Decision flow
//!
//! 1. Paths outside the protected prefix pass through untouched.
//! 2. If the enforcer has not loaded its policy, the request is rejected with
//!    503 unless bootstrap mode is enabled.
//! 3. Requests without a principal are rejected with 401. The enforcer is not
//!    consulted.
//! 4. `Enforce(username, path, method)`: allowed passes through, a deny or an
//!    evaluation error is rejected with 403.
//!
//! # Security Properties
//!
//! - Decisions are logged with username, resource and action (never tokens)
//! - Evaluation errors are logged and never surfaced to the client
//! - Denials are written to the audit log as `access_denied` events
//!
//! # Example
//!
//! ```ignore
//! Router::new()
//!     .nest("/api", api_routes)
//!     .layer(EnforcePolicy::new(enforcer, "/api/").with_audit(audit_service))
//!     .layer(axum::middleware::from_fn_with_state(state, principal_layer));
//! ```

use std::{
	future::Future,
	pin::Pin,
	sync::Arc,
	task::{Context, Poll},
};

use axum::{
	body::Body,
	http::{Request, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use meta_server_audit::{AuditEventType, AuditLogEntry, AuditService};
use meta_server_auth::Principal;
use meta_server_authz::PolicyEnforcer;
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::auth_middleware::unauthorized_response;
use crate::client_info::ClientInfo;
use crate::error::ErrorResponse;

#[derive(Clone)]
pub struct EnforcePolicy {
	enforcer: Arc<PolicyEnforcer>,
	audit: Option<Arc<AuditService>>,
	protected_prefix: Arc<str>,
	bootstrap_mode: bool,
}

impl EnforcePolicy {
	pub fn new(enforcer: Arc<PolicyEnforcer>, protected_prefix: impl Into<Arc<str>>) -> Self {
		Self {
			enforcer,
			audit: None,
			protected_prefix: protected_prefix.into(),
			bootstrap_mode: false,
		}
	}

	pub fn with_audit(mut self, audit: Arc<AuditService>) -> Self {
		self.audit = Some(audit);
		self
	}

	/// Lets requests through while the enforcer is not ready.
	pub fn with_bootstrap_mode(mut self, enabled: bool) -> Self {
		self.bootstrap_mode = enabled;
		self
	}
}

impl<S> Layer<S> for EnforcePolicy {
	type Service = EnforcePolicyService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		EnforcePolicyService {
			inner,
			policy: self.clone(),
		}
	}
}

/// Service wrapper for [`EnforcePolicy`].
#[derive(Clone)]
pub struct EnforcePolicyService<S> {
	inner: S,
	policy: EnforcePolicy,
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
	Bypass,
	Allowed,
	Unavailable,
	Unauthenticated,
	Denied,
	Failed,
}

impl EnforcePolicy {
	fn decide(&self, principal: Option<&Principal>, resource: &str, action: &str) -> Decision {
		if !resource.starts_with(&*self.protected_prefix) {
			return Decision::Bypass;
		}

		if !self.enforcer.is_ready() {
			if self.bootstrap_mode {
				tracing::warn!(
					resource,
					action,
					"policy engine not ready, allowing request in bootstrap mode"
				);
				return Decision::Allowed;
			}
			tracing::warn!(resource, action, "policy engine not ready");
			return Decision::Unavailable;
		}

		let Some(principal) = principal else {
			tracing::debug!(resource, action, "policy denied: not authenticated");
			return Decision::Unauthenticated;
		};
		let username = principal.username.as_str();

		match self.enforcer.enforce(username, resource, action) {
			Ok(true) => {
				tracing::debug!(username, resource, action, "policy allowed");
				Decision::Allowed
			}
			Ok(false) => {
				tracing::info!(username, resource, action, "policy denied");
				Decision::Denied
			}
			Err(e) => {
				tracing::error!(username, resource, action, error = %e, "policy evaluation failed");
				Decision::Failed
			}
		}
	}

	fn audit_denial(&self, req: &Request<Body>, principal: Option<&Principal>, reason: &str) {
		let Some(audit) = &self.audit else {
			return;
		};

		let client = ClientInfo::from_headers(req.headers());
		let mut builder = AuditLogEntry::builder(AuditEventType::AccessDenied)
			.resource("route", req.uri().path())
			.action(req.method().as_str())
			.details(serde_json::json!({ "reason": reason }));
		if let Some(principal) = principal {
			builder = builder.actor(principal.username.as_str());
			if let Some(user_id) = principal.user_id {
				builder = builder.actor_user_id(user_id);
			}
		}
		if let Some(ip) = client.ip_address {
			builder = builder.ip_address(ip);
		}
		if let Some(ua) = client.user_agent {
			builder = builder.user_agent(ua);
		}

		audit.log(builder.build());
	}
}

impl<S> Service<Request<Body>> for EnforcePolicyService<S>
where
	S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
	S::Future: Send,
{
	type Response = Response;
	type Error = S::Error;
	type Future = EnforcePolicyFuture<S::Future>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let principal = req.extensions().get::<Principal>().cloned();
		let decision = self.policy.decide(
			principal.as_ref(),
			req.uri().path(),
			req.method().as_str(),
		);

		let resp = match decision {
			Decision::Bypass | Decision::Allowed => {
				return EnforcePolicyFuture::Inner {
					fut: self.inner.call(req),
				};
			}
			Decision::Unavailable => service_unavailable_response(),
			Decision::Unauthenticated => unauthorized_response(),
			Decision::Denied => {
				self.policy.audit_denial(&req, principal.as_ref(), "no matching policy");
				forbidden_response()
			}
			Decision::Failed => {
				self.policy.audit_denial(&req, principal.as_ref(), "policy evaluation failed");
				forbidden_response()
			}
		};

		EnforcePolicyFuture::Rejected { resp: Some(resp) }
	}
}

pin_project! {
	#[project = EnforcePolicyFutureProj]
	pub enum EnforcePolicyFuture<F> {
		Inner { #[pin] fut: F },
		Rejected { resp: Option<Response> },
	}
}

impl<F, E> Future for EnforcePolicyFuture<F>
where
	F: Future<Output = Result<Response, E>>,
{
	type Output = Result<Response, E>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match self.project() {
			EnforcePolicyFutureProj::Inner { fut } => fut.poll(cx),
			EnforcePolicyFutureProj::Rejected { resp } => {
				Poll::Ready(Ok(resp.take().unwrap_or_else(forbidden_response)))
			}
		}
	}
}

fn forbidden_response() -> Response {
	(
		StatusCode::FORBIDDEN,
		Json(ErrorResponse::new("forbidden", "Insufficient permissions")),
	)
		.into_response()
}

fn service_unavailable_response() -> Response {
	(
		StatusCode::SERVICE_UNAVAILABLE,
		Json(ErrorResponse::new(
			"service_unavailable",
			"Authorization is not available yet",
		)),
	)
		.into_response()
}
