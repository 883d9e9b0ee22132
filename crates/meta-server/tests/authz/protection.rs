// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route protection: which principal reaches which handler.

use axum::http::{Method, StatusCode};
use meta_server::error::ErrorResponse;
use serde_json::json;

use super::support::{json_body, run_authz_cases, test_config, AuthzCase, TestApp};

#[tokio::test]
async fn anonymous_requests_to_api_are_unauthorized() {
	let app = TestApp::new().await;

	let response = app.get("/api/users", None).await;
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	let body: ErrorResponse = json_body(response).await;
	assert_eq!(body.error, "unauthorized");
}

#[tokio::test]
async fn unknown_session_cookie_is_unauthorized() {
	let app = TestApp::new().await;

	let response = app
		.request_with_cookie(Method::GET, "/api/users", "meta_session=not-a-real-token")
		.await;
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_routes_skip_enforcement() {
	let app = TestApp::new().await;

	let response = app.get("/healthz", None).await;
	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn baseline_role_matrix() {
	let app = TestApp::new().await;
	let root = app.fixtures.root.clone();
	let admin = app.fixtures.admin.clone();
	let inspector = app.fixtures.inspector.clone();
	let admin_id = admin.user.id;

	// 404 means the request passed enforcement and found no route.
	let cases = vec![
		AuthzCase {
			name: "root reads users",
			method: Method::GET,
			path: "/api/users".to_string(),
			user: Some(root.clone()),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "root writes anywhere under the api",
			method: Method::POST,
			path: "/api/stores".to_string(),
			user: Some(root.clone()),
			body: Some(json!({})),
			expected_status: StatusCode::NOT_FOUND,
		},
		AuthzCase {
			name: "admin reads other resources",
			method: Method::GET,
			path: "/api/stores".to_string(),
			user: Some(admin.clone()),
			body: None,
			expected_status: StatusCode::NOT_FOUND,
		},
		AuthzCase {
			name: "admin cannot write other resources",
			method: Method::POST,
			path: "/api/stores".to_string(),
			user: Some(admin.clone()),
			body: Some(json!({})),
			expected_status: StatusCode::FORBIDDEN,
		},
		AuthzCase {
			name: "admin manages instrument types",
			method: Method::POST,
			path: "/api/instrument-types".to_string(),
			user: Some(admin.clone()),
			body: Some(json!({})),
			expected_status: StatusCode::NOT_FOUND,
		},
		AuthzCase {
			name: "inspector reads users",
			method: Method::GET,
			path: "/api/users".to_string(),
			user: Some(inspector.clone()),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "inspector cannot create users",
			method: Method::POST,
			path: "/api/users".to_string(),
			user: Some(inspector.clone()),
			body: Some(json!({ "username": "eve", "password": "password123" })),
			expected_status: StatusCode::FORBIDDEN,
		},
		AuthzCase {
			name: "inspector cannot delete users",
			method: Method::DELETE,
			path: format!("/api/users/{admin_id}"),
			user: Some(inspector.clone()),
			body: None,
			expected_status: StatusCode::FORBIDDEN,
		},
		AuthzCase {
			name: "inspector submits inspection forms",
			method: Method::POST,
			path: "/api/inspection-forms".to_string(),
			user: Some(inspector.clone()),
			body: Some(json!({})),
			expected_status: StatusCode::NOT_FOUND,
		},
		AuthzCase {
			name: "inspector cannot add policies",
			method: Method::POST,
			path: "/api/policies".to_string(),
			user: Some(inspector.clone()),
			body: Some(json!({ "subject": "Inspector", "resource": "/api/*", "action": "DELETE" })),
			expected_status: StatusCode::FORBIDDEN,
		},
		AuthzCase {
			name: "every user updates their own profile",
			method: Method::PATCH,
			path: "/api/users/profile".to_string(),
			user: Some(inspector.clone()),
			body: Some(json!({ "email": "ivan@example.com" })),
			expected_status: StatusCode::OK,
		},
	];

	run_authz_cases(&app, &cases).await;
}

#[tokio::test]
async fn query_string_is_not_part_of_the_resource() {
	let app = TestApp::new().await;
	let inspector = app.fixtures.inspector.clone();

	let cases = vec![
		AuthzCase {
			name: "read with query",
			method: Method::GET,
			path: "/api/users?limit=5&search=an".to_string(),
			user: Some(inspector.clone()),
			body: None,
			expected_status: StatusCode::OK,
		},
		AuthzCase {
			name: "write with query stays forbidden",
			method: Method::POST,
			path: "/api/users?role=Root".to_string(),
			user: Some(inspector),
			body: Some(json!({ "username": "eve", "password": "password123" })),
			expected_status: StatusCode::FORBIDDEN,
		},
	];

	run_authz_cases(&app, &cases).await;
}

#[tokio::test]
async fn denials_are_audited() {
	let app = TestApp::new().await;
	let inspector = &app.fixtures.inspector;

	let response = app.delete("/api/users/whatever", Some(inspector)).await;
	assert_eq!(response.status(), StatusCode::FORBIDDEN);
	let body: ErrorResponse = json_body(response).await;
	assert_eq!(body.error, "forbidden");

	// The audit pipeline writes asynchronously.
	let mut found = false;
	for _ in 0..50 {
		let response = app
			.get("/api/audit-logs?event_type=access_denied", Some(&app.fixtures.root))
			.await;
		assert_eq!(response.status(), StatusCode::OK);
		let page: serde_json::Value = json_body(response).await;
		found = page["logs"].as_array().is_some_and(|logs| {
			logs.iter().any(|log| log["actor"] == "ivan" && log["action"] == "DELETE")
		});
		if found {
			break;
		}
		tokio::time::sleep(std::time::Duration::from_millis(20)).await;
	}
	assert!(found, "expected an access_denied entry for ivan");
}

#[tokio::test]
async fn unloaded_policy_engine_answers_service_unavailable() {
	let app = TestApp::unbootstrapped(test_config()).await;

	let response = app.get("/api/users", None).await;
	assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
	let body: ErrorResponse = json_body(response).await;
	assert_eq!(body.error, "service_unavailable");

	let response = app.get("/healthz", None).await;
	assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn bootstrap_mode_lets_requests_through_before_load() {
	let mut config = test_config();
	config.authz.bootstrap_mode = true;
	let app = TestApp::unbootstrapped(config).await;

	let response = app.get("/api/users", None).await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = app.get("/healthz", None).await;
	assert_eq!(response.status(), StatusCode::OK);
	let health: serde_json::Value = json_body(response).await;
	assert_eq!(health["status"], "degraded");
	assert_eq!(health["components"]["policy_engine"]["ready"], false);
}
