// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The policy API and how rule changes reach enforcement.

use axum::http::StatusCode;
use meta_server_authz::{Role, BASELINE_POLICIES};
use serde_json::{json, Value};

use super::support::{json_body, test_config, TestApp};

#[tokio::test]
async fn lists_baseline_and_role_bindings() {
	let app = TestApp::new().await;

	let response = app.get("/api/policies", Some(&app.fixtures.admin)).await;
	assert_eq!(response.status(), StatusCode::OK);
	let body: Value = json_body(response).await;

	assert_eq!(
		body["policies"].as_array().unwrap().len(),
		BASELINE_POLICIES.len()
	);
	let bindings = body["grouping_policies"].as_array().unwrap();
	assert!(bindings.contains(&json!({ "user": "root", "role": "Root" })));
	assert!(bindings.contains(&json!({ "user": "ivan", "role": "Inspector" })));
}

#[tokio::test]
async fn added_policy_takes_effect_immediately() {
	let app = TestApp::new().await;
	let inspector = &app.fixtures.inspector;

	let response = app
		.post("/api/stores", Some(inspector), json!({}))
		.await;
	assert_eq!(response.status(), StatusCode::FORBIDDEN);

	let rule = json!({ "subject": "Inspector", "resource": "/api/stores*", "action": "POST" });
	let response = app
		.post("/api/policies", Some(&app.fixtures.root), rule.clone())
		.await;
	assert_eq!(response.status(), StatusCode::CREATED);
	let body: Value = json_body(response).await;
	assert_eq!(body["added"], true);

	// Passes enforcement; there is no such handler.
	let response = app
		.post("/api/stores", Some(inspector), json!({}))
		.await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);

	let response = app
		.post("/api/policies", Some(&app.fixtures.root), rule)
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	let body: Value = json_body(response).await;
	assert_eq!(body["added"], false);
}

#[tokio::test]
async fn invalid_rules_are_bad_requests() {
	let app = TestApp::new().await;
	let root = &app.fixtures.root;

	let response = app
		.post(
			"/api/policies",
			Some(root),
			json!({ "subject": "", "resource": "/api/*", "action": "GET" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let response = app
		.post(
			"/api/policies",
			Some(root),
			json!({ "subject": "Inspector", "resource": "/api/*", "action": "(GET" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(
		app.state.enforcer.policies().len(),
		BASELINE_POLICIES.len()
	);
}

#[tokio::test]
async fn roles_endpoint_reports_direct_and_inherited_roles() {
	let app = TestApp::new().await;
	app
		.state
		.enforcer
		.add_grouping_policy("Admin", "Inspector")
		.await
		.unwrap();

	let response = app
		.get("/api/policies/roles/ann", Some(&app.fixtures.inspector))
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	let body: Value = json_body(response).await;
	assert_eq!(body["username"], "ann");
	assert_eq!(body["roles"], json!(["Admin"]));
	let implicit = body["implicit_roles"].as_array().unwrap();
	assert!(implicit.contains(&json!("Admin")));
	assert!(implicit.contains(&json!("Inspector")));
}

#[tokio::test]
async fn policy_survives_restart() {
	let app = TestApp::new().await;
	let rule = json!({ "subject": "Inspector", "resource": "/api/stores*", "action": "POST" });
	let response = app
		.post("/api/policies", Some(&app.fixtures.root), rule)
		.await;
	assert_eq!(response.status(), StatusCode::CREATED);

	// A second app state over the same database sees the stored rules.
	let state =
		meta_server::create_app_state(app.state.pool.clone(), &test_config())
			.await
			.unwrap();
	assert!(!state.enforcer.is_ready());
	state.enforcer.load().await.unwrap();
	assert!(state.enforcer.enforce("ivan", "/api/stores", "POST").unwrap());
	assert_eq!(state.enforcer.roles_for_user("ann"), vec![Role::Admin.as_str()]);
}
