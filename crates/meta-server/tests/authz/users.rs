// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User lifecycle and the role bindings that follow it.

use axum::http::StatusCode;
use meta_server_authz::Role;
use serde_json::{json, Value};

use super::support::{json_body, TestApp, USER_PASSWORD};

#[tokio::test]
async fn created_user_gets_requested_role() {
	let app = TestApp::new().await;
	let admin = &app.fixtures.admin;

	let response = app
		.post(
			"/api/users",
			Some(admin),
			json!({ "username": "alice", "password": "password123", "role": "Admin" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::CREATED);
	let user: Value = json_body(response).await;
	assert_eq!(user["username"], "alice");
	assert_eq!(user["role"], "Admin");
	assert!(user.get("password_hash").is_none());

	assert_eq!(app.state.enforcer.roles_for_user("alice"), vec!["Admin"]);
}

#[tokio::test]
async fn created_user_defaults_to_inspector() {
	let app = TestApp::new().await;

	let response = app
		.post(
			"/api/users",
			Some(&app.fixtures.root),
			json!({ "username": "bob", "password": "password123" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::CREATED);
	assert_eq!(app.state.enforcer.roles_for_user("bob"), vec!["Inspector"]);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
	let app = TestApp::new().await;

	let response = app
		.post(
			"/api/users",
			Some(&app.fixtures.root),
			json!({ "username": "ivan", "password": "password123" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn short_password_is_rejected() {
	let app = TestApp::new().await;

	let response = app
		.post(
			"/api/users",
			Some(&app.fixtures.root),
			json!({ "username": "carol", "password": "short" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert!(app.state.enforcer.roles_for_user("carol").is_empty());
}

#[tokio::test]
async fn demotion_removes_access_immediately() {
	let app = TestApp::new().await;
	let root = &app.fixtures.root;
	let admin = app.create_user("dana", Role::Admin).await;
	let target = app.fixtures.inspector.user.id;

	// Admins manage users; a PATCH that changes nothing is still allowed.
	let response = app
		.patch(&format!("/api/users/{target}"), Some(&admin), json!({}))
		.await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = app
		.patch(
			&format!("/api/users/{}", admin.user.id),
			Some(root),
			json!({ "role": "Inspector" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	let user: Value = json_body(response).await;
	assert_eq!(user["role"], "Inspector");
	assert_eq!(app.state.enforcer.roles_for_user("dana"), vec!["Inspector"]);

	let response = app
		.patch(&format!("/api/users/{target}"), Some(&admin), json!({}))
		.await;
	assert_eq!(response.status(), StatusCode::FORBIDDEN);

	let stored = app
		.state
		.user_repo
		.get_user_by_username("dana")
		.await
		.unwrap()
		.unwrap();
	assert_eq!(stored.role, Role::Inspector);
}

#[tokio::test]
async fn deleting_a_user_revokes_their_roles() {
	let app = TestApp::new().await;
	let victim = app.create_user("erin", Role::Admin).await;

	let response = app
		.delete(&format!("/api/users/{}", victim.user.id), Some(&app.fixtures.admin))
		.await;
	assert_eq!(response.status(), StatusCode::NO_CONTENT);
	assert!(app.state.enforcer.roles_for_user("erin").is_empty());

	// Their old session is gone.
	let response = app.get("/api/users", Some(&victim)).await;
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let response = app
		.delete(&format!("/api/users/{}", victim.user.id), Some(&app.fixtures.admin))
		.await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_role_revocation_keeps_the_user() {
	let app = TestApp::new().await;
	let victim = app.create_user("gail", Role::Admin).await;
	sqlx::query("DROP TABLE policy_rules")
		.execute(&app.state.pool)
		.await
		.unwrap();

	let response = app
		.delete(&format!("/api/users/{}", victim.user.id), Some(&app.fixtures.root))
		.await;
	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

	let stored = app
		.state
		.user_repo
		.get_user_by_id(&victim.user.id)
		.await
		.unwrap()
		.unwrap();
	assert!(!stored.deleted);
	assert_eq!(app.state.enforcer.roles_for_user("gail"), vec!["Admin"]);

	let response = app.get("/api/users", Some(&victim)).await;
	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn deactivation_ends_existing_sessions() {
	let app = TestApp::new().await;
	let target = app.create_user("frank", Role::Admin).await;
	let bystander = app.create_user("fiona", Role::Admin).await;

	let response = app.get("/api/users", Some(&target)).await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = app
		.patch(
			&format!("/api/users/{}", target.user.id),
			Some(&app.fixtures.root),
			json!({ "active": false }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = app.get("/api/users", Some(&target)).await;
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	let response = app.get("/api/users", Some(&bystander)).await;
	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn role_names_cannot_become_usernames() {
	let app = TestApp::new().await;

	for username in ["Root", "Admin", "*"] {
		let response = app
			.post(
				"/api/users",
				Some(&app.fixtures.admin),
				json!({ "username": username, "password": USER_PASSWORD, "role": "Inspector" }),
			)
			.await;
		assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{username}");
		assert!(app
			.state
			.user_repo
			.get_user_by_username(username)
			.await
			.unwrap()
			.is_none());
		assert!(app.state.enforcer.roles_for_user(username).is_empty());
	}

	app.state
		.enforcer
		.add_policy("Auditor", "/api/audit", "GET")
		.await
		.unwrap();
	let response = app
		.post(
			"/api/users",
			Some(&app.fixtures.root),
			json!({ "username": " Auditor ", "password": USER_PASSWORD }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert!(app
		.state
		.user_repo
		.get_user_by_username("Auditor")
		.await
		.unwrap()
		.is_none());
}

#[tokio::test]
async fn users_cannot_delete_themselves() {
	let app = TestApp::new().await;
	let root = &app.fixtures.root;

	let response = app
		.delete(&format!("/api/users/{}", root.user.id), Some(root))
		.await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(app.state.enforcer.roles_for_user("root"), vec!["Root"]);
}

#[tokio::test]
async fn malformed_user_id_is_bad_request() {
	let app = TestApp::new().await;

	let response = app
		.patch("/api/users/not-a-uuid", Some(&app.fixtures.root), json!({}))
		.await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_users_hides_deleted_and_pages() {
	let app = TestApp::new().await;
	let victim = app.create_user("frank", Role::Inspector).await;
	app
		.delete(&format!("/api/users/{}", victim.user.id), Some(&app.fixtures.root))
		.await;

	let response = app
		.get("/api/users?limit=2&offset=0", Some(&app.fixtures.inspector))
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	let page: Value = json_body(response).await;
	// root, ann and ivan remain.
	assert_eq!(page["total"], 3);
	assert_eq!(page["limit"], 2);
	assert_eq!(page["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn password_change_requires_current_password() {
	let app = TestApp::new().await;
	let inspector = &app.fixtures.inspector;

	let response = app
		.patch(
			"/api/users/profile",
			Some(inspector),
			json!({ "password": "new-password", "current_password": "wrong" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let response = app
		.patch(
			"/api/users/profile",
			Some(inspector),
			json!({ "password": "new-password", "current_password": USER_PASSWORD }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = app
		.post(
			"/auth/login",
			None,
			json!({ "username": "ivan", "password": "new-password" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn activity_is_recorded_for_profile_changes() {
	let app = TestApp::new().await;
	let inspector = &app.fixtures.inspector;

	let response = app
		.patch(
			"/api/users/profile",
			Some(inspector),
			json!({ "email": "ivan@example.com" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = app
		.get(
			&format!("/api/users/{}/activities", inspector.user.id),
			Some(inspector),
		)
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	let page: Value = json_body(response).await;
	assert_eq!(page["total"], 1);

	let response = app
		.get("/api/activity/stats?days=1", Some(&app.fixtures.admin))
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	let stats: Value = json_body(response).await;
	assert_eq!(stats["days"], 1);
}
