// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Login, logout and the current-principal endpoint.

use axum::http::{header::SET_COOKIE, Method, StatusCode};
use serde_json::{json, Value};

use super::support::{json_body, TestApp, ROOT_PASSWORD, ROOT_USERNAME, USER_PASSWORD};

/// `name=value` from the first `Set-Cookie` header.
fn session_cookie(response: &axum::response::Response) -> String {
	response
		.headers()
		.get(SET_COOKIE)
		.unwrap()
		.to_str()
		.unwrap()
		.split(';')
		.next()
		.unwrap()
		.to_string()
}

#[tokio::test]
async fn bootstrap_root_can_log_in_and_reach_everything() {
	let app = TestApp::new().await;

	let response = app
		.post(
			"/auth/login",
			None,
			json!({ "username": ROOT_USERNAME, "password": ROOT_PASSWORD }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	let cookie = session_cookie(&response);
	assert!(cookie.starts_with("meta_session="));
	let body: Value = json_body(response).await;
	assert_eq!(body["username"], ROOT_USERNAME);
	assert_eq!(body["role"], "Root");

	let response = app
		.request_with_cookie(Method::GET, "/api/policies", &cookie)
		.await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = app.request_with_cookie(Method::GET, "/auth/me", &cookie).await;
	assert_eq!(response.status(), StatusCode::OK);
	let me: Value = json_body(response).await;
	assert_eq!(me["username"], ROOT_USERNAME);
	assert_eq!(me["roles"], json!(["Root"]));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
	let app = TestApp::new().await;

	let response = app
		.post(
			"/auth/login",
			None,
			json!({ "username": "ivan", "password": "not-the-password" }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert!(response.headers().get(SET_COOKIE).is_none());

	let response = app
		.post(
			"/auth/login",
			None,
			json!({ "username": "nobody", "password": USER_PASSWORD }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_users_cannot_log_in() {
	let app = TestApp::new().await;
	let inspector = &app.fixtures.inspector;

	let response = app
		.patch(
			&format!("/api/users/{}", inspector.user.id),
			Some(&app.fixtures.root),
			json!({ "active": false }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = app
		.post(
			"/auth/login",
			None,
			json!({ "username": "ivan", "password": USER_PASSWORD }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_the_session() {
	let app = TestApp::new().await;

	let response = app
		.post(
			"/auth/login",
			None,
			json!({ "username": "ann", "password": USER_PASSWORD }),
		)
		.await;
	assert_eq!(response.status(), StatusCode::OK);
	let cookie = session_cookie(&response);

	let response = app
		.request_with_cookie(Method::GET, "/api/users", &cookie)
		.await;
	assert_eq!(response.status(), StatusCode::OK);

	let response = app
		.request_with_cookie(Method::POST, "/auth/logout", &cookie)
		.await;
	assert_eq!(response.status(), StatusCode::NO_CONTENT);
	assert!(response.headers().get(SET_COOKIE).is_some());

	let response = app
		.request_with_cookie(Method::GET, "/api/users", &cookie)
		.await;
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_session_still_succeeds() {
	let app = TestApp::new().await;

	let response = app.post("/auth/logout", None, json!({})).await;
	assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn me_requires_a_session() {
	let app = TestApp::new().await;

	let response = app.get("/auth/me", None).await;
	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let response = app.get("/auth/me", Some(&app.fixtures.inspector)).await;
	assert_eq!(response.status(), StatusCode::OK);
	let me: Value = json_body(response).await;
	assert_eq!(me["username"], "ivan");
	assert_eq!(me["roles"], json!(["Inspector"]));
}

#[tokio::test]
async fn cleanup_removes_expired_sessions() {
	use meta_server_auth::{generate_session_token, hash_token, Session};
	use meta_server_db::SessionRepository;

	let app = TestApp::new().await;
	let user = &app.fixtures.inspector.user;
	let expired = Session::for_user(&user.username, user.id, chrono::Duration::seconds(-1));
	let sessions = SessionRepository::new(app.state.pool.clone());
	sessions
		.create_session(&expired, &hash_token(&generate_session_token()))
		.await
		.unwrap();

	let report = meta_server::jobs::run_cleanup(&app.state).await;
	assert_eq!(report.sessions, 1);

	// Live fixture sessions are untouched.
	let response = app.get("/auth/me", Some(&app.fixtures.inspector)).await;
	assert_eq!(response.status(), StatusCode::OK);
}
