// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	body::Body,
	http::{header::HeaderName, header::HeaderValue, Method, Request, StatusCode},
	response::Response,
	Router,
};
use meta_server::{
	api::{create_app_state, create_router, AppState},
	bootstrap, ServerConfig,
};
use meta_server_auth::{generate_session_token, hash_token, Session};
use meta_server_authz::Role;
use meta_server_db::{SessionRepository, User};
use serde::{de::DeserializeOwned, Serialize};
use tempfile::TempDir;
use tower::ServiceExt;

pub const ROOT_USERNAME: &str = "root";
pub const ROOT_PASSWORD: &str = "root-password";
pub const USER_PASSWORD: &str = "password123";

#[derive(Clone)]
pub struct TestUser {
	pub user: User,
	pub session_token: String,
}

impl TestUser {
	pub fn auth_header(&self) -> (HeaderName, HeaderValue) {
		(
			HeaderName::from_static("cookie"),
			HeaderValue::from_str(&format!("meta_session={}", self.session_token)).unwrap(),
		)
	}
}

#[derive(Clone)]
pub struct Fixtures {
	pub root: TestUser,
	pub admin: TestUser,
	pub inspector: TestUser,
}

pub struct TestApp {
	pub router: Router,
	pub fixtures: Fixtures,
	pub state: AppState,
	_temp_dir: TempDir,
}

pub fn test_config() -> ServerConfig {
	let mut config = ServerConfig::default();
	config.auth.bootstrap_root_username = Some(ROOT_USERNAME.to_string());
	config.auth.bootstrap_root_password = Some(ROOT_PASSWORD.to_string());
	config
}

impl TestApp {
	/// Fully bootstrapped app with a root, an admin and an inspector.
	pub async fn new() -> Self {
		Self::with_config(test_config()).await
	}

	pub async fn with_config(config: ServerConfig) -> Self {
		let app = Self::unbootstrapped(config).await;
		bootstrap(&app.state).await.unwrap();
		app.with_fixtures().await
	}

	/// App whose policy engine was never loaded.
	pub async fn unbootstrapped(config: ServerConfig) -> Self {
		let temp_dir = tempfile::tempdir().unwrap();
		let db_path = temp_dir.path().join("test_authz.db");
		let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
		let pool = meta_server_db::create_pool(&db_url).await.unwrap();
		meta_server_db::run_migrations(&pool).await.unwrap();

		let state = create_app_state(pool, &config).await.unwrap();
		let router = create_router(state.clone());

		let placeholder = TestUser {
			user: User::new("nobody", "", None, Role::Inspector),
			session_token: generate_session_token(),
		};

		Self {
			router,
			fixtures: Fixtures {
				root: placeholder.clone(),
				admin: placeholder.clone(),
				inspector: placeholder,
			},
			state,
			_temp_dir: temp_dir,
		}
	}

	async fn with_fixtures(mut self) -> Self {
		let root = self
			.state
			.user_repo
			.get_user_by_username(ROOT_USERNAME)
			.await
			.unwrap()
			.unwrap();
		self.fixtures.root = self.session_for(root).await;
		self.fixtures.admin = self.create_user("ann", Role::Admin).await;
		self.fixtures.inspector = self.create_user("ivan", Role::Inspector).await;
		self
	}

	/// Creates a user the way the server does and gives them a session.
	pub async fn create_user(&self, username: &str, role: Role) -> TestUser {
		let hash = meta_server_auth::hash_password(USER_PASSWORD).unwrap();
		let user = User::new(username, hash, None, role);
		self.state.user_repo.create_user(&user).await.unwrap();
		self
			.state
			.role_assigner
			.assign_role(username, role.as_str())
			.await
			.unwrap();
		self.session_for(user).await
	}

	pub async fn session_for(&self, user: User) -> TestUser {
		let token = generate_session_token();
		let session = Session::for_user(
			&user.username,
			user.id,
			self.state.principal_resolver.ttl(),
		);
		SessionRepository::new(self.state.pool.clone())
			.create_session(&session, &hash_token(&token))
			.await
			.unwrap();
		TestUser {
			user,
			session_token: token,
		}
	}

	pub async fn get(&self, path: &str, user: Option<&TestUser>) -> Response<Body> {
		self
			.request(Method::GET, path, user, Option::<()>::None)
			.await
	}

	pub async fn post(
		&self,
		path: &str,
		user: Option<&TestUser>,
		body: impl Serialize,
	) -> Response<Body> {
		self.request(Method::POST, path, user, Some(body)).await
	}

	pub async fn patch(
		&self,
		path: &str,
		user: Option<&TestUser>,
		body: impl Serialize,
	) -> Response<Body> {
		self.request(Method::PATCH, path, user, Some(body)).await
	}

	pub async fn delete(&self, path: &str, user: Option<&TestUser>) -> Response<Body> {
		self
			.request(Method::DELETE, path, user, Option::<()>::None)
			.await
	}

	/// Sends a request carrying a raw `Cookie` header.
	pub async fn request_with_cookie(
		&self,
		method: Method,
		path: &str,
		cookie: &str,
	) -> Response<Body> {
		let request = Request::builder()
			.method(method)
			.uri(path)
			.header("cookie", cookie)
			.body(Body::empty())
			.unwrap();
		self.router.clone().oneshot(request).await.unwrap()
	}

	async fn request<T: Serialize>(
		&self,
		method: Method,
		path: &str,
		user: Option<&TestUser>,
		body: Option<T>,
	) -> Response<Body> {
		let mut builder = Request::builder().method(method).uri(path);

		if let Some(test_user) = user {
			let (name, value) = test_user.auth_header();
			builder = builder.header(name, value);
		}

		let request_body = match body {
			Some(b) => {
				builder = builder.header("content-type", "application/json");
				Body::from(serde_json::to_string(&b).unwrap())
			}
			None => Body::empty(),
		};

		let request = builder.body(request_body).unwrap();

		self.router.clone().oneshot(request).await.unwrap()
	}
}

pub async fn json_body<T: DeserializeOwned>(response: Response<Body>) -> T {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

pub struct AuthzCase {
	pub name: &'static str,
	pub method: Method,
	pub path: String,
	pub user: Option<TestUser>,
	pub body: Option<serde_json::Value>,
	pub expected_status: StatusCode,
}

pub async fn run_authz_cases(app: &TestApp, cases: &[AuthzCase]) {
	for case in cases {
		let response = match (&case.method, &case.body) {
			(m, Some(body)) if *m == Method::POST => {
				app.post(&case.path, case.user.as_ref(), body.clone()).await
			}
			(m, Some(body)) if *m == Method::PATCH => {
				app
					.patch(&case.path, case.user.as_ref(), body.clone())
					.await
			}
			(m, _) if *m == Method::DELETE => app.delete(&case.path, case.user.as_ref()).await,
			_ => app.get(&case.path, case.user.as_ref()).await,
		};

		if response.status() != case.expected_status {
			let (parts, body) = response.into_parts();
			let body_bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
			let body_str = String::from_utf8_lossy(&body_bytes);
			panic!(
				"Case '{}': {} {} - expected {}, got {}\nResponse body: {}",
				case.name, case.method, case.path, case.expected_status, parts.status, body_str
			);
		}
	}
}
