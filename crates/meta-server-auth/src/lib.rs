// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication for the meta-data server.
//!
//! This crate provides:
//! - Server-side sessions keyed by a hashed cookie token
//! - The [`SessionStore`] contract used wherever sessions are read or written
//! - [`PrincipalResolver`], which turns request headers into a [`Principal`]
//! - Argon2id password hashing
//!
//! Authorization decisions live in `meta-server-authz`; nothing here consults
//! the policy engine.

mod argon2_config;
pub mod error;
pub mod middleware;
pub mod password;
pub mod principal;
pub mod session;
pub mod store;
pub mod types;

pub use error::{AuthError, Result};
pub use middleware::{
	clear_session_cookie, extract_session_cookie, extract_session_cookie_with_name, session_cookie,
	SESSION_COOKIE_NAME,
};
pub use password::{hash_password, verify_password};
pub use principal::{Principal, PrincipalResolver};
pub use session::{
	generate_session_token, Session, DEFAULT_SESSION_TTL_HOURS, USERNAME_KEY, USER_ID_KEY,
};
pub use store::{MemorySessionStore, SessionStore};
pub use types::{SessionId, UserId};

/// Hash a token using SHA-256 and return the hex-encoded result.
///
/// Session tokens are only ever stored and looked up by this hash.
pub fn hash_token(token: &str) -> String {
	use sha2::{Digest, Sha256};
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hex::encode(hasher.finalize())
}
