// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password hashing.

use argon2::password_hash::{
	rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use tracing::instrument;

use crate::argon2_config::argon2_instance;
use crate::error::{AuthError, Result};

/// Hash `password` with Argon2id and a random salt, returning the PHC string.
#[instrument(name = "password.hash", skip_all)]
pub fn hash_password(password: &str) -> Result<String> {
	let salt = SaltString::generate(&mut OsRng);
	argon2_instance()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Returns `false` for a wrong password and for a malformed stored hash.
#[instrument(name = "password.verify", skip_all)]
pub fn verify_password(password: &str, hash: &str) -> bool {
	let parsed_hash = match PasswordHash::new(hash) {
		Ok(h) => h,
		Err(_) => return false,
	};
	argon2_instance()
		.verify_password(password.as_bytes(), &parsed_hash)
		.is_ok()
}
