// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
	/// No usable session accompanied the request.
	#[error("authentication required")]
	Unauthenticated,

	#[error("session expired")]
	SessionExpired,

	#[error("invalid credentials")]
	InvalidCredentials,

	/// The session store failed.
	#[error("session store error: {0}")]
	Store(String),

	#[error("password hashing error: {0}")]
	Hashing(String),
}

impl AuthError {
	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		matches!(self, AuthError::Store(_) | AuthError::Hashing(_))
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			AuthError::Unauthenticated | AuthError::SessionExpired | AuthError::InvalidCredentials => {
				401
			}
			AuthError::Store(_) | AuthError::Hashing(_) => 500,
		}
	}
}

pub type Result<T> = std::result::Result<T, AuthError>;
