// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the policy engine.

use thiserror::Error;

/// Errors raised by a [`crate::Matcher`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchError {
	#[error("invalid pattern '{pattern}': {message}")]
	InvalidPattern { pattern: String, message: String },
}

/// Errors raised by the enforcer and the policy adapters.
#[derive(Debug, Error)]
pub enum AuthzError {
	/// The enforcer has not loaded its policy yet.
	#[error("policy engine is not ready")]
	NotReady,

	#[error("matcher '{0}' is not registered")]
	UnknownMatcher(String),

	#[error(transparent)]
	Match(#[from] MatchError),

	#[error("invalid rule: {0}")]
	InvalidRule(String),

	/// The backing store rejected a load or a write.
	#[error("policy adapter error: {0}")]
	Adapter(String),
}

impl AuthzError {
	/// Whether the error originates from the backing store.
	pub fn is_storage(&self) -> bool {
		matches!(self, AuthzError::Adapter(_))
	}
}

pub type Result<T> = std::result::Result<T, AuthzError>;
