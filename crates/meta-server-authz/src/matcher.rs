// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Named string matchers used by the policy model.
//!
//! A [`PolicyModel`](crate::PolicyModel) refers to matchers by name. The
//! enforcer resolves those names against a [`MatcherRegistry`] once, at
//! construction time, so evaluation never performs a lookup.
//!
//! Two matchers ship by default:
//!
//! - [`KEY_MATCH`] ([`KeyMatcher`]): path patterns with an optional trailing `*`
//! - [`REGEX_MATCH`] ([`RegexMatcher`]): unanchored regular expressions

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;

use crate::error::{AuthzError, MatchError};

/// Registry name of the path-pattern matcher.
pub const KEY_MATCH: &str = "keyMatch";

/// Registry name of the regular-expression matcher.
pub const REGEX_MATCH: &str = "regexMatch";

/// A typed two-argument string predicate.
pub trait Matcher: Send + Sync {
	/// Returns whether `text` satisfies `pattern`.
	fn matches(&self, text: &str, pattern: &str) -> Result<bool, MatchError>;

	/// Checks that `pattern` is usable before it is stored.
	fn validate(&self, _pattern: &str) -> Result<(), MatchError> {
		Ok(())
	}
}

/// Path-pattern matcher.
///
/// A pattern ending in `*` matches every path that starts with the literal
/// text before the `*`. Any other pattern must equal the path exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyMatcher;

impl Matcher for KeyMatcher {
	fn matches(&self, text: &str, pattern: &str) -> Result<bool, MatchError> {
		Ok(key_match(text, pattern))
	}
}

/// Literal-prefix match used by [`KeyMatcher`].
///
/// `/api/users*` therefore accepts `/api/users`, `/api/users/5` and also
/// `/api/usersx`.
pub fn key_match(path: &str, pattern: &str) -> bool {
	match pattern.strip_suffix('*') {
		Some(prefix) => path.starts_with(prefix),
		None => path == pattern,
	}
}

/// Regular-expression matcher with a compiled-pattern cache.
///
/// Matching is unanchored: `(GET|POST)` accepts any text containing `GET` or
/// `POST`.
#[derive(Default)]
pub struct RegexMatcher {
	cache: RwLock<HashMap<String, Regex>>,
}

impl RegexMatcher {
	pub fn new() -> Self {
		Self::default()
	}

	fn compile(pattern: &str) -> Result<Regex, MatchError> {
		Regex::new(pattern).map_err(|e| MatchError::InvalidPattern {
			pattern: pattern.to_string(),
			message: e.to_string(),
		})
	}

	fn cached(&self, pattern: &str) -> Option<Regex> {
		self
			.cache
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(pattern)
			.cloned()
	}
}

impl fmt::Debug for RegexMatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let cached = self
			.cache
			.read()
			.map(|c| c.len())
			.unwrap_or_default();
		f.debug_struct("RegexMatcher")
			.field("cached", &cached)
			.finish()
	}
}

impl Matcher for RegexMatcher {
	fn matches(&self, text: &str, pattern: &str) -> Result<bool, MatchError> {
		if let Some(re) = self.cached(pattern) {
			return Ok(re.is_match(text));
		}

		let re = Self::compile(pattern)?;
		let matched = re.is_match(text);
		self
			.cache
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(pattern.to_string(), re);
		Ok(matched)
	}

	fn validate(&self, pattern: &str) -> Result<(), MatchError> {
		Self::compile(pattern).map(|_| ())
	}
}

/// Name-to-matcher mapping consulted when an enforcer is built.
#[derive(Clone, Default)]
pub struct MatcherRegistry {
	matchers: HashMap<String, Arc<dyn Matcher>>,
}

impl MatcherRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry holding [`KEY_MATCH`] and [`REGEX_MATCH`].
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry.register(KEY_MATCH, Arc::new(KeyMatcher));
		registry.register(REGEX_MATCH, Arc::new(RegexMatcher::new()));
		registry
	}

	/// Registers `matcher` under `name`, returning any matcher it replaced.
	pub fn register(
		&mut self,
		name: impl Into<String>,
		matcher: Arc<dyn Matcher>,
	) -> Option<Arc<dyn Matcher>> {
		self.matchers.insert(name.into(), matcher)
	}

	pub fn get(&self, name: &str) -> Option<Arc<dyn Matcher>> {
		self.matchers.get(name).cloned()
	}

	pub(crate) fn resolve(&self, name: &str) -> Result<Arc<dyn Matcher>, AuthzError> {
		self
			.get(name)
			.ok_or_else(|| AuthzError::UnknownMatcher(name.to_string()))
	}

	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.matchers.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}
}

impl fmt::Debug for MatcherRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MatcherRegistry")
			.field("matchers", &self.names())
			.finish()
	}
}
