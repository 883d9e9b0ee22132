// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role-based access control for the meta-data server.
//!
//! A [`PolicyEnforcer`] holds permission rules `(subject, resource, action)`
//! and a user-to-role grouping relation, both loaded through a
//! [`PolicyAdapter`]. Requests are evaluated in memory:
//!
//! ```text
//! allow(sub, obj, act) = exists p:
//!     (p.sub == sub || p.sub == "*" || p.sub in roles*(sub))
//!     && keyMatch(obj, p.obj)
//!     && regexMatch(act, p.act)
//! ```
//!
//! Mutations are written through the adapter before they become visible.

pub mod adapter;
pub mod enforcer;
pub mod error;
pub mod matcher;
pub mod model;
pub mod role;
pub mod seed;

pub use adapter::{MemoryAdapter, PolicyAdapter};
pub use enforcer::PolicyEnforcer;
pub use error::{AuthzError, MatchError, Result};
pub use matcher::{key_match, KeyMatcher, Matcher, MatcherRegistry, RegexMatcher, KEY_MATCH, REGEX_MATCH};
pub use model::{
	Permission, PolicyModel, PolicyRule, PolicyType, RoleBinding, DEFAULT_MAX_ROLE_DEPTH,
	WILDCARD_SUBJECT,
};
pub use role::{Role, RoleAssigner};
pub use seed::{seed_baseline, BASELINE_POLICIES};
