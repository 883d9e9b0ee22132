// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Baseline permission rules.

use tracing::info;

use crate::enforcer::PolicyEnforcer;
use crate::error::Result;

/// `(subject, resource, action)` rules every deployment starts with.
pub const BASELINE_POLICIES: &[(&str, &str, &str)] = &[
	("Root", "/api/*", "(GET|POST|PUT|PATCH|DELETE|OPTIONS)"),
	("Admin", "/api/users*", "(GET|POST|PUT|PATCH|DELETE)"),
	("Admin", "/api/instrument-types*", "(GET|POST|PUT|PATCH|DELETE)"),
	("Admin", "/api/*", "GET"),
	("Inspector", "/api/inspection-forms*", "(GET|POST)"),
	("Inspector", "/api/*", "GET"),
	("*", "/api/users/profile", "PATCH"),
];

/// Adds every [`BASELINE_POLICIES`] rule that is not stored yet.
///
/// Returns how many rules were newly added. Safe to call on every start.
pub async fn seed_baseline(enforcer: &PolicyEnforcer) -> Result<usize> {
	let mut added = 0;
	for (subject, resource, action) in BASELINE_POLICIES {
		if enforcer.add_policy(subject, resource, action).await? {
			added += 1;
		}
	}
	info!(added, total = BASELINE_POLICIES.len(), "baseline policies seeded");
	Ok(added)
}
