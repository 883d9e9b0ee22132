// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # meta-server-db
//!
//! Persistence layer for the meta-data server using SQLite via sqlx.
//!
//! ## Repository Pattern
//!
//! Each domain has two components:
//! - **`*Store` trait**: the interface (e.g. `UserStore`, `AuditStore`)
//! - **`*Repository` struct**: the implementation holding a `SqlitePool`
//!
//! Two repositories instead implement contracts owned by other crates:
//! [`PolicyRepository`] is the enforcer's `PolicyAdapter` and
//! [`SessionRepository`] is the principal resolver's `SessionStore`.
//!
//! ## Error Handling
//!
//! | Variant | When to use |
//! |---------|-------------|
//! | `NotFound` | Resource must exist but doesn't (update/delete by ID) |
//! | `Conflict` | Unique constraint violation |
//! | `Sqlx` | Unexpected database errors, propagated via `?` |
//! | `Internal` | Invalid stored data (e.g. unparseable UUID or role) |
//!
//! Lookups where absence is normal return `Result<Option<T>>`.
//!
//! ## Timestamps
//!
//! Stored as RFC 3339 text in UTC, so lexical order is chronological order.
//!
//! ## Testing
//!
//! Tests use in-memory SQLite with every migration applied:
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_example() {
//!     let pool = testing::create_test_pool().await;
//!     let repo = UserRepository::new(pool);
//!     // test operations...
//! }
//! ```

pub mod activity;
pub mod audit;
mod error;
pub mod migrations;
pub mod policy;
pub mod pool;
pub mod session;
pub mod user;

#[cfg(test)]
pub mod testing;

pub use activity::{activities, ActivityRepository, ActivityStore, NewActivity, UserActivity};
pub use audit::{AuditLogQuery, AuditRepository, AuditStore, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use policy::PolicyRepository;
pub use pool::create_pool;
pub use session::SessionRepository;
pub use user::{User, UserRepository, UserStore};

use chrono::{DateTime, Utc};

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(s)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid timestamp {s:?}: {e}")))
}
