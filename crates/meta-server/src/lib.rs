// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Meta-data HTTP server.
//!
//! Every request first has its session resolved into a
//! [`Principal`](meta_server_auth::Principal); requests under the protected
//! prefix are then checked against the policy engine before reaching a
//! handler.

pub mod api;
pub mod auth_middleware;
pub mod bootstrap;
pub mod client_info;
pub mod error;
pub mod health;
pub mod jobs;
pub mod policy_middleware;
pub mod routes;

pub use api::{create_app_state, create_router, AppState};
pub use bootstrap::bootstrap;
pub use error::ServerError;
pub use meta_server_config::ServerConfig;
pub use policy_middleware::EnforcePolicy;
