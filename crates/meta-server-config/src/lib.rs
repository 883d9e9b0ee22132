// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for meta-server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`META_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use meta_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("Server listening on {}:{}", config.http.host, config.http.port);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH,
};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub auth: AuthConfig,
	pub authz: AuthzConfig,
	pub audit: AuditConfig,
}

impl ServerConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`META_SERVER_*`)
/// 2. Config file (`/etc/meta/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
		auth: layer.auth.unwrap_or_default().finalize(),
		authz: layer.authz.unwrap_or_default().finalize(),
		audit: layer.audit.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		environment = %config.auth.environment,
		protected_prefix = %config.authz.protected_prefix,
		bootstrap_mode = config.authz.bootstrap_mode,
		audit_enabled = config.audit.enabled,
		"Server configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if config.authz.bootstrap_mode && config.auth.is_production() {
		return Err(ConfigError::Validation(
			"META_SERVER_AUTHZ_BOOTSTRAP_MODE is set while META_SERVER_ENV=production. \
			 Bootstrap mode lets unauthorized requests through. Remove it or set \
			 META_SERVER_ENV to a non-production value."
				.to_string(),
		));
	}

	if config.auth.bootstrap_root_username.is_some() && config.auth.bootstrap_root_password.is_none()
	{
		return Err(ConfigError::Validation(
			"bootstrap_root_username is set without bootstrap_root_password".to_string(),
		));
	}

	if !config.authz.protected_prefix.starts_with('/') {
		return Err(ConfigError::InvalidValue {
			key: "authz.protected_prefix".to_string(),
			message: format!("'{}' must start with '/'", config.authz.protected_prefix),
		});
	}

	if config.authz.max_role_depth == 0 {
		return Err(ConfigError::InvalidValue {
			key: "authz.max_role_depth".to_string(),
			message: "must be at least 1".to_string(),
		});
	}

	if config.auth.session_ttl_hours <= 0 {
		return Err(ConfigError::InvalidValue {
			key: "auth.session_ttl_hours".to_string(),
			message: "must be positive".to_string(),
		});
	}

	Ok(())
}
