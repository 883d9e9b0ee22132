// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuditConfigLayer, AuthConfigLayer, AuthzConfigLayer, DatabaseConfigLayer, HttpConfigLayer,
	LoggingConfigLayer, QueueOverflowPolicy,
};

/// Default location of the system configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/meta/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: META_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(load_database_from_env()?),
			logging: Some(load_logging_from_env()?),
			auth: Some(load_auth_from_env()?),
			authz: Some(load_authz_from_env()?),
			audit: Some(load_audit_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("META_SERVER_HOST"),
		port: env_parse("META_SERVER_PORT", "u16")?,
		base_url: env_var("META_SERVER_BASE_URL"),
	})
}

fn load_database_from_env() -> Result<DatabaseConfigLayer, ConfigError> {
	Ok(DatabaseConfigLayer {
		url: env_var("META_SERVER_DATABASE_URL"),
		auto_migrate: env_bool("META_SERVER_DATABASE_AUTO_MIGRATE"),
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	Ok(LoggingConfigLayer {
		level: env_var("META_SERVER_LOG_LEVEL"),
	})
}

fn load_auth_from_env() -> Result<AuthConfigLayer, ConfigError> {
	Ok(AuthConfigLayer {
		environment: env_var("META_SERVER_ENV"),
		session_cookie_name: env_var("META_SERVER_SESSION_COOKIE_NAME"),
		session_ttl_hours: env_parse("META_SERVER_SESSION_TTL_HOURS", "i64")?,
		secure_cookie: env_bool("META_SERVER_SESSION_SECURE_COOKIE"),
		session_cleanup_interval_secs: env_parse("META_SERVER_SESSION_CLEANUP_INTERVAL_SECS", "u64")?,
		bootstrap_root_username: env_var("META_SERVER_BOOTSTRAP_ROOT_USERNAME"),
		bootstrap_root_password: env_var("META_SERVER_BOOTSTRAP_ROOT_PASSWORD"),
	})
}

fn load_authz_from_env() -> Result<AuthzConfigLayer, ConfigError> {
	Ok(AuthzConfigLayer {
		protected_prefix: env_var("META_SERVER_AUTHZ_PROTECTED_PREFIX"),
		seed_baseline: env_bool("META_SERVER_AUTHZ_SEED_BASELINE"),
		bootstrap_mode: env_bool("META_SERVER_AUTHZ_BOOTSTRAP_MODE"),
		max_role_depth: env_parse("META_SERVER_AUTHZ_MAX_ROLE_DEPTH", "usize")?,
	})
}

fn load_audit_from_env() -> Result<AuditConfigLayer, ConfigError> {
	let queue_overflow_policy =
		env_var("META_SERVER_AUDIT_QUEUE_OVERFLOW_POLICY").map(|v| match v.to_lowercase().as_str() {
			"drop_oldest" => QueueOverflowPolicy::DropOldest,
			"block" => QueueOverflowPolicy::Block,
			_ => QueueOverflowPolicy::DropNewest,
		});

	Ok(AuditConfigLayer {
		enabled: env_bool("META_SERVER_AUDIT_ENABLED"),
		retention_days: env_parse("META_SERVER_AUDIT_RETENTION_DAYS", "i64")?,
		queue_capacity: env_parse("META_SERVER_AUDIT_QUEUE_CAPACITY", "usize")?,
		queue_overflow_policy,
		min_severity: env_var("META_SERVER_AUDIT_MIN_SEVERITY"),
	})
}
