// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
	#[error("audit queue is full")]
	QueueFull,

	#[error("sink '{sink}' failed")]
	SinkError {
		sink: String,
		#[source]
		source: AuditSinkError,
	},

	#[error("configuration error: {0}")]
	ConfigError(String),

	#[error("audit service is shut down")]
	Shutdown,
}

#[derive(Debug, Error)]
pub enum AuditSinkError {
	/// The sink may accept the event if it is retried later.
	#[error("transient sink error: {0}")]
	Transient(String),

	#[error("permanent sink error: {0}")]
	Permanent(String),
}

pub type AuditResult<T> = Result<T, AuditError>;
