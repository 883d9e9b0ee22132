// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tokio::sync::mpsc::{
	self,
	error::{SendError, TrySendError},
};
use tracing::{instrument, warn};

use crate::error::{AuditError, AuditResult};
use crate::event::AuditLogEntry;
use crate::filter::AuditFilterConfig;
use crate::sink::AuditSink;
use meta_server_config::QueueOverflowPolicy;

/// Bounded queue in front of the audit sinks.
///
/// Callers enqueue and return immediately; a background task applies the
/// global filter and fans each entry out to every sink whose own filter
/// accepts it.
pub struct AuditService {
	tx: mpsc::Sender<AuditLogEntry>,
	overflow_policy: QueueOverflowPolicy,
}

impl AuditService {
	pub fn new(
		global_filter: AuditFilterConfig,
		queue_capacity: usize,
		overflow_policy: QueueOverflowPolicy,
		sinks: Vec<Arc<dyn AuditSink>>,
	) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity.max(1));

		tokio::spawn(Self::background_task(rx, global_filter, sinks));

		Self {
			tx,
			overflow_policy,
		}
	}

	async fn background_task(
		mut rx: mpsc::Receiver<AuditLogEntry>,
		global_filter: AuditFilterConfig,
		sinks: Vec<Arc<dyn AuditSink>>,
	) {
		while let Some(entry) = rx.recv().await {
			if !global_filter.allows(&entry) {
				continue;
			}

			let entry = Arc::new(entry);

			for sink in &sinks {
				if !sink.filter().allows(&entry) {
					continue;
				}

				let sink = Arc::clone(sink);
				let entry = Arc::clone(&entry);

				tokio::spawn(async move {
					if let Err(e) = sink.publish(entry).await {
						warn!(sink = sink.name(), error = %e, "audit sink publish failed");
					}
				});
			}
		}
	}

	/// Queue an entry for processing.
	///
	/// Returns `true` if the entry was queued, `false` if it was dropped.
	///
	/// - `Block`: hands the send to a spawned task so the caller never waits
	/// - `DropNewest` / `DropOldest`: `try_send`, dropping the new entry when
	///   the queue is full
	#[instrument(skip(self, entry), fields(event_type = %entry.event_type))]
	pub fn log(&self, entry: AuditLogEntry) -> bool {
		match self.overflow_policy {
			QueueOverflowPolicy::Block => {
				let tx = self.tx.clone();
				tokio::spawn(async move {
					let _ = tx.send(entry).await;
				});
				true
			}
			QueueOverflowPolicy::DropNewest | QueueOverflowPolicy::DropOldest => {
				match self.try_log(entry) {
					Ok(()) => true,
					Err(e) => {
						warn!(error = %e, "audit entry dropped");
						false
					}
				}
			}
		}
	}

	/// Queue an entry without waiting, regardless of the overflow policy.
	pub fn try_log(&self, entry: AuditLogEntry) -> AuditResult<()> {
		self.tx.try_send(entry).map_err(|e| match e {
			TrySendError::Full(_) => AuditError::QueueFull,
			TrySendError::Closed(_) => AuditError::Shutdown,
		})
	}

	pub async fn log_blocking(&self, entry: AuditLogEntry) -> Result<(), SendError<AuditLogEntry>> {
		self.tx.send(entry).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::{AuditEventType, AuditSeverity};
	use crate::sink::AuditSinkError;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tokio::time::{sleep, Duration};

	struct TestSink {
		name: String,
		filter: AuditFilterConfig,
		publish_count: Arc<AtomicUsize>,
	}

	impl TestSink {
		fn new(name: &str) -> Self {
			Self::with_filter(name, AuditFilterConfig::default())
		}

		fn with_filter(name: &str, filter: AuditFilterConfig) -> Self {
			Self {
				name: name.to_string(),
				filter,
				publish_count: Arc::new(AtomicUsize::new(0)),
			}
		}

		fn count(&self) -> usize {
			self.publish_count.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl AuditSink for TestSink {
		fn name(&self) -> &str {
			&self.name
		}

		fn filter(&self) -> &AuditFilterConfig {
			&self.filter
		}

		async fn publish(&self, _entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
			self.publish_count.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	struct FailingSink {
		filter: AuditFilterConfig,
	}

	#[async_trait]
	impl AuditSink for FailingSink {
		fn name(&self) -> &str {
			"failing"
		}

		fn filter(&self) -> &AuditFilterConfig {
			&self.filter
		}

		async fn publish(&self, _entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
			Err(AuditSinkError::Transient("test error".to_string()))
		}
	}

	fn denied() -> AuditLogEntry {
		AuditLogEntry::builder(AuditEventType::AccessDenied)
			.actor("alice")
			.resource("route", "/api/users")
			.build()
	}

	#[tokio::test]
	async fn test_log_sends_to_sink() {
		let sink = Arc::new(TestSink::new("test"));

		let service = AuditService::new(
			AuditFilterConfig::default(),
			10000,
			QueueOverflowPolicy::DropNewest,
			vec![sink.clone()],
		);

		assert!(service.log(denied()));
		sleep(Duration::from_millis(50)).await;

		assert_eq!(sink.count(), 1);
	}

	#[tokio::test]
	async fn test_fan_out_to_multiple_sinks() {
		let a = Arc::new(TestSink::new("a"));
		let b = Arc::new(TestSink::new("b"));

		let service = AuditService::new(
			AuditFilterConfig::default(),
			100,
			QueueOverflowPolicy::DropNewest,
			vec![a.clone(), b.clone()],
		);

		for _ in 0..3 {
			service.log_blocking(denied()).await.unwrap();
		}
		sleep(Duration::from_millis(50)).await;

		assert_eq!(a.count(), 3);
		assert_eq!(b.count(), 3);
	}

	#[tokio::test]
	async fn test_global_filter_drops_before_sinks() {
		let sink = Arc::new(TestSink::new("test"));

		let service = AuditService::new(
			AuditFilterConfig::with_min_severity(AuditSeverity::Warning),
			100,
			QueueOverflowPolicy::DropNewest,
			vec![sink.clone()],
		);

		service
			.log_blocking(AuditLogEntry::builder(AuditEventType::Login).build())
			.await
			.unwrap();
		service.log_blocking(denied()).await.unwrap();
		sleep(Duration::from_millis(50)).await;

		assert_eq!(sink.count(), 1);
	}

	#[tokio::test]
	async fn test_sink_filter_is_per_sink() {
		let everything = Arc::new(TestSink::with_filter(
			"everything",
			AuditFilterConfig::with_min_severity(AuditSeverity::Debug),
		));
		let denials_only = Arc::new(TestSink::with_filter(
			"denials",
			AuditFilterConfig {
				min_severity: AuditSeverity::Debug,
				include_events: Some(vec![AuditEventType::AccessDenied]),
				exclude_events: None,
			},
		));

		let service = AuditService::new(
			AuditFilterConfig::with_min_severity(AuditSeverity::Debug),
			100,
			QueueOverflowPolicy::Block,
			vec![everything.clone(), denials_only.clone()],
		);

		assert!(service.log(AuditLogEntry::builder(AuditEventType::AccessGranted).build()));
		assert!(service.log(denied()));
		sleep(Duration::from_millis(50)).await;

		assert_eq!(everything.count(), 2);
		assert_eq!(denials_only.count(), 1);
	}

	#[tokio::test]
	async fn test_failing_sink_does_not_block_others() {
		let sink = Arc::new(TestSink::new("test"));

		let service = AuditService::new(
			AuditFilterConfig::default(),
			100,
			QueueOverflowPolicy::DropNewest,
			vec![
				Arc::new(FailingSink {
					filter: AuditFilterConfig::default(),
				}),
				sink.clone(),
			],
		);

		service.log_blocking(denied()).await.unwrap();
		service.log_blocking(denied()).await.unwrap();
		sleep(Duration::from_millis(50)).await;

		assert_eq!(sink.count(), 2);
	}

	#[tokio::test(flavor = "current_thread")]
	async fn test_drop_newest_when_full() {
		let service = AuditService::new(
			AuditFilterConfig::default(),
			1,
			QueueOverflowPolicy::DropNewest,
			vec![],
		);

		// The background task has not been polled yet on a current-thread
		// runtime, so the single slot stays occupied.
		assert!(service.log(denied()));
		assert!(!service.log(denied()));
		assert!(matches!(service.try_log(denied()), Err(AuditError::QueueFull)));
	}
}
