//! Event sink for cycle and action records
//!
//! The engine never formats or persists logs itself. It emits
//! `MirrorEvent`s to an `EventSink`; `TracingSink` turns them into
//! structured tracing records.

use std::path::Path;
use std::sync::Mutex;

use crate::compare::SyncWarning;
use crate::error::MirrorError;
use crate::executor::Outcome;
use crate::logging::*;
use crate::report::{ActionRecord, CycleSummary};

/// Events emitted while mirroring
#[derive(Debug, Clone, Copy)]
pub enum MirrorEvent<'a> {
	/// A cycle is about to walk both trees
	CycleStarted { cycle: u64, source: &'a Path, replica: &'a Path },

	/// One action was applied (successfully or not)
	Action { cycle: u64, record: &'a ActionRecord },

	/// A file could not be fingerprinted and is treated as changed
	Warning { cycle: u64, warning: &'a SyncWarning },

	/// The cycle could not run at all
	CycleFailed { cycle: u64, error: &'a MirrorError },

	/// The cycle finished (possibly with failed actions)
	CycleFinished { cycle: u64, summary: &'a CycleSummary },

	/// The scheduler reached its terminal state
	Stopped { cycles: u64 },
}

/// Append-only receiver of mirror events
pub trait EventSink: Send + Sync {
	fn on_event(&self, event: MirrorEvent<'_>);
}

/// Sink that drops every event
pub struct NoEvents;

impl EventSink for NoEvents {
	fn on_event(&self, _event: MirrorEvent<'_>) {}
}

/// Sink that writes events as tracing records
pub struct TracingSink;

impl EventSink for TracingSink {
	fn on_event(&self, event: MirrorEvent<'_>) {
		match event {
			MirrorEvent::CycleStarted { cycle, source, replica } => {
				info!(
					cycle,
					"Start synchronization process '{}' -> '{}'...",
					source.display(),
					replica.display()
				);
			}
			MirrorEvent::Action { cycle, record } => {
				let action = record.action.label();
				let kind = record.action.kind().to_string();
				let path = record.action.path();
				match &record.outcome {
					Outcome::Success => {
						info!(cycle, action, kind = %kind, path, outcome = "success", "{}", record.action)
					}
					Outcome::Failure(e) => {
						error!(cycle, action, kind = %kind, path, outcome = "failure", "{}: {}", record.action, e)
					}
				}
			}
			MirrorEvent::Warning { cycle, warning } => {
				warn!(cycle, path = %warning.path, "{}", warning);
			}
			MirrorEvent::CycleFailed { cycle, error } => {
				error!(cycle, "Synchronization failed: {}", error);
			}
			MirrorEvent::CycleFinished { cycle, summary } => {
				info!(
					cycle,
					failures = summary.failures,
					warnings = summary.warnings,
					"Synchronization completed: {} files and {} folders were changed in {:.2} seconds.",
					summary.files_changed,
					summary.folders_changed,
					summary.elapsed.as_secs_f64()
				);
			}
			MirrorEvent::Stopped { cycles } => {
				info!(cycles, "Synchronization process stopped.");
			}
		}
	}
}

/// Owned copy of an event, kept by `RecordingSink`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
	CycleStarted { cycle: u64 },
	Action { cycle: u64, action: String, success: bool },
	Warning { cycle: u64, path: String },
	CycleFailed { cycle: u64 },
	CycleFinished { cycle: u64, summary: CycleSummary },
	Stopped { cycles: u64 },
}

/// Sink that keeps an owned log of every event, for inspection by callers
#[derive(Default)]
pub struct RecordingSink {
	events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn events(&self) -> Vec<RecordedEvent> {
		match self.events.lock() {
			Ok(events) => events.clone(),
			Err(poisoned) => poisoned.into_inner().clone(),
		}
	}

	/// Cycle numbers that finished, in order
	pub fn finished_cycles(&self) -> Vec<u64> {
		self.events()
			.into_iter()
			.filter_map(|e| match e {
				RecordedEvent::CycleFinished { cycle, .. } => Some(cycle),
				_ => None,
			})
			.collect()
	}
}

impl EventSink for RecordingSink {
	fn on_event(&self, event: MirrorEvent<'_>) {
		let recorded = match event {
			MirrorEvent::CycleStarted { cycle, .. } => RecordedEvent::CycleStarted { cycle },
			MirrorEvent::Action { cycle, record } => RecordedEvent::Action {
				cycle,
				action: record.action.to_string(),
				success: record.outcome.is_success(),
			},
			MirrorEvent::Warning { cycle, warning } => {
				RecordedEvent::Warning { cycle, path: warning.path.clone() }
			}
			MirrorEvent::CycleFailed { cycle, .. } => RecordedEvent::CycleFailed { cycle },
			MirrorEvent::CycleFinished { cycle, summary } => {
				RecordedEvent::CycleFinished { cycle, summary: summary.clone() }
			}
			MirrorEvent::Stopped { cycles } => RecordedEvent::Stopped { cycles },
		};
		match self.events.lock() {
			Ok(mut events) => events.push(recorded),
			Err(poisoned) => poisoned.into_inner().push(recorded),
		}
	}
}


// vim: ts=4
