//! One synchronization cycle: walk, diff, apply, report
//!
//! A cycle is the unit the scheduler runs. It never aborts half way
//! through its action list: a failed action is recorded and the next one
//! is attempted. Only a root that cannot be walked stops a cycle, and it
//! does so before anything is mutated.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::compare::{self, Diff};
use crate::config::MirrorConfig;
use crate::error::MirrorError;
use crate::events::{EventSink, MirrorEvent, TracingSink};
use crate::executor::MirrorExecutor;
use crate::hash::{Blake3Fingerprinter, Fingerprinter};
use crate::report::{ActionRecord, CycleReport};
use crate::types::SyncAction;
use crate::walk::{self, DirReader, Exclusions, FsDirReader, Side};

pub struct SyncCycle {
	source_root: PathBuf,
	replica_root: PathBuf,
	exclusions: Exclusions,
	hasher: Arc<dyn Fingerprinter>,
	custom_hasher: bool,
	reader: Arc<dyn DirReader>,
	executor: MirrorExecutor,
	sink: Arc<dyn EventSink>,
}

impl SyncCycle {
	/// Cycle with no exclusions, BLAKE3 fingerprints and tracing output
	pub fn new(source_root: PathBuf, replica_root: PathBuf) -> Self {
		let executor = MirrorExecutor::new(source_root.clone(), replica_root.clone());
		SyncCycle {
			source_root,
			replica_root,
			exclusions: Exclusions::default(),
			hasher: Arc::new(Blake3Fingerprinter::default()),
			custom_hasher: false,
			reader: Arc::new(FsDirReader),
			executor,
			sink: Arc::new(TracingSink),
		}
	}

	/// Build a cycle from a validated configuration
	pub fn from_config(config: &MirrorConfig) -> Result<Self, MirrorError> {
		let exclusions = config.exclusions()?;
		Ok(SyncCycle::new(config.source.clone(), config.replica.clone())
			.with_exclusions(exclusions)
			.with_buffer_size(config.buffer_size))
	}

	pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
		self.exclusions = exclusions;
		self
	}

	/// Replace the BLAKE3 fingerprinter. A later `with_buffer_size` keeps it.
	pub fn with_fingerprinter(mut self, hasher: Arc<dyn Fingerprinter>) -> Self {
		self.hasher = hasher;
		self.custom_hasher = true;
		self
	}

	pub fn with_dir_reader(mut self, reader: Arc<dyn DirReader>) -> Self {
		self.reader = reader;
		self
	}

	pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
		self.sink = sink;
		self
	}

	/// Buffer size used for copying, and for hashing unless a custom
	/// fingerprinter was set
	pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
		if !self.custom_hasher {
			self.hasher = Arc::new(Blake3Fingerprinter::new(buffer_size));
		}
		self.executor = self.executor.with_buffer_size(buffer_size);
		self
	}

	pub fn source_root(&self) -> &Path {
		&self.source_root
	}

	pub fn replica_root(&self) -> &Path {
		&self.replica_root
	}

	pub fn sink(&self) -> &Arc<dyn EventSink> {
		&self.sink
	}

	/// Walk both trees and compute the actions without applying them
	pub async fn plan(&self) -> Result<Diff, MirrorError> {
		let reader = self.reader.as_ref();
		let source = walk::snapshot_with(&self.source_root, &self.exclusions, Side::Source, reader).await?;
		let replica = walk::snapshot_with(&self.replica_root, &self.exclusions, Side::Replica, reader).await?;
		Ok(compare::diff(&source, &replica, self.hasher.as_ref()).await)
	}

	/// Run cycle number `cycle` to completion
	pub async fn run(&self, cycle: u64) -> CycleReport {
		let started = Instant::now();
		let mut report = CycleReport::new(cycle);

		self.sink.on_event(MirrorEvent::CycleStarted {
			cycle,
			source: &self.source_root,
			replica: &self.replica_root,
		});

		let diff = match self.plan().await {
			Ok(diff) => diff,
			Err(e) => {
				self.sink.on_event(MirrorEvent::CycleFailed { cycle, error: &e });
				report.error = Some(e);
				report.elapsed = started.elapsed();
				return report;
			}
		};

		for warning in &diff.warnings {
			self.sink.on_event(MirrorEvent::Warning { cycle, warning });
		}
		report.warnings = diff.warnings;

		self.apply_actions(cycle, diff.actions, &mut report).await;

		report.elapsed = started.elapsed();
		let summary = report.summary();
		self.sink.on_event(MirrorEvent::CycleFinished { cycle, summary: &summary });
		report
	}

	/// Apply `actions` in order, recording each outcome in `report`.
	/// A failure never prevents the following actions from being attempted.
	pub async fn apply_actions(&self, cycle: u64, actions: Vec<SyncAction>, report: &mut CycleReport) {
		for action in actions {
			let outcome = self.executor.apply(&action).await;
			let record = ActionRecord::new(action, outcome);
			self.sink.on_event(MirrorEvent::Action { cycle, record: &record });
			report.records.push(record);
		}
	}
}


// vim: ts=4
