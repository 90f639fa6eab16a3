//! Per-cycle report: every applied action with its outcome

use std::time::{Duration, SystemTime};

use crate::compare::SyncWarning;
use crate::error::MirrorError;
use crate::executor::Outcome;
use crate::types::{EntryKind, SyncAction};

/// One applied action
#[derive(Debug)]
pub struct ActionRecord {
	pub action: SyncAction,
	pub outcome: Outcome,
	pub finished_at: SystemTime,
}

impl ActionRecord {
	pub fn new(action: SyncAction, outcome: Outcome) -> Self {
		ActionRecord { action, outcome, finished_at: SystemTime::now() }
	}
}

/// Overall result of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
	/// Every action applied
	Success,
	/// At least one action failed, the rest were applied
	PartialFailure,
	/// The cycle could not run (a root could not be walked)
	Failed,
}

/// Counts reported at the end of a cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
	pub files_changed: usize,
	pub folders_changed: usize,
	pub failures: usize,
	pub warnings: usize,
	pub elapsed: Duration,
}

#[derive(Debug)]
pub struct CycleReport {
	pub cycle: u64,
	pub started_at: SystemTime,
	pub elapsed: Duration,
	pub records: Vec<ActionRecord>,
	pub warnings: Vec<SyncWarning>,
	/// Set when the whole cycle failed before any action ran
	pub error: Option<MirrorError>,
}

impl CycleReport {
	pub fn new(cycle: u64) -> Self {
		CycleReport {
			cycle,
			started_at: SystemTime::now(),
			elapsed: Duration::default(),
			records: Vec::new(),
			warnings: Vec::new(),
			error: None,
		}
	}

	pub fn status(&self) -> CycleStatus {
		if self.error.is_some() {
			CycleStatus::Failed
		} else if self.records.iter().any(|r| !r.outcome.is_success()) {
			CycleStatus::PartialFailure
		} else {
			CycleStatus::Success
		}
	}

	pub fn is_success(&self) -> bool {
		self.status() == CycleStatus::Success
	}

	pub fn failures(&self) -> impl Iterator<Item = &ActionRecord> {
		self.records.iter().filter(|r| !r.outcome.is_success())
	}

	/// Actions actually performed, in application order
	pub fn applied(&self) -> impl Iterator<Item = &SyncAction> {
		self.records.iter().filter(|r| r.outcome.is_success()).map(|r| &r.action)
	}

	pub fn summary(&self) -> CycleSummary {
		let mut summary = CycleSummary {
			warnings: self.warnings.len(),
			elapsed: self.elapsed,
			..CycleSummary::default()
		};
		for record in &self.records {
			if !record.outcome.is_success() {
				summary.failures += 1;
				continue;
			}
			match record.action.kind() {
				EntryKind::File | EntryKind::Special => summary.files_changed += 1,
				EntryKind::Directory => summary.folders_changed += 1,
			}
		}
		summary
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	fn record(action: SyncAction, ok: bool) -> ActionRecord {
		let outcome = if ok {
			Outcome::Success
		} else {
			Outcome::Failure(MirrorError::DirectoryNotEmpty { path: PathBuf::from(action.path()) })
		};
		ActionRecord::new(action, outcome)
	}

	#[test]
	fn test_empty_report_is_success() {
		let report = CycleReport::new(1);
		assert_eq!(report.status(), CycleStatus::Success);
		assert_eq!(report.summary(), CycleSummary::default());
	}

	#[test]
	fn test_summary_counts() {
		let mut report = CycleReport::new(2);
		report.records.push(record(SyncAction::Create { path: "d".into(), kind: EntryKind::Directory }, true));
		report.records.push(record(SyncAction::Create { path: "d/a".into(), kind: EntryKind::File }, true));
		report.records.push(record(SyncAction::Update { path: "b".into() }, true));
		report.records.push(record(SyncAction::Delete { path: "old".into(), kind: EntryKind::Directory }, false));

		let summary = report.summary();
		assert_eq!(summary.files_changed, 2);
		assert_eq!(summary.folders_changed, 1);
		assert_eq!(summary.failures, 1);
		assert_eq!(report.status(), CycleStatus::PartialFailure);
		assert_eq!(report.failures().count(), 1);
		assert_eq!(report.applied().count(), 3);
	}

	#[test]
	fn test_walk_error_fails_cycle() {
		let mut report = CycleReport::new(3);
		report.error = Some(MirrorError::Walk {
			root: PathBuf::from("/missing"),
			source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
		});
		assert_eq!(report.status(), CycleStatus::Failed);
		assert!(!report.is_success());
	}
}

// vim: ts=4
