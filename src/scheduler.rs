//! Periodic driver for `SyncCycle`
//!
//! The scheduler runs on its own tokio task. Cycles are strictly
//! sequential: ticks that elapse while a cycle is running are skipped,
//! not queued. A stop request is observed between cycles and while
//! waiting for the next tick; a cycle that is already running always
//! finishes.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::cancel::CancellationSignal;
use crate::cycle::SyncCycle;
use crate::error::MirrorError;
use crate::events::MirrorEvent;
use crate::logging::*;
use crate::report::{CycleReport, CycleStatus};
use crate::walk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
	/// Waiting for the next tick
	Armed,
	Running { cycle: u64 },
	/// Terminal
	Stopped,
}

/// What the scheduler did over its lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
	pub cycles_run: u64,
	pub cycles_partial: u64,
	pub cycles_failed: u64,
	pub ticks_skipped: u64,
}

impl SchedulerSummary {
	fn record(&mut self, report: &CycleReport) {
		self.cycles_run += 1;
		match report.status() {
			CycleStatus::Success => {}
			CycleStatus::PartialFailure => self.cycles_partial += 1,
			CycleStatus::Failed => self.cycles_failed += 1,
		}
	}
}

pub struct Scheduler {
	cycle: SyncCycle,
	interval: Duration,
	signal: Arc<CancellationSignal>,
	cleanup_temp_files: bool,
}

impl Scheduler {
	pub fn new(cycle: SyncCycle, interval: Duration, signal: Arc<CancellationSignal>) -> Result<Self, MirrorError> {
		if interval.is_zero() {
			return Err(MirrorError::config("Interval must be greater than zero"));
		}
		Ok(Scheduler { cycle, interval, signal, cleanup_temp_files: true })
	}

	/// Remove leftover temporary copies from the replica before the first cycle
	pub fn with_temp_cleanup(mut self, enabled: bool) -> Self {
		self.cleanup_temp_files = enabled;
		self
	}

	/// Start the scheduler on a new task. The first cycle begins immediately.
	pub fn spawn(self) -> SchedulerHandle {
		let (state_tx, state_rx) = watch::channel(SchedulerState::Armed);
		let signal = self.signal.clone();
		let join = tokio::spawn(self.run(state_tx));
		SchedulerHandle { join, signal, state: state_rx }
	}

	/// Run until the signal is set. Normally driven through `spawn`.
	pub async fn run(self, state: watch::Sender<SchedulerState>) -> SchedulerSummary {
		let mut summary = SchedulerSummary::default();

		if self.cleanup_temp_files && !self.signal.is_signalled() {
			let removed = walk::cleanup_temp_files(self.cycle.replica_root()).await;
			if removed > 0 {
				info!("Removed {} leftover temporary file(s) from the replica", removed);
			}
		}

		let mut next_tick = Some(Instant::now());
		while let Some(deadline) = next_tick {
			tokio::select! {
				biased;
				_ = self.signal.signalled() => break,
				_ = time::sleep_until(deadline) => {}
			}
			if self.signal.is_signalled() {
				break;
			}

			let cycle = summary.cycles_run + 1;
			state.send_replace(SchedulerState::Running { cycle });
			let report = self.cycle.run(cycle).await;
			summary.record(&report);
			state.send_replace(SchedulerState::Armed);

			next_tick = self.next_deadline(deadline, Instant::now(), &mut summary);
			if next_tick.is_none() {
				warn!("Next cycle is beyond the clock range, waiting for a stop request");
				self.signal.signalled().await;
			}
		}

		state.send_replace(SchedulerState::Stopped);
		self.cycle.sink().on_event(MirrorEvent::Stopped { cycles: summary.cycles_run });
		summary
	}

	/// First grid point after `now`, counting the ticks skipped on the way.
	/// None once the grid leaves the range `Instant` can represent.
	fn next_deadline(&self, mut deadline: Instant, now: Instant, summary: &mut SchedulerSummary) -> Option<Instant> {
		loop {
			deadline = deadline.checked_add(self.interval)?;
			if deadline > now {
				return Some(deadline);
			}
			debug!(cycle = summary.cycles_run, "Cycle overran the interval, skipping a tick");
			summary.ticks_skipped += 1;
		}
	}
}

/// Owner's handle to a spawned scheduler
pub struct SchedulerHandle {
	join: JoinHandle<SchedulerSummary>,
	signal: Arc<CancellationSignal>,
	state: watch::Receiver<SchedulerState>,
}

impl SchedulerHandle {
	pub fn state(&self) -> SchedulerState {
		*self.state.borrow()
	}

	/// Watch state transitions
	pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
		self.state.clone()
	}

	pub fn signal(&self) -> &Arc<CancellationSignal> {
		&self.signal
	}

	/// Resolves once the scheduler task has ended, whether it stopped
	/// normally or died. Does not request a stop.
	pub async fn stopped(&self) {
		let mut state = self.state.clone();
		while *state.borrow_and_update() != SchedulerState::Stopped {
			if state.changed().await.is_err() {
				// Sender dropped: the task is gone
				return;
			}
		}
	}

	/// Request a stop and wait for the scheduler to finish its current cycle
	pub async fn shutdown(self) -> Result<SchedulerSummary, MirrorError> {
		self.signal.signal();
		self.join().await
	}

	/// Wait for the scheduler task to end without requesting a stop
	pub async fn join(self) -> Result<SchedulerSummary, MirrorError> {
		self.join.await.map_err(|e| MirrorError::TaskFailed { message: e.to_string() })
	}
}


// vim: ts=4
