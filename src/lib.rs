//! # treemirror - One-way Periodic Directory Mirroring
//!
//! treemirror keeps a replica directory identical to a source directory.
//! Every interval it walks both trees, compares them by content
//! fingerprint, and applies the create, update and delete actions needed
//! to make the replica match. Failed actions are reported and retried on
//! the next cycle; they never stop the process.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use treemirror::SyncCycle;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cycle = SyncCycle::new("./source".into(), "./replica".into());
//!     let report = cycle.run(1).await;
//!     println!("{:?}: {:?}", report.status(), report.summary());
//! }
//! ```
//!
//! ## Running on an Interval
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use treemirror::{CancellationSignal, Scheduler, SyncCycle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cycle = SyncCycle::new("./source".into(), "./replica".into());
//!     let signal = Arc::new(CancellationSignal::new());
//!     let handle = Scheduler::new(cycle, Duration::from_secs(30), signal)?.spawn();
//!
//!     tokio::signal::ctrl_c().await?;
//!     let summary = handle.shutdown().await?;
//!     println!("{} cycles", summary.cycles_run);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod compare;
pub mod config;
pub mod cycle;
pub mod error;
pub mod events;
pub mod executor;
pub mod hash;
pub mod logging;
pub mod report;
pub mod scheduler;
pub mod types;
pub mod utils;
pub mod validation;
pub mod walk;

// Re-export commonly used types and functions
pub use cancel::CancellationSignal;
pub use compare::{diff, Diff, SyncWarning};
pub use config::MirrorConfig;
pub use cycle::SyncCycle;
pub use error::MirrorError;
pub use events::{EventSink, MirrorEvent, NoEvents, RecordedEvent, RecordingSink, TracingSink};
pub use executor::{MirrorExecutor, Outcome};
pub use hash::{Blake3Fingerprinter, Digest, Fingerprinter};
pub use report::{ActionRecord, CycleReport, CycleStatus, CycleSummary};
pub use scheduler::{Scheduler, SchedulerHandle, SchedulerState, SchedulerSummary};
pub use types::{EntryKind, PathEntry, SyncAction, TreeSnapshot};
pub use walk::{snapshot, snapshot_with, DirReader, Exclusions, FsDirReader, Side};

// vim: ts=4
