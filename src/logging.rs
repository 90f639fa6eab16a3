//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("This is an info message");
//! warn!("This is a warning");
//! ```

pub use tracing::{debug, error, info, warn};

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::MirrorError;

/// Initialize the tracing subscriber.
///
/// Records go to stderr and, when `log_file` is set, are appended to that
/// file without ANSI colors. `level` is the default filter; the `RUST_LOG`
/// environment variable overrides it:
///
/// ```bash
/// RUST_LOG=debug treemirror ./src ./replica 30
/// RUST_LOG=treemirror::executor=debug treemirror ./src ./replica 30
/// ```
pub fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<(), MirrorError> {
	let filter = match EnvFilter::try_from_default_env() {
		Ok(filter) => filter,
		Err(_) => EnvFilter::try_new(level)
			.map_err(|e| MirrorError::config(format!("Invalid log level '{}': {}", level, e)))?,
	};

	let file_layer = match log_file {
		Some(path) => {
			let file = OpenOptions::new().create(true).append(true).open(path).map_err(|e| {
				MirrorError::config(format!("Cannot open log file {}: {}", path.display(), e))
			})?;
			Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
		}
		None => None,
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.with(file_layer)
		.try_init()
		.map_err(|e| MirrorError::config(format!("Cannot install log subscriber: {}", e)))
}

// vim: ts=4
