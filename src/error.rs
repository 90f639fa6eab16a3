//! Error types for treemirror operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for mirroring operations
#[derive(Debug)]
pub enum MirrorError {
	/// Invalid configuration (bad arguments, interval, directories)
	InvalidConfig { message: String },

	/// A tree root (or a directory below it) could not be walked
	Walk { root: PathBuf, source: io::Error },

	/// A file could not be read for fingerprinting
	Read { path: PathBuf, source: io::Error },

	/// A filesystem mutation on the replica failed
	Write { path: PathBuf, operation: &'static str, source: io::Error },

	/// Directory still had entries when it was removed
	DirectoryNotEmpty { path: PathBuf },

	/// The background scheduler task panicked or was aborted
	TaskFailed { message: String },
}

impl MirrorError {
	/// Shorthand for configuration errors
	pub fn config<S: Into<String>>(message: S) -> Self {
		MirrorError::InvalidConfig { message: message.into() }
	}

	/// True for errors that must stop the process before scheduling starts
	pub fn is_fatal(&self) -> bool {
		matches!(self, MirrorError::InvalidConfig { .. })
	}

	fn io_error(&self) -> Option<&io::Error> {
		match self {
			MirrorError::Walk { source, .. }
			| MirrorError::Read { source, .. }
			| MirrorError::Write { source, .. } => Some(source),
			_ => None,
		}
	}
}

impl fmt::Display for MirrorError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MirrorError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			MirrorError::Walk { root, source } => {
				write!(f, "Cannot walk {}: {}", root.display(), source)
			}
			MirrorError::Read { path, source } => {
				write!(f, "Cannot read {}: {}", path.display(), source)
			}
			MirrorError::Write { path, operation, source } => {
				if source.kind() == io::ErrorKind::PermissionDenied {
					write!(f, "Permission denied: could not {} {}", operation, path.display())
				} else {
					write!(f, "OS error while trying to {} {}: {}", operation, path.display(), source)
				}
			}
			MirrorError::DirectoryNotEmpty { path } => {
				write!(f, "Directory {} is not empty", path.display())
			}
			MirrorError::TaskFailed { message } => write!(f, "Scheduler task failed: {}", message),
		}
	}
}

impl Error for MirrorError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self.io_error() {
			Some(e) => Some(e),
			None => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_config_error_is_fatal() {
		let err = MirrorError::config("interval must be positive");
		assert!(err.is_fatal());
		assert!(err.to_string().contains("interval must be positive"));
	}

	#[test]
	fn test_write_error_permission_message() {
		let err = MirrorError::Write {
			path: PathBuf::from("/replica/a.txt"),
			operation: "delete",
			source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
		};
		assert!(!err.is_fatal());
		assert_eq!(err.to_string(), "Permission denied: could not delete /replica/a.txt");
		assert!(err.source().is_some());
	}

	#[test]
	fn test_walk_error_keeps_source() {
		let err = MirrorError::Walk {
			root: PathBuf::from("/source/sub"),
			source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
		};
		assert_eq!(err.to_string(), "Cannot walk /source/sub: denied");
		assert!(err.source().is_some());
		assert!(MirrorError::DirectoryNotEmpty { path: PathBuf::from("d") }.source().is_none());
	}
}

// vim: ts=4
