//! Applies sync actions to the replica tree

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs as afs;
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::error::MirrorError;
use crate::hash::DEFAULT_BUFFER_SIZE;
use crate::logging::*;
use crate::types::{EntryKind, SyncAction};
use crate::validation::validate_relative_path;
use crate::walk::TEMP_SUFFIX;

/// Result of applying one action
#[derive(Debug)]
pub enum Outcome {
	Success,
	Failure(MirrorError),
}

impl Outcome {
	pub fn is_success(&self) -> bool {
		matches!(self, Outcome::Success)
	}

	pub fn error(&self) -> Option<&MirrorError> {
		match self {
			Outcome::Success => None,
			Outcome::Failure(e) => Some(e),
		}
	}
}

impl From<Result<(), MirrorError>> for Outcome {
	fn from(result: Result<(), MirrorError>) -> Self {
		match result {
			Ok(()) => Outcome::Success,
			Err(e) => Outcome::Failure(e),
		}
	}
}

/// Mirrors single actions from the source root onto the replica root
#[derive(Debug, Clone)]
pub struct MirrorExecutor {
	source_root: PathBuf,
	replica_root: PathBuf,
	buffer_size: usize,
}

impl MirrorExecutor {
	pub fn new(source_root: PathBuf, replica_root: PathBuf) -> Self {
		MirrorExecutor { source_root, replica_root, buffer_size: DEFAULT_BUFFER_SIZE }
	}

	pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
		self.buffer_size = buffer_size.max(1);
		self
	}

	/// Apply one action. Failures are returned as `Outcome::Failure`,
	/// never as a panic or early exit.
	pub async fn apply(&self, action: &SyncAction) -> Outcome {
		self.try_apply(action).await.into()
	}

	async fn try_apply(&self, action: &SyncAction) -> Result<(), MirrorError> {
		validate_relative_path(Path::new(action.path())).map_err(|e| {
			write_err(Path::new(action.path()), "resolve", io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
		})?;

		match action {
			SyncAction::Create { path, kind: EntryKind::Directory } => self.create_dir(path).await,
			SyncAction::Create { path, kind: EntryKind::File } | SyncAction::Update { path } => {
				self.copy_file(path).await
			}
			SyncAction::Create { path, kind: EntryKind::Special } => Err(write_err(
				&self.replica_root.join(path),
				"create",
				io::Error::new(io::ErrorKind::InvalidInput, "special files are not mirrored"),
			)),
			// remove_file unlinks a symlink itself, never its target
			SyncAction::Delete { path, kind: EntryKind::File }
			| SyncAction::Delete { path, kind: EntryKind::Special } => self.remove_file(path).await,
			SyncAction::Delete { path, kind: EntryKind::Directory } => self.remove_dir(path).await,
		}
	}

	async fn create_dir(&self, rel: &str) -> Result<(), MirrorError> {
		let target = self.replica_root.join(rel);
		match afs::create_dir(&target).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
				// Someone else got there first; fine as long as it is a directory
				match afs::symlink_metadata(&target).await {
					Ok(meta) if meta.is_dir() => Ok(()),
					_ => Err(write_err(&target, "create folder", e)),
				}
			}
			Err(e) => Err(write_err(&target, "create folder", e)),
		}
	}

	/// Copy the full source file into a temporary sibling of the target,
	/// then rename it into place.
	async fn copy_file(&self, rel: &str) -> Result<(), MirrorError> {
		let source = self.source_root.join(rel);
		let target = self.replica_root.join(rel);
		let tmp = temp_path_for(&target);

		let result = self.copy_to_temp(&source, &tmp).await;
		let result = match result {
			Ok(()) => afs::rename(&tmp, &target).await.map_err(|e| write_err(&target, "copy/update", e)),
			Err(e) => Err(e),
		};

		if result.is_err() {
			if let Err(e) = afs::remove_file(&tmp).await {
				if e.kind() != io::ErrorKind::NotFound {
					warn!("Failed to remove temp file {}: {}", tmp.display(), e);
				}
			}
		}
		result
	}

	async fn copy_to_temp(&self, source: &Path, tmp: &Path) -> Result<(), MirrorError> {
		let reader = afs::File::open(source)
			.await
			.map_err(|e| MirrorError::Read { path: source.to_path_buf(), source: e })?;
		let mut reader = BufReader::with_capacity(self.buffer_size, reader);

		let mut writer = afs::File::create(tmp).await.map_err(|e| write_err(tmp, "copy/update", e))?;
		let bytes = tokio::io::copy_buf(&mut reader, &mut writer)
			.await
			.map_err(|e| write_err(tmp, "copy/update", e))?;
		writer.flush().await.map_err(|e| write_err(tmp, "copy/update", e))?;
		writer.sync_all().await.map_err(|e| write_err(tmp, "copy/update", e))?;

		debug!("Copied {} bytes from {} to {}", bytes, source.display(), tmp.display());
		Ok(())
	}

	async fn remove_file(&self, rel: &str) -> Result<(), MirrorError> {
		let target = self.replica_root.join(rel);
		match afs::remove_file(&target).await {
			Ok(()) => Ok(()),
			// Already converged
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(write_err(&target, "delete", e)),
		}
	}

	async fn remove_dir(&self, rel: &str) -> Result<(), MirrorError> {
		let target = self.replica_root.join(rel);
		match afs::remove_dir(&target).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => {
				if has_entries(&target).await {
					Err(MirrorError::DirectoryNotEmpty { path: target })
				} else {
					Err(write_err(&target, "delete", e))
				}
			}
		}
	}
}

fn write_err(path: &Path, operation: &'static str, source: io::Error) -> MirrorError {
	MirrorError::Write { path: path.to_path_buf(), operation, source }
}

/// Hidden sibling of `target` with a unique name and the temp suffix
fn temp_path_for(target: &Path) -> PathBuf {
	let name = target.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
	let tmp_name = format!(".{}.{}{}", name, Uuid::new_v4().simple(), TEMP_SUFFIX);
	match target.parent() {
		Some(parent) => parent.join(tmp_name),
		None => PathBuf::from(tmp_name),
	}
}

async fn has_entries(dir: &Path) -> bool {
	match afs::read_dir(dir).await {
		Ok(mut listing) => matches!(listing.next_entry().await, Ok(Some(_))),
		Err(_) => false,
	}
}


// vim: ts=4
