//! Directory walking: builds a flat `TreeSnapshot` for one root

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs as afs;

use crate::error::MirrorError;
use crate::logging::*;
use crate::types::{EntryKind, PathEntry, TreeSnapshot};
use crate::validation::normalize_relative;

/// Suffix of in-flight copies in the replica tree
pub const TEMP_SUFFIX: &str = ".treemirror-tmp";

/// Glob-based exclusion rules, applied to slash-normalized relative paths
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
	patterns: Vec<glob::Pattern>,
}

impl Exclusions {
	pub fn new(patterns: &[String]) -> Result<Self, MirrorError> {
		let patterns = patterns
			.iter()
			.map(|p| {
				glob::Pattern::new(p).map_err(|e| {
					MirrorError::config(format!("Invalid exclude pattern '{}': {}", p, e))
				})
			})
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Exclusions { patterns })
	}

	/// True if `rel_path` must not be mirrored. Temporary copies are always
	/// excluded.
	pub fn is_excluded(&self, rel_path: &str) -> bool {
		if is_temp_name(rel_path) {
			return true;
		}
		self.patterns.iter().any(|p| p.matches(rel_path))
	}
}

fn walk_err(dir: &Path, source: io::Error) -> MirrorError {
	MirrorError::Walk { root: dir.to_path_buf(), source }
}

fn is_temp_name(rel_path: &str) -> bool {
	rel_path.rsplit('/').next().map(|name| name.ends_with(TEMP_SUFFIX)).unwrap_or(false)
}

/// Which tree a walk covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
	/// Symlinks and special files are skipped, they are never mirrored
	Source,
	/// Symlinks and special files are recorded as `EntryKind::Special` so
	/// that the comparator can remove them
	Replica,
}

/// Lists the immediate children of a directory
#[async_trait]
pub trait DirReader: Send + Sync {
	async fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// `DirReader` backed by `tokio::fs::read_dir`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirReader;

#[async_trait]
impl DirReader for FsDirReader {
	async fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
		let mut listing = afs::read_dir(dir).await?;
		let mut children = Vec::new();
		while let Some(entry) = listing.next_entry().await? {
			children.push(entry.path());
		}
		Ok(children)
	}
}

/// Walk a source tree from the filesystem. See `snapshot_with`.
pub async fn snapshot(root: &Path, exclusions: &Exclusions) -> Result<TreeSnapshot, MirrorError> {
	snapshot_with(root, exclusions, Side::Source, &FsDirReader).await
}

/// Walk `root` recursively and record every entry under it.
///
/// Fails with `MirrorError::Walk` only if the root itself is missing, is
/// not a directory, or cannot be listed. A directory below the root that
/// cannot be listed keeps its own entry and is marked unreadable, as is an
/// entry that cannot be stat'd; the comparator leaves those subtrees alone
/// for this cycle.
pub async fn snapshot_with(
	root: &Path,
	exclusions: &Exclusions,
	side: Side,
	reader: &dyn DirReader,
) -> Result<TreeSnapshot, MirrorError> {
	let meta = afs::metadata(root).await.map_err(|e| walk_err(root, e))?;
	if !meta.is_dir() {
		return Err(walk_err(root, io::Error::new(io::ErrorKind::Other, "not a directory")));
	}

	let mut snapshot = TreeSnapshot::new(root.to_path_buf());
	let mut pending: Vec<(PathBuf, Option<String>)> = vec![(root.to_path_buf(), None)];

	while let Some((dir, dir_rel)) = pending.pop() {
		let children = match (reader.list(&dir).await, dir_rel) {
			(Ok(children), _) => children,
			(Err(e), None) => return Err(walk_err(&dir, e)),
			(Err(e), Some(rel)) => {
				debug!("Cannot list {}: {}", dir.display(), e);
				snapshot.mark_unreadable(rel, e);
				continue;
			}
		};

		for path in children {
			let rel = match path.strip_prefix(root).ok().and_then(normalize_relative) {
				Some(rel) => rel,
				None => {
					warn!("Skipping {}: name is not valid UTF-8", path.display());
					continue;
				}
			};

			if exclusions.is_excluded(&rel) {
				debug!("Excluded {}", rel);
				continue;
			}

			let meta = match afs::symlink_metadata(&path).await {
				Ok(m) => m,
				Err(e) if e.kind() == io::ErrorKind::NotFound => {
					// Vanished between listing and stat
					debug!("{} disappeared during walk", path.display());
					continue;
				}
				Err(e) => {
					debug!("Cannot stat {}: {}", path.display(), e);
					snapshot.mark_unreadable(rel, e);
					continue;
				}
			};

			let kind = if meta.is_dir() {
				EntryKind::Directory
			} else if meta.is_file() {
				EntryKind::File
			} else if side == Side::Replica {
				EntryKind::Special
			} else {
				debug!("Skipping {}: not a regular file or directory", rel);
				continue;
			};

			let size = if kind == EntryKind::File { meta.len() } else { 0 };
			snapshot.insert(PathEntry::new(rel.clone(), kind, size, meta.modified().ok()));
			if kind == EntryKind::Directory {
				pending.push((path, Some(rel)));
			}
		}
	}

	Ok(snapshot)
}

/// Remove temporary copies left behind by an interrupted run.
///
/// Returns the number of files removed. Unreadable directories are logged
/// and skipped.
pub async fn cleanup_temp_files(root: &Path) -> usize {
	let mut count = 0;
	let mut pending = vec![root.to_path_buf()];

	while let Some(dir) = pending.pop() {
		let mut listing = match afs::read_dir(&dir).await {
			Ok(l) => l,
			Err(e) => {
				warn!("Cannot read directory {} during cleanup: {}", dir.display(), e);
				continue;
			}
		};

		loop {
			let entry = match listing.next_entry().await {
				Ok(Some(entry)) => entry,
				Ok(None) => break,
				Err(e) => {
					debug!("Error reading directory entry during cleanup: {}", e);
					break;
				}
			};
			let path = entry.path();
			let meta = match afs::symlink_metadata(&path).await {
				Ok(m) => m,
				Err(_) => continue,
			};

			if meta.is_dir() {
				pending.push(path);
			} else if meta.is_file() && path.to_str().map(is_temp_name).unwrap_or(false) {
				match afs::remove_file(&path).await {
					Ok(()) => {
						debug!("Removed orphaned temp file {}", path.display());
						count += 1;
					}
					Err(e) if e.kind() == io::ErrorKind::NotFound => {}
					Err(e) => warn!("Failed to remove temp file {}: {}", path.display(), e),
				}
			}
		}
	}

	if count > 0 {
		info!("Cleaned up {} orphaned temporary files", count);
	}
	count
}


// vim: ts=4
