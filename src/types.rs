//! Core data model: path entries, tree snapshots and sync actions

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::OnceCell;

use crate::error::MirrorError;
use crate::hash::{Digest, Fingerprinter};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntryKind {
	File,
	Directory,
	/// Symlink, fifo, socket or device node found in the replica. Never
	/// mirrored from the source, only removed.
	Special,
}

impl fmt::Display for EntryKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EntryKind::File => write!(f, "file"),
			EntryKind::Directory => write!(f, "folder"),
			EntryKind::Special => write!(f, "special file"),
		}
	}
}

/// One file or directory found by a walk, keyed by its slash-normalized
/// path relative to the tree root.
#[derive(Debug)]
pub struct PathEntry {
	pub path: String,
	pub kind: EntryKind,
	pub size: u64,
	/// Informational only, never used for change detection
	pub modified: Option<SystemTime>,
	fingerprint: OnceCell<Digest>,
}

impl PathEntry {
	pub fn new(path: String, kind: EntryKind, size: u64, modified: Option<SystemTime>) -> Self {
		PathEntry { path, kind, size, modified, fingerprint: OnceCell::new() }
	}

	pub fn is_dir(&self) -> bool {
		self.kind == EntryKind::Directory
	}

	/// Number of path components (`a` is 1, `a/b` is 2)
	pub fn depth(&self) -> usize {
		path_depth(&self.path)
	}

	/// Fingerprint of the file under `root`, computed on first use and
	/// memoized for the rest of the cycle.
	pub async fn fingerprint(
		&self,
		root: &Path,
		hasher: &dyn Fingerprinter,
	) -> Result<Digest, MirrorError> {
		let abs = root.join(&self.path);
		let digest = self.fingerprint.get_or_try_init(|| hasher.fingerprint(&abs)).await?;
		Ok(*digest)
	}
}

pub fn path_depth(path: &str) -> usize {
	path.split('/').filter(|c| !c.is_empty()).count()
}

/// Flat mapping from relative path to entry for one tree.
///
/// Paths that could not be listed or stat'd are kept apart: their content
/// is unknown for this cycle, so nothing at or below them may be deleted.
#[derive(Debug)]
pub struct TreeSnapshot {
	root: PathBuf,
	entries: BTreeMap<String, PathEntry>,
	unreadable: BTreeMap<String, io::Error>,
}

impl TreeSnapshot {
	pub fn new(root: PathBuf) -> Self {
		TreeSnapshot { root, entries: BTreeMap::new(), unreadable: BTreeMap::new() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn insert(&mut self, entry: PathEntry) {
		self.entries.insert(entry.path.clone(), entry);
	}

	pub fn get(&self, path: &str) -> Option<&PathEntry> {
		self.entries.get(path)
	}

	pub fn contains(&self, path: &str) -> bool {
		self.entries.contains_key(path)
	}

	pub fn entries(&self) -> impl Iterator<Item = &PathEntry> {
		self.entries.values()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn mark_unreadable(&mut self, path: String, error: io::Error) {
		self.unreadable.insert(path, error);
	}

	pub fn unreadable(&self) -> impl Iterator<Item = (&str, &io::Error)> {
		self.unreadable.iter().map(|(path, error)| (path.as_str(), error))
	}

	/// True if `path` is, or lies below, a path that could not be read
	pub fn is_unknown(&self, path: &str) -> bool {
		self.unreadable.keys().any(|prefix| {
			path.strip_prefix(prefix.as_str())
				.map(|rest| rest.is_empty() || rest.starts_with('/'))
				.unwrap_or(false)
		})
	}
}

/// A single mirroring step, produced by the comparator and consumed once
/// by the executor.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SyncAction {
	Create { path: String, kind: EntryKind },
	Update { path: String },
	Delete { path: String, kind: EntryKind },
}

impl SyncAction {
	pub fn path(&self) -> &str {
		match self {
			SyncAction::Create { path, .. }
			| SyncAction::Update { path }
			| SyncAction::Delete { path, .. } => path,
		}
	}

	pub fn kind(&self) -> EntryKind {
		match self {
			SyncAction::Create { kind, .. } | SyncAction::Delete { kind, .. } => *kind,
			SyncAction::Update { .. } => EntryKind::File,
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			SyncAction::Create { .. } => "create",
			SyncAction::Update { .. } => "update",
			SyncAction::Delete { .. } => "delete",
		}
	}
}

impl fmt::Display for SyncAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {} '{}'", self.label(), self.kind(), self.path())
	}
}


// vim: ts=4
