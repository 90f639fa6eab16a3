//! Tree comparison: classifies every path of two snapshots into actions
//!
//! The emitted sequence is ordered so that it can be applied one action at
//! a time:
//! 1. Deletes, deepest paths first (children always before their parent)
//! 2. Creates, shallowest paths first (parents always before children),
//!    directories before files at the same depth
//! 3. Updates, which only touch files whose parent already exists
//!
//! A path that is a file on one side and a directory on the other becomes a
//! Delete of the replica entry followed by a Create of the source entry.
//!
//! Subtrees that could not be listed are left alone: nothing below an
//! unreadable source path is deleted, and nothing below an unreadable
//! replica path is created.

use std::cmp::Ordering;
use std::fmt;
use std::io;

use crate::error::MirrorError;
use crate::hash::Fingerprinter;
use crate::logging::*;
use crate::types::{path_depth, EntryKind, PathEntry, SyncAction, TreeSnapshot};

/// A path the comparison could not fully inspect. A file that could not be
/// fingerprinted is treated as changed; a subtree that could not be listed
/// is left untouched.
#[derive(Debug)]
pub struct SyncWarning {
	pub path: String,
	pub error: MirrorError,
}

impl fmt::Display for SyncWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.error {
			MirrorError::Walk { .. } => {
				write!(f, "Cannot list '{}', leaving it untouched: {}", self.path, self.error)
			}
			_ => write!(f, "Cannot fingerprint '{}', assuming changed: {}", self.path, self.error),
		}
	}
}

/// Result of comparing two snapshots
#[derive(Debug, Default)]
pub struct Diff {
	pub actions: Vec<SyncAction>,
	pub warnings: Vec<SyncWarning>,
}

impl Diff {
	pub fn is_empty(&self) -> bool {
		self.actions.is_empty()
	}
}

/// Compare `source` against `replica` and return the ordered action list.
///
/// Fingerprints are only computed for files present on both sides with
/// equal sizes.
pub async fn diff(source: &TreeSnapshot, replica: &TreeSnapshot, hasher: &dyn Fingerprinter) -> Diff {
	let mut creates = Vec::new();
	let mut deletes = Vec::new();
	let mut updates = Vec::new();
	let mut warnings = Vec::new();

	for tree in &[source, replica] {
		for (path, error) in tree.unreadable() {
			let error = MirrorError::Walk {
				root: tree.root().join(path),
				source: io::Error::new(error.kind(), error.to_string()),
			};
			warnings.push(SyncWarning { path: path.to_string(), error });
		}
	}

	for src in source.entries() {
		let rep = match replica.get(&src.path) {
			Some(rep) => rep,
			None if replica.is_unknown(&src.path) => continue,
			None => {
				creates.push(SyncAction::Create { path: src.path.clone(), kind: src.kind });
				continue;
			}
		};

		if rep.kind != src.kind {
			debug!("{} changed kind ({} -> {})", src.path, rep.kind, src.kind);
			deletes.push(SyncAction::Delete { path: rep.path.clone(), kind: rep.kind });
			creates.push(SyncAction::Create { path: src.path.clone(), kind: src.kind });
			continue;
		}

		if src.is_dir() {
			continue;
		}

		match file_changed(source, src, replica, rep, hasher).await {
			Ok(false) => {}
			Ok(true) => updates.push(SyncAction::Update { path: src.path.clone() }),
			Err(error) => {
				let warning = SyncWarning { path: src.path.clone(), error };
				warn!("{}", warning);
				warnings.push(warning);
				updates.push(SyncAction::Update { path: src.path.clone() });
			}
		}
	}

	for rep in replica.entries() {
		if !source.contains(&rep.path) && !source.is_unknown(&rep.path) {
			deletes.push(SyncAction::Delete { path: rep.path.clone(), kind: rep.kind });
		}
	}

	creates.sort_by(create_order);
	deletes.sort_by(delete_order);
	updates.sort_by(|a, b| a.path().cmp(b.path()));

	let mut actions = deletes;
	actions.append(&mut creates);
	actions.append(&mut updates);

	Diff { actions, warnings }
}

/// Decide whether a file present on both sides differs in content
async fn file_changed(
	source: &TreeSnapshot,
	src: &PathEntry,
	replica: &TreeSnapshot,
	rep: &PathEntry,
	hasher: &dyn Fingerprinter,
) -> Result<bool, MirrorError> {
	if src.size != rep.size {
		return Ok(true);
	}
	let src_digest = src.fingerprint(source.root(), hasher).await?;
	let rep_digest = rep.fingerprint(replica.root(), hasher).await?;
	Ok(src_digest != rep_digest)
}

fn kind_rank(kind: EntryKind) -> u8 {
	match kind {
		EntryKind::Directory => 0,
		EntryKind::File | EntryKind::Special => 1,
	}
}

fn create_order(a: &SyncAction, b: &SyncAction) -> Ordering {
	path_depth(a.path())
		.cmp(&path_depth(b.path()))
		.then_with(|| kind_rank(a.kind()).cmp(&kind_rank(b.kind())))
		.then_with(|| a.path().cmp(b.path()))
}

fn delete_order(a: &SyncAction, b: &SyncAction) -> Ordering {
	path_depth(b.path()).cmp(&path_depth(a.path())).then_with(|| b.path().cmp(a.path()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::hash::{Blake3Fingerprinter, Digest};
	use crate::walk::{snapshot, Exclusions};
	use async_trait::async_trait;
	use std::fs;
	use std::io;
	use std::path::{Path, PathBuf};
	use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
	use tempfile::TempDir;

	fn write(root: &Path, rel: &str, content: &str) {
		let path = root.join(rel);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).unwrap();
		}
		fs::write(path, content).unwrap();
	}

	async fn diff_dirs(src: &Path, rep: &Path, hasher: &dyn Fingerprinter) -> Diff {
		let source = snapshot(src, &Exclusions::default()).await.unwrap();
		let replica = snapshot(rep, &Exclusions::default()).await.unwrap();
		diff(&source, &replica, hasher).await
	}

	fn create(path: &str, kind: EntryKind) -> SyncAction {
		SyncAction::Create { path: path.to_string(), kind }
	}

	fn delete(path: &str, kind: EntryKind) -> SyncAction {
		SyncAction::Delete { path: path.to_string(), kind }
	}

	fn entry(path: &str, kind: EntryKind) -> PathEntry {
		PathEntry::new(path.to_string(), kind, 0, None)
	}

	fn denied() -> io::Error {
		io::Error::new(io::ErrorKind::PermissionDenied, "denied")
	}

	fn position(actions: &[SyncAction], action: &SyncAction) -> usize {
		actions.iter().position(|a| a == action).unwrap_or_else(|| panic!("{} missing", action))
	}

	/// Counts calls and fails for paths ending in the given suffix
	struct CountingFingerprinter {
		calls: AtomicUsize,
		fail_suffix: Option<&'static str>,
	}

	#[async_trait]
	impl Fingerprinter for CountingFingerprinter {
		async fn fingerprint(&self, path: &Path) -> Result<Digest, MirrorError> {
			self.calls.fetch_add(1, AtomicOrdering::SeqCst);
			if let Some(suffix) = self.fail_suffix {
				if path.to_string_lossy().ends_with(suffix) {
					return Err(MirrorError::Read {
						path: path.to_path_buf(),
						source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
					});
				}
			}
			Blake3Fingerprinter::default().fingerprint(path).await
		}
	}

	#[tokio::test]
	async fn test_empty_replica_creates_in_order() {
		let src = TempDir::new().unwrap();
		let rep = TempDir::new().unwrap();
		write(src.path(), "a.txt", "hi");
		write(src.path(), "dir/b.txt", "yo");

		let result = diff_dirs(src.path(), rep.path(), &Blake3Fingerprinter::default()).await;
		assert_eq!(
			result.actions,
			vec![
				create("dir", EntryKind::Directory),
				create("a.txt", EntryKind::File),
				create("dir/b.txt", EntryKind::File),
			]
		);
	}

	#[tokio::test]
	async fn test_creation_parent_before_child() {
		let src = TempDir::new().unwrap();
		let rep = TempDir::new().unwrap();
		write(src.path(), "x/y/z.txt", "z");
		write(src.path(), "x/a/b/c.txt", "c");

		let result = diff_dirs(src.path(), rep.path(), &Blake3Fingerprinter::default()).await;
		let actions = &result.actions;
		assert!(position(actions, &create("x", EntryKind::Directory)) < position(actions, &create("x/y", EntryKind::Directory)));
		assert!(position(actions, &create("x/y", EntryKind::Directory)) < position(actions, &create("x/y/z.txt", EntryKind::File)));
		assert!(position(actions, &create("x/a/b", EntryKind::Directory)) < position(actions, &create("x/a/b/c.txt", EntryKind::File)));
	}

	#[tokio::test]
	async fn test_deletion_children_before_parent() {
		let src = TempDir::new().unwrap();
		let rep = TempDir::new().unwrap();
		write(rep.path(), "a/b/c.txt", "c");
		write(rep.path(), "a/b/d/e.txt", "e");
		write(rep.path(), "old.txt", "old");

		let result = diff_dirs(src.path(), rep.path(), &Blake3Fingerprinter::default()).await;
		let actions = &result.actions;
		assert_eq!(actions.len(), 6);
		assert!(position(actions, &delete("a/b/c.txt", EntryKind::File)) < position(actions, &delete("a/b", EntryKind::Directory)));
		assert!(position(actions, &delete("a/b/d/e.txt", EntryKind::File)) < position(actions, &delete("a/b/d", EntryKind::Directory)));
		assert!(position(actions, &delete("a/b/d", EntryKind::Directory)) < position(actions, &delete("a/b", EntryKind::Directory)));
		assert!(position(actions, &delete("a/b", EntryKind::Directory)) < position(actions, &delete("a", EntryKind::Directory)));
	}

	#[tokio::test]
	async fn test_identical_trees_produce_no_actions() {
		let src = TempDir::new().unwrap();
		let rep = TempDir::new().unwrap();
		for root in &[src.path(), rep.path()] {
			write(root, "a.txt", "same");
			write(root, "dir/b.txt", "same too");
		}

		let result = diff_dirs(src.path(), rep.path(), &Blake3Fingerprinter::default()).await;
		assert!(result.is_empty());
		assert!(result.warnings.is_empty());
	}

	#[tokio::test]
	async fn test_same_size_different_content_is_update() {
		let src = TempDir::new().unwrap();
		let rep = TempDir::new().unwrap();
		write(src.path(), "a.txt", "v2");
		write(rep.path(), "a.txt", "v1");

		let result = diff_dirs(src.path(), rep.path(), &Blake3Fingerprinter::default()).await;
		assert_eq!(result.actions, vec![SyncAction::Update { path: "a.txt".to_string() }]);
	}

	#[tokio::test]
	async fn test_size_difference_skips_hashing() {
		let src = TempDir::new().unwrap();
		let rep = TempDir::new().unwrap();
		write(src.path(), "a.txt", "longer content");
		write(rep.path(), "a.txt", "short");
		write(src.path(), "new.txt", "only in source");

		let hasher = CountingFingerprinter { calls: AtomicUsize::new(0), fail_suffix: None };
		let result = diff_dirs(src.path(), rep.path(), &hasher).await;
		assert_eq!(result.actions.len(), 2);
		assert_eq!(hasher.calls.load(AtomicOrdering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_fingerprint_failure_degrades_to_update() {
		let src = TempDir::new().unwrap();
		let rep = TempDir::new().unwrap();
		write(src.path(), "locked.bin", "data");
		write(rep.path(), "locked.bin", "data");
		write(src.path(), "fine.txt", "ok");
		write(rep.path(), "fine.txt", "ok");

		let hasher = CountingFingerprinter { calls: AtomicUsize::new(0), fail_suffix: Some("locked.bin") };
		let result = diff_dirs(src.path(), rep.path(), &hasher).await;
		assert_eq!(result.actions, vec![SyncAction::Update { path: "locked.bin".to_string() }]);
		assert_eq!(result.warnings.len(), 1);
		assert_eq!(result.warnings[0].path, "locked.bin");
		assert!(result.warnings[0].to_string().contains("assuming changed"));
	}

	#[tokio::test]
	async fn test_file_replaced_by_directory() {
		let src = TempDir::new().unwrap();
		let rep = TempDir::new().unwrap();
		write(src.path(), "thing/inner.txt", "inner");
		write(rep.path(), "thing", "was a file");

		let result = diff_dirs(src.path(), rep.path(), &Blake3Fingerprinter::default()).await;
		assert_eq!(
			result.actions,
			vec![
				delete("thing", EntryKind::File),
				create("thing", EntryKind::Directory),
				create("thing/inner.txt", EntryKind::File),
			]
		);
	}

	#[tokio::test]
	async fn test_directory_replaced_by_file() {
		let src = TempDir::new().unwrap();
		let rep = TempDir::new().unwrap();
		write(src.path(), "thing", "now a file");
		write(rep.path(), "thing/inner.txt", "inner");

		let result = diff_dirs(src.path(), rep.path(), &Blake3Fingerprinter::default()).await;
		assert_eq!(
			result.actions,
			vec![
				delete("thing/inner.txt", EntryKind::File),
				delete("thing", EntryKind::Directory),
				create("thing", EntryKind::File),
			]
		);
	}

	#[test]
	fn test_create_order_directories_first_at_same_depth() {
		let mut actions = vec![
			create("b.txt", EntryKind::File),
			create("z", EntryKind::Directory),
			create("a", EntryKind::Directory),
		];
		actions.sort_by(create_order);
		assert_eq!(actions[0].path(), "a");
		assert_eq!(actions[1].path(), "z");
		assert_eq!(actions[2].path(), "b.txt");
	}

	#[tokio::test]
	async fn test_unreadable_source_subtree_is_not_deleted() {
		let mut source = TreeSnapshot::new(PathBuf::from("/src"));
		source.insert(entry("sub", EntryKind::Directory));
		source.mark_unreadable("sub".to_string(), denied());
		source.mark_unreadable("locked.txt".to_string(), denied());

		let mut replica = TreeSnapshot::new(PathBuf::from("/rep"));
		replica.insert(entry("sub", EntryKind::Directory));
		replica.insert(entry("sub/a.txt", EntryKind::File));
		replica.insert(entry("sub/deep", EntryKind::Directory));
		replica.insert(entry("sub/deep/b.txt", EntryKind::File));
		replica.insert(entry("locked.txt", EntryKind::File));
		replica.insert(entry("orphan.txt", EntryKind::File));

		let result = diff(&source, &replica, &Blake3Fingerprinter::default()).await;
		assert_eq!(result.actions, vec![delete("orphan.txt", EntryKind::File)]);
		assert_eq!(result.warnings.len(), 2);
		assert!(result.warnings.iter().any(|w| w.path == "sub" && w.to_string().contains("leaving it untouched")));
	}

	#[tokio::test]
	async fn test_unreadable_replica_subtree_gets_no_creates() {
		let mut source = TreeSnapshot::new(PathBuf::from("/src"));
		source.insert(entry("sub", EntryKind::Directory));
		source.insert(entry("sub/a.txt", EntryKind::File));
		source.insert(entry("top.txt", EntryKind::File));

		let mut replica = TreeSnapshot::new(PathBuf::from("/rep"));
		replica.insert(entry("sub", EntryKind::Directory));
		replica.mark_unreadable("sub".to_string(), denied());

		let result = diff(&source, &replica, &Blake3Fingerprinter::default()).await;
		assert_eq!(result.actions, vec![create("top.txt", EntryKind::File)]);
		assert_eq!(result.warnings.len(), 1);
	}

	#[tokio::test]
	async fn test_special_replica_entry_replaced_by_source_file() {
		let mut source = TreeSnapshot::new(PathBuf::from("/src"));
		source.insert(entry("a.txt", EntryKind::File));

		let mut replica = TreeSnapshot::new(PathBuf::from("/rep"));
		replica.insert(entry("a.txt", EntryKind::Special));
		replica.insert(entry("link", EntryKind::Special));

		let hasher = CountingFingerprinter { calls: AtomicUsize::new(0), fail_suffix: None };
		let result = diff(&source, &replica, &hasher).await;
		assert_eq!(
			result.actions,
			vec![
				delete("link", EntryKind::Special),
				delete("a.txt", EntryKind::Special),
				create("a.txt", EntryKind::File),
			]
		);
		assert_eq!(hasher.calls.load(AtomicOrdering::SeqCst), 0);
	}
}

// vim: ts=4
