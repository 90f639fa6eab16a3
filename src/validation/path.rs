//! Path validation functions

use std::path::{Component, Path, PathBuf};

use super::ValidationError;

/// Check if a path is safe (no parent directory references)
pub fn is_path_safe(path: &Path) -> bool {
	!path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Validate a relative path is safe to join onto a tree root
///
/// # Returns
/// `Ok(())` if valid, `Err(ValidationError)` if path is absolute or
/// contains dangerous components
pub fn validate_relative_path(path: &Path) -> Result<(), ValidationError> {
	if path.is_absolute() {
		return Err(ValidationError::PathError(format!(
			"Path must be relative, got absolute path: {:?}",
			path
		)));
	}
	if !is_path_safe(path) {
		return Err(ValidationError::PathError(
			"Path contains parent directory reference (..)".to_string(),
		));
	}
	Ok(())
}

/// Slash-normalized form of a relative path
///
/// Returns `None` for paths that are not valid UTF-8 or that contain
/// anything other than plain name components.
pub fn normalize_relative(path: &Path) -> Option<String> {
	let mut parts = Vec::new();
	for component in path.components() {
		match component {
			Component::Normal(name) => parts.push(name.to_str()?),
			Component::CurDir => {}
			_ => return None,
		}
	}
	if parts.is_empty() {
		return None;
	}
	Some(parts.join("/"))
}

/// Check that `path` exists and is a directory, returning its canonical form
///
/// # Arguments
/// * `path` - Directory to check
/// * `role` - "Source" or "Replica", used in the error message
pub fn validate_directory(path: &Path, role: &str) -> Result<PathBuf, ValidationError> {
	match std::fs::metadata(path) {
		Ok(meta) if meta.is_dir() => path.canonicalize().map_err(|e| {
			ValidationError::PathError(format!("{} dir '{}': {}", role, path.display(), e))
		}),
		Ok(_) => Err(ValidationError::PathError(format!(
			"{} dir '{}' is not a directory!",
			role,
			path.display()
		))),
		Err(_) => Err(ValidationError::PathError(format!(
			"{} dir '{}' does not exist!",
			role,
			path.display()
		))),
	}
}

/// Reject roots that are the same directory or nested in each other
///
/// Both paths are expected to be canonical.
pub fn validate_disjoint_roots(source: &Path, replica: &Path) -> Result<(), ValidationError> {
	if source == replica {
		return Err(ValidationError::PathError(format!(
			"Source and replica are the same directory: {}",
			source.display()
		)));
	}
	if replica.starts_with(source) {
		return Err(ValidationError::PathError(format!(
			"Replica {} is inside source {}",
			replica.display(),
			source.display()
		)));
	}
	if source.starts_with(replica) {
		return Err(ValidationError::PathError(format!(
			"Source {} is inside replica {}",
			source.display(),
			replica.display()
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn test_is_path_safe() {
		assert!(is_path_safe(Path::new("dir/file.txt")));
		assert!(!is_path_safe(Path::new("dir/../file.txt")));
	}

	#[test]
	fn test_validate_relative_path() {
		assert!(validate_relative_path(Path::new("a/b.txt")).is_ok());
		assert!(validate_relative_path(Path::new("/abs")).unwrap_err().to_string().contains("relative"));
		assert!(validate_relative_path(Path::new("../x")).is_err());
	}

	#[test]
	fn test_normalize_relative() {
		assert_eq!(normalize_relative(Path::new("a/b/c.txt")), Some("a/b/c.txt".to_string()));
		assert_eq!(normalize_relative(Path::new("./a")), Some("a".to_string()));
		assert_eq!(normalize_relative(Path::new("a/../b")), None);
		assert_eq!(normalize_relative(Path::new("")), None);
	}

	#[test]
	fn test_validate_directory() {
		let dir = TempDir::new().unwrap();
		assert!(validate_directory(dir.path(), "Source").is_ok());

		let missing = dir.path().join("missing");
		let err = validate_directory(&missing, "Replica").unwrap_err();
		assert!(err.to_string().contains("does not exist"));

		let file = dir.path().join("file");
		std::fs::write(&file, b"x").unwrap();
		assert!(validate_directory(&file, "Source").unwrap_err().to_string().contains("not a directory"));
	}

	#[test]
	fn test_validate_disjoint_roots() {
		assert!(validate_disjoint_roots(Path::new("/data/src"), Path::new("/data/replica")).is_ok());
		assert!(validate_disjoint_roots(Path::new("/data/src"), Path::new("/data/src")).is_err());
		assert!(validate_disjoint_roots(Path::new("/data/src"), Path::new("/data/src/rep")).is_err());
		assert!(validate_disjoint_roots(Path::new("/data/rep/src"), Path::new("/data/rep")).is_err());
		// Shared prefix in the name is not nesting
		assert!(validate_disjoint_roots(Path::new("/data/src"), Path::new("/data/src2")).is_ok());
	}
}
