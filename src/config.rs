//! Configuration for treemirror
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (MirrorConfig::default())
//! 2. Config file (`--config`, `.toml` or `.json`)
//! 3. Environment variables (TREEMIRROR_* prefix)
//! 4. CLI arguments (highest priority)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::MirrorError;
use crate::hash::DEFAULT_BUFFER_SIZE;
use crate::validation::{
	validate_buffer_size, validate_directory, validate_disjoint_roots, validate_glob_patterns,
	validate_interval_secs,
};
use crate::walk::Exclusions;

/// Log file used when nothing else is configured
pub const DEFAULT_LOG_FILE: &str = "sync_logs.log";

pub const ENV_LOG_FILE: &str = "TREEMIRROR_LOG_FILE";
pub const ENV_LOG_LEVEL: &str = "TREEMIRROR_LOG_LEVEL";
pub const ENV_EXCLUDE: &str = "TREEMIRROR_EXCLUDE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MirrorConfig {
	/// Directory mirrored from
	pub source: PathBuf,

	/// Directory made identical to `source`
	pub replica: PathBuf,

	/// Seconds between the starts of two cycles
	pub interval_secs: u64,

	/// Default tracing filter (RUST_LOG takes precedence)
	pub log_level: String,

	/// Append log records to this file in addition to stderr
	pub log_file: Option<PathBuf>,

	/// Glob patterns excluded on both sides (e.g. "*.swp", ".git")
	pub exclude_patterns: Vec<String>,

	/// Read buffer for hashing and copying
	pub buffer_size: usize,

	/// Remove interrupted temporary copies before the first cycle
	pub cleanup_temp_files: bool,
}

impl Default for MirrorConfig {
	fn default() -> Self {
		MirrorConfig {
			source: PathBuf::new(),
			replica: PathBuf::new(),
			interval_secs: 60,
			log_level: "info".to_string(),
			log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
			exclude_patterns: vec![],
			buffer_size: DEFAULT_BUFFER_SIZE,
			cleanup_temp_files: true,
		}
	}
}

impl MirrorConfig {
	pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(source: P, replica: Q, interval_secs: u64) -> Self {
		MirrorConfig {
			source: source.into(),
			replica: replica.into(),
			interval_secs,
			..MirrorConfig::default()
		}
	}

	/// Load a config file. The format is chosen by extension: `.json` is
	/// parsed as JSON, anything else as TOML. Missing keys keep their defaults.
	pub fn load_file(path: &Path) -> Result<Self, MirrorError> {
		let text = fs::read_to_string(path).map_err(|e| {
			MirrorError::config(format!("Cannot read config file {}: {}", path.display(), e))
		})?;
		let is_json = path.extension().map(|ext| ext.eq_ignore_ascii_case("json")).unwrap_or(false);

		if is_json {
			serde_json::from_str(&text).map_err(|e| {
				MirrorError::config(format!("Cannot parse config file {}: {}", path.display(), e))
			})
		} else {
			toml::from_str(&text).map_err(|e| {
				MirrorError::config(format!("Cannot parse config file {}: {}", path.display(), e))
			})
		}
	}

	/// Apply TREEMIRROR_* variables from the process environment
	pub fn apply_env(&mut self) {
		self.apply_env_from(|key| std::env::var(key).ok());
	}

	/// Apply TREEMIRROR_* variables from an arbitrary lookup
	pub fn apply_env_from<F>(&mut self, lookup: F)
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(file) = lookup(ENV_LOG_FILE) {
			self.log_file = if file.trim().is_empty() { None } else { Some(PathBuf::from(file)) };
		}
		if let Some(level) = lookup(ENV_LOG_LEVEL) {
			if !level.trim().is_empty() {
				self.log_level = level.trim().to_string();
			}
		}
		if let Some(patterns) = lookup(ENV_EXCLUDE) {
			self.exclude_patterns.extend(
				patterns.split(',').map(str::trim).filter(|p| !p.is_empty()).map(String::from),
			);
		}
	}

	pub fn interval(&self) -> Duration {
		Duration::from_secs(self.interval_secs)
	}

	/// Compiled exclusion rules
	pub fn exclusions(&self) -> Result<Exclusions, MirrorError> {
		Exclusions::new(&self.exclude_patterns)
	}

	/// Check everything that must hold before the first cycle is scheduled
	pub fn validate(&self) -> Result<(), MirrorError> {
		validate_interval_secs(self.interval_secs)?;
		let source = validate_directory(&self.source, "Source")?;
		let replica = validate_directory(&self.replica, "Replica")?;
		validate_disjoint_roots(&source, &replica)?;
		validate_glob_patterns(&self.exclude_patterns)?;
		validate_buffer_size(self.buffer_size)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use tempfile::TempDir;

	fn roots() -> (TempDir, PathBuf, PathBuf) {
		let tmp = TempDir::new().unwrap();
		let source = tmp.path().join("source");
		let replica = tmp.path().join("replica");
		fs::create_dir(&source).unwrap();
		fs::create_dir(&replica).unwrap();
		(tmp, source, replica)
	}

	#[test]
	fn test_config_default() {
		let config = MirrorConfig::default();
		assert_eq!(config.log_level, "info");
		assert_eq!(config.log_file, Some(PathBuf::from("sync_logs.log")));
		assert_eq!(config.buffer_size, 64 * 1024);
		assert!(config.cleanup_temp_files);
		assert!(config.exclude_patterns.is_empty());
	}

	#[test]
	fn test_load_toml_keeps_defaults() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("mirror.toml");
		fs::write(&path, "intervalSecs = 15\nexcludePatterns = [\"*.swp\"]\n").unwrap();

		let config = MirrorConfig::load_file(&path).unwrap();
		assert_eq!(config.interval_secs, 15);
		assert_eq!(config.exclude_patterns, vec!["*.swp".to_string()]);
		assert_eq!(config.log_level, "info");
	}

	#[test]
	fn test_load_json() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("mirror.json");
		fs::write(&path, r#"{"logFile": null, "bufferSize": 4096, "cleanupTempFiles": false}"#).unwrap();

		let config = MirrorConfig::load_file(&path).unwrap();
		assert_eq!(config.log_file, None);
		assert_eq!(config.buffer_size, 4096);
		assert!(!config.cleanup_temp_files);
	}

	#[test]
	fn test_load_invalid_file() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("broken.toml");
		fs::write(&path, "intervalSecs = \"soon\"").unwrap();
		assert!(MirrorConfig::load_file(&path).unwrap_err().is_fatal());
		assert!(MirrorConfig::load_file(&tmp.path().join("missing.toml")).is_err());
	}

	#[test]
	fn test_env_overrides() {
		let env: HashMap<&str, &str> =
			[(ENV_LOG_FILE, ""), (ENV_LOG_LEVEL, "debug"), (ENV_EXCLUDE, "*.tmp, .git ,")]
				.iter()
				.cloned()
				.collect();
		let mut config = MirrorConfig::default();
		config.exclude_patterns.push("*.swp".to_string());
		config.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

		assert_eq!(config.log_file, None);
		assert_eq!(config.log_level, "debug");
		assert_eq!(config.exclude_patterns, vec!["*.swp", "*.tmp", ".git"]);
	}

	#[test]
	fn test_validate_accepts_disjoint_dirs() {
		let (_tmp, source, replica) = roots();
		assert!(MirrorConfig::new(source, replica, 5).validate().is_ok());
	}

	#[test]
	fn test_validate_rejections() {
		let (tmp, source, replica) = roots();

		let zero = MirrorConfig::new(&source, &replica, 0);
		assert!(zero.validate().unwrap_err().is_fatal());

		let missing = MirrorConfig::new(tmp.path().join("nope"), &replica, 5);
		assert!(missing.validate().unwrap_err().to_string().contains("does not exist"));

		let nested = MirrorConfig::new(&source, source.join("."), 5);
		assert!(nested.validate().is_err());

		let mut bad_glob = MirrorConfig::new(&source, &replica, 5);
		bad_glob.exclude_patterns.push("[".to_string());
		assert!(bad_glob.validate().is_err());

		let mut no_buffer = MirrorConfig::new(&source, &replica, 5);
		no_buffer.buffer_size = 0;
		assert!(no_buffer.validate().is_err());
	}
}

// vim: ts=4
