//! Centralized validation for treemirror
//!
//! This module provides the checks run before the scheduler starts:
//! - Configuration validation (interval, buffer size, glob patterns)
//! - Path validation (directory roots, relative path normalization)

use std::error::Error;
use std::fmt;

use crate::error::MirrorError;

pub mod config;
pub mod path;

pub use config::*;
pub use path::*;

/// Generic validation error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
	/// Invalid configuration
	ConfigError(String),
	/// Invalid path
	PathError(String),
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ValidationError::ConfigError(msg) => write!(f, "{}", msg),
			ValidationError::PathError(msg) => write!(f, "{}", msg),
		}
	}
}

impl Error for ValidationError {}

impl From<ValidationError> for MirrorError {
	fn from(e: ValidationError) -> Self {
		MirrorError::InvalidConfig { message: e.to_string() }
	}
}
