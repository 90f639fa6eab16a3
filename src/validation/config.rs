//! Configuration validation functions

use std::time::Duration;

use super::ValidationError;

/// Parse the interval argument (whole seconds, strictly positive)
///
/// Accepts surrounding whitespace; rejects zero, negative numbers and
/// anything that is not an integer.
pub fn parse_interval(raw: &str) -> Result<Duration, ValidationError> {
	let trimmed = raw.trim();
	let secs: i64 = trimmed.parse().map_err(|_| {
		ValidationError::ConfigError(format!("Interval must be an integer, got '{}'", raw))
	})?;
	if secs <= 0 {
		return Err(ValidationError::ConfigError(format!(
			"Interval must be a positive number of seconds, got {}",
			secs
		)));
	}
	Ok(Duration::from_secs(secs as u64))
}

/// Validate an interval already held as seconds
pub fn validate_interval_secs(secs: u64) -> Result<(), ValidationError> {
	if secs == 0 {
		return Err(ValidationError::ConfigError(
			"Interval must be a positive number of seconds, got 0".to_string(),
		));
	}
	Ok(())
}

/// Validate the read/copy buffer size in bytes
pub fn validate_buffer_size(size: usize) -> Result<(), ValidationError> {
	if size == 0 {
		return Err(ValidationError::ConfigError("Buffer size must be greater than 0".to_string()));
	}
	Ok(())
}

/// Validate that every exclude pattern compiles as a glob
pub fn validate_glob_patterns(patterns: &[String]) -> Result<(), ValidationError> {
	for pattern in patterns {
		glob::Pattern::new(pattern).map_err(|e| {
			ValidationError::ConfigError(format!("Invalid exclude pattern '{}': {}", pattern, e))
		})?;
	}
	Ok(())
}
