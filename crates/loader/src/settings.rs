//! Loader settings.
//!
//! Settings come from a JSON document, from the `STRATA_LOADER_DEBUG`
//! environment variable, or both (environment words are added on top).
//!
//! ```json
//! { "stderr_log": ["warn", "error"], "unknown_function_capacity": 64 }
//! ```

use serde::Deserialize;
use thiserror::Error;

use crate::log::LoaderLogFlags;

/// Environment variable holding a comma-separated log filter.
pub const LOADER_DEBUG_ENV: &str = "STRATA_LOADER_DEBUG";

/// Default number of slots in each extension resolution table.
pub const DEFAULT_UNKNOWN_FUNCTION_CAPACITY: usize = 250;

/// Errors from parsing loader settings.
#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("invalid settings document: {0}")]
	Json(#[from] serde_json::Error),

	#[error("unknown log category: {0:?}")]
	UnknownLogCategory(String),

	#[error("unknown-function capacity must be between 1 and {max}, got {got}")]
	InvalidCapacity { got: usize, max: usize },
}

/// Settings applied to an instance for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
	/// Loader message categories traced through `tracing`.
	pub log_filter: LoaderLogFlags,
	/// Slots in each extension resolution table.
	pub unknown_function_capacity: usize,
}

impl Default for LoaderSettings {
	fn default() -> Self {
		Self {
			log_filter: LoaderLogFlags::empty(),
			unknown_function_capacity: DEFAULT_UNKNOWN_FUNCTION_CAPACITY,
		}
	}
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
	#[serde(default)]
	stderr_log: Vec<String>,
	unknown_function_capacity: Option<usize>,
}

impl LoaderSettings {
	/// Defaults plus whatever the environment selects.
	pub fn from_env() -> Self {
		Self::default().with_env_overrides()
	}

	pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
		let raw: RawSettings = serde_json::from_str(json)?;
		let mut settings = Self::default();
		for word in &raw.stderr_log {
			settings.log_filter |= LoaderLogFlags::from_word(word).ok_or_else(|| SettingsError::UnknownLogCategory(word.clone()))?;
		}
		if let Some(capacity) = raw.unknown_function_capacity {
			settings = settings.with_unknown_function_capacity(capacity)?;
		}
		Ok(settings)
	}

	/// Adds the categories named in [`LOADER_DEBUG_ENV`], if set.
	pub fn with_env_overrides(self) -> Self {
		match std::env::var(LOADER_DEBUG_ENV) {
			Ok(spec) => self.with_log_spec(&spec),
			Err(_) => self,
		}
	}

	/// Adds the categories of a comma-separated filter. Unknown words are
	/// skipped with a warning.
	pub fn with_log_spec(mut self, spec: &str) -> Self {
		for word in spec.split(',').map(str::trim).filter(|word| !word.is_empty()) {
			match LoaderLogFlags::from_word(word) {
				Some(flags) => self.log_filter |= flags,
				None => tracing::warn!(word, "ignoring unknown loader log category"),
			}
		}
		self
	}

	pub fn with_unknown_function_capacity(mut self, capacity: usize) -> Result<Self, SettingsError> {
		let max = u32::MAX as usize;
		if capacity == 0 || capacity > max {
			return Err(SettingsError::InvalidCapacity { got: capacity, max });
		}
		self.unknown_function_capacity = capacity;
		Ok(self)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn json_settings() {
		let settings = LoaderSettings::from_json_str(r#"{ "stderr_log": ["warn", "icd"], "unknown_function_capacity": 16 }"#).unwrap();
		assert_eq!(
			settings,
			LoaderSettings {
				log_filter: LoaderLogFlags::WARN | LoaderLogFlags::DRIVER,
				unknown_function_capacity: 16,
			}
		);
	}

	#[test]
	fn empty_json_is_default() {
		assert_eq!(LoaderSettings::from_json_str("{}").unwrap(), LoaderSettings::default());
	}

	#[test]
	fn json_rejects_unknown_category() {
		let err = LoaderSettings::from_json_str(r#"{ "stderr_log": ["loud"] }"#).unwrap_err();
		assert!(matches!(err, SettingsError::UnknownLogCategory(word) if word == "loud"));
	}

	#[test]
	fn json_rejects_zero_capacity() {
		let err = LoaderSettings::from_json_str(r#"{ "unknown_function_capacity": 0 }"#).unwrap_err();
		assert!(matches!(err, SettingsError::InvalidCapacity { got: 0, .. }));
	}

	#[test]
	fn log_spec_skips_unknown_words() {
		let settings = LoaderSettings::default().with_log_spec("error, bogus,,layer");
		assert_eq!(settings.log_filter, LoaderLogFlags::ERROR | LoaderLogFlags::LAYER);
	}
}
