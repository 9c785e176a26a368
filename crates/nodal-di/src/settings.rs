//! Runtime settings for graph compilation and request scopes
//!
//! Settings load from TOML or from environment variables and are validated on
//! load:
//!
//! ```toml
//! evaluation = "sequential"
//! max_depth = 64
//! detail_prefix = "request"
//! ```

use crate::cycle_detection::MAX_RESOLUTION_DEPTH;
use crate::error::{DiError, DiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable selecting the evaluation mode
pub const ENV_EVALUATION: &str = "NODAL_DI_EVALUATION";
/// Environment variable overriding the maximum graph depth
pub const ENV_MAX_DEPTH: &str = "NODAL_DI_MAX_DEPTH";
/// Environment variable overriding the request scope detail prefix
pub const ENV_DETAIL_PREFIX: &str = "NODAL_DI_DETAIL_PREFIX";

/// How an agent executes independent nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
	/// Nodes in the same topological layer run concurrently
	#[default]
	Concurrent,
	/// Nodes run one at a time in plan order
	Sequential,
}

impl FromStr for Evaluation {
	type Err = DiError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"concurrent" => Ok(Evaluation::Concurrent),
			"sequential" => Ok(Evaluation::Sequential),
			other => Err(DiError::Settings(format!(
				"unknown evaluation mode `{other}` (expected `concurrent` or `sequential`)"
			))),
		}
	}
}

impl fmt::Display for Evaluation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Evaluation::Concurrent => f.write_str("concurrent"),
			Evaluation::Sequential => f.write_str("sequential"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiSettings {
	pub evaluation: Evaluation,
	/// Deepest dependency chain accepted when compiling a graph
	pub max_depth: usize,
	/// Prefix of request scope details (`<prefix>:<n>`)
	pub detail_prefix: String,
}

impl Default for DiSettings {
	fn default() -> Self {
		Self {
			evaluation: Evaluation::Concurrent,
			max_depth: MAX_RESOLUTION_DEPTH,
			detail_prefix: "req".to_string(),
		}
	}
}

impl DiSettings {
	pub fn with_evaluation(mut self, evaluation: Evaluation) -> Self {
		self.evaluation = evaluation;
		self
	}

	pub fn with_max_depth(mut self, max_depth: usize) -> Self {
		self.max_depth = max_depth;
		self
	}

	pub fn with_detail_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.detail_prefix = prefix.into();
		self
	}

	/// Parse settings from a TOML document. Missing keys take their defaults.
	///
	/// # Examples
	///
	/// ```
	/// use nodal_di::settings::{DiSettings, Evaluation};
	///
	/// let settings = DiSettings::from_toml_str(r#"evaluation = "sequential""#).unwrap();
	/// assert_eq!(settings.evaluation, Evaluation::Sequential);
	/// assert_eq!(settings.max_depth, 100);
	/// ```
	pub fn from_toml_str(content: &str) -> DiResult<Self> {
		let settings: Self =
			toml::from_str(content).map_err(|e| DiError::Settings(e.to_string()))?;
		settings.validate()?;
		Ok(settings)
	}

	/// Read settings from the process environment.
	pub fn from_env() -> DiResult<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Read settings through `lookup`, which maps variable names to values.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DiResult<Self> {
		let mut settings = Self::default();
		if let Some(value) = lookup(ENV_EVALUATION) {
			settings.evaluation = value.parse()?;
		}
		if let Some(value) = lookup(ENV_MAX_DEPTH) {
			settings.max_depth = value.trim().parse().map_err(|_| {
				DiError::Settings(format!("{ENV_MAX_DEPTH} must be a positive integer, got `{value}`"))
			})?;
		}
		if let Some(value) = lookup(ENV_DETAIL_PREFIX) {
			settings.detail_prefix = value;
		}
		settings.validate()?;
		Ok(settings)
	}

	pub fn validate(&self) -> DiResult<()> {
		if self.max_depth == 0 {
			return Err(DiError::Settings("max_depth must be at least 1".to_string()));
		}
		if self.detail_prefix.is_empty() {
			return Err(DiError::Settings("detail_prefix must not be empty".to_string()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::HashMap;

	#[rstest]
	fn test_default_settings() {
		let settings = DiSettings::default();

		assert_eq!(settings.evaluation, Evaluation::Concurrent);
		assert_eq!(settings.max_depth, 100);
		assert_eq!(settings.detail_prefix, "req");
		assert!(settings.validate().is_ok());
	}

	#[rstest]
	fn test_parse_toml_settings() {
		// Arrange
		let toml = r#"
evaluation = "sequential"
max_depth = 12
detail_prefix = "request"
"#;

		// Act
		let settings = DiSettings::from_toml_str(toml).unwrap();

		// Assert
		assert_eq!(settings.evaluation, Evaluation::Sequential);
		assert_eq!(settings.max_depth, 12);
		assert_eq!(settings.detail_prefix, "request");
	}

	#[rstest]
	#[case::unknown_mode(r#"evaluation = "parallel""#)]
	#[case::zero_depth("max_depth = 0")]
	#[case::empty_prefix(r#"detail_prefix = """#)]
	fn test_invalid_toml_is_rejected(#[case] toml: &str) {
		let result = DiSettings::from_toml_str(toml);

		assert!(matches!(result, Err(DiError::Settings(_))));
	}

	#[rstest]
	fn test_from_lookup_reads_variables() {
		// Arrange
		let vars: HashMap<&str, &str> = [(ENV_EVALUATION, "Sequential"), (ENV_MAX_DEPTH, " 7 ")]
			.into_iter()
			.collect();

		// Act
		let settings =
			DiSettings::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

		// Assert
		assert_eq!(settings.evaluation, Evaluation::Sequential);
		assert_eq!(settings.max_depth, 7);
		assert_eq!(settings.detail_prefix, "req");
	}

	#[rstest]
	fn test_from_lookup_rejects_bad_depth() {
		let result = DiSettings::from_lookup(|key| {
			(key == ENV_MAX_DEPTH).then(|| "deep".to_string())
		});

		assert!(matches!(result, Err(DiError::Settings(ref msg)) if msg.contains("deep")));
	}

	#[rstest]
	#[case("concurrent", Evaluation::Concurrent)]
	#[case("SEQUENTIAL", Evaluation::Sequential)]
	fn test_evaluation_from_str(#[case] input: &str, #[case] expected: Evaluation) {
		assert_eq!(input.parse::<Evaluation>().unwrap(), expected);
		assert_eq!(expected.to_string(), input.to_ascii_lowercase());
	}
}
