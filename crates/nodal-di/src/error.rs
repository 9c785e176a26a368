//! Error types for node resolution

use std::error::Error as StdError;

/// Boxed application error returned from composition functions and releases.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type for dependency-injection operations.
pub type DiResult<T> = Result<T, DiError>;

/// Result type for node composition functions.
///
/// Any error type converts into [`BoxError`] with `?`, so compose bodies can
/// propagate application errors directly.
pub type NodeResult<T> = Result<T, BoxError>;

/// Errors raised while building or running a node graph.
#[derive(Debug, thiserror::Error)]
pub enum DiError {
	/// The requested node graph contains a cycle
	#[error("Circular dependency detected\n  Path: {path}\nThis forms a cycle that cannot be resolved.")]
	CircularDependency {
		/// Circular path (format: A -> B -> C -> A)
		path: String,
	},

	/// The dependency chain is deeper than the configured limit
	#[error(
		"Maximum resolution depth exceeded: {0}\nThis likely indicates an extremely deep or circular dependency chain."
	)]
	MaxDepthExceeded(usize),

	/// A required value was not present in the scope chain
	#[error("Dependency not found: {0}")]
	NotFound(String),

	/// A required node parameter was absent after resolution
	#[error("Node `{node}` was not resolved for this request")]
	Unresolved {
		/// Name of the missing node
		node: &'static str,
	},

	/// A composition function failed with an application error
	#[error("Composition of `{node}` failed: {source}")]
	Composition {
		/// Name of the failing node
		node: &'static str,
		/// Application error returned by the composition function
		#[source]
		source: BoxError,
	},

	/// A generator finished before yielding its value
	#[error("Generator completed without yielding a value")]
	GeneratorExhausted,

	/// A generator yielded a second value during cleanup
	#[error("Generator yielded more than one value")]
	MultipleYields,

	/// A release action failed during scope disposal
	#[error("Releasing `{node}` failed: {source}")]
	Release {
		/// Label of the resource whose release failed
		node: &'static str,
		/// Error returned by the release action
		#[source]
		source: BoxError,
	},

	/// The scope has already been disposed
	#[error("Scope `{detail}` has already been disposed")]
	ScopeDisposed {
		/// Detail string of the disposed scope
		detail: String,
	},

	/// One or more cleanups failed; every cleanup still ran
	#[error("{} cleanup action(s) failed: {}", .0.len(), join_errors(.0))]
	Cleanup(Vec<DiError>),

	/// Settings could not be loaded or failed validation
	#[error("Invalid settings: {0}")]
	Settings(String),
}

impl DiError {
	/// Wrap an error returned from a composition function.
	///
	/// A `DiError` passes through unchanged; anything else becomes
	/// [`DiError::Composition`] carrying the original error as its source.
	pub fn from_node(node: &'static str, error: BoxError) -> Self {
		match error.downcast::<DiError>() {
			Ok(inner) => *inner,
			Err(source) => DiError::Composition { node, source },
		}
	}

	/// Wrap an error returned from a release action.
	pub fn from_release(node: &'static str, error: BoxError) -> Self {
		DiError::Release { node, source: error }
	}

	/// Downcast the application error carried by this error, if any.
	///
	/// Looks through [`DiError::Composition`] and [`DiError::Release`] sources,
	/// which lets a host map its own error types to responses.
	///
	/// # Examples
	///
	/// ```
	/// use nodal_di::DiError;
	///
	/// #[derive(Debug, thiserror::Error)]
	/// #[error("unauthorized")]
	/// struct Unauthorized;
	///
	/// let error = DiError::from_node("CurrentUser", Box::new(Unauthorized));
	/// assert!(error.source_as::<Unauthorized>().is_some());
	/// ```
	pub fn source_as<E: StdError + 'static>(&self) -> Option<&E> {
		match self {
			DiError::Composition { source, .. } | DiError::Release { source, .. } => {
				source.downcast_ref::<E>()
			}
			_ => None,
		}
	}

	/// Returns true for errors raised while compiling a graph.
	pub fn is_build_error(&self) -> bool {
		matches!(
			self,
			DiError::CircularDependency { .. } | DiError::MaxDepthExceeded(_)
		)
	}
}

fn join_errors(errors: &[DiError]) -> String {
	errors
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("; ")
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[derive(Debug, thiserror::Error)]
	#[error("forbidden")]
	struct Forbidden;

	#[rstest]
	fn test_from_node_wraps_application_error() {
		// Act
		let error = DiError::from_node("RequireAdmin", Box::new(Forbidden));

		// Assert
		match &error {
			DiError::Composition { node, .. } => assert_eq!(*node, "RequireAdmin"),
			other => panic!("Expected Composition, got {:?}", other),
		}
		assert!(error.source_as::<Forbidden>().is_some());
	}

	#[rstest]
	fn test_from_node_passes_di_error_through() {
		// Arrange
		let inner: BoxError = Box::new(DiError::NotFound("Config".to_string()));

		// Act
		let error = DiError::from_node("UserFlags", inner);

		// Assert
		assert!(matches!(error, DiError::NotFound(ref name) if name == "Config"));
	}

	#[rstest]
	fn test_cleanup_error_lists_every_failure() {
		// Arrange
		let error = DiError::Cleanup(vec![
			DiError::from_release("Db", Box::new(Forbidden)),
			DiError::MultipleYields,
		]);

		// Act
		let message = error.to_string();

		// Assert
		assert!(message.starts_with("2 cleanup action(s) failed"));
		assert!(message.contains("Releasing `Db` failed: forbidden"));
		assert!(message.contains("more than one value"));
	}

	#[rstest]
	#[case(DiError::CircularDependency { path: "A -> A".into() }, true)]
	#[case(DiError::MaxDepthExceeded(101), true)]
	#[case(DiError::GeneratorExhausted, false)]
	fn test_is_build_error(#[case] error: DiError, #[case] expected: bool) {
		assert_eq!(error.is_build_error(), expected);
	}
}
