//! Circular dependency detection for graph compilation
//!
//! Graph compilation walks each requested node depth-first. A
//! [`ResolutionPath`] tracks the nodes on the current walk so that revisiting
//! one of them is reported as a cycle, and bounds the walk at a maximum depth.
//!
//! ## Features
//!
//! - **O(1) Circular Detection**: `HashSet<TypeId>` membership check
//! - **Readable Paths**: cycles are reported as `A -> B -> C -> A`
//! - **Depth Limiting**: [`MAX_RESOLUTION_DEPTH`] prevents pathological chains

use crate::error::{DiError, DiResult};
use std::any::TypeId;
use std::collections::HashSet;

/// Maximum resolution depth (prevents pathological cases)
pub const MAX_RESOLUTION_DEPTH: usize = 100;

/// The chain of nodes currently being walked.
#[derive(Debug)]
pub struct ResolutionPath {
	/// Set of nodes on the current path (O(1) circular detection)
	members: HashSet<TypeId>,
	/// Ordered path (for displaying circular paths)
	path: Vec<(TypeId, &'static str)>,
	max_depth: usize,
}

impl Default for ResolutionPath {
	fn default() -> Self {
		Self::new(MAX_RESOLUTION_DEPTH)
	}
}

impl ResolutionPath {
	pub fn new(max_depth: usize) -> Self {
		Self {
			members: HashSet::new(),
			path: Vec::new(),
			max_depth,
		}
	}

	/// Record the start of a node's walk.
	///
	/// Fails with [`DiError::CircularDependency`] if the node is already on the
	/// path, or [`DiError::MaxDepthExceeded`] if the path would grow past the
	/// depth limit. On failure the path is left unchanged.
	///
	/// # Examples
	///
	/// ```
	/// use nodal_di::cycle_detection::ResolutionPath;
	/// use nodal_di::DiError;
	/// use std::any::TypeId;
	///
	/// struct A;
	/// struct B;
	///
	/// let mut path = ResolutionPath::default();
	/// path.begin(TypeId::of::<A>(), "A").unwrap();
	/// path.begin(TypeId::of::<B>(), "B").unwrap();
	///
	/// match path.begin(TypeId::of::<A>(), "A") {
	///     Err(DiError::CircularDependency { path }) => assert_eq!(path, "A -> B -> A"),
	///     other => panic!("unexpected: {:?}", other),
	/// }
	/// ```
	pub fn begin(&mut self, key: TypeId, name: &'static str) -> DiResult<()> {
		if self.members.contains(&key) {
			return Err(DiError::CircularDependency {
				path: self.cycle_through(key, name),
			});
		}

		let depth = self.path.len() + 1;
		if depth > self.max_depth {
			return Err(DiError::MaxDepthExceeded(depth));
		}

		self.members.insert(key);
		self.path.push((key, name));
		Ok(())
	}

	/// Record the end of the innermost node's walk.
	pub fn end(&mut self, key: TypeId) {
		if let Some(position) = self.path.iter().rposition(|(id, _)| *id == key) {
			self.path.remove(position);
		}
		self.members.remove(&key);
	}

	pub fn contains(&self, key: TypeId) -> bool {
		self.members.contains(&key)
	}

	pub fn depth(&self) -> usize {
		self.path.len()
	}

	fn cycle_through(&self, key: TypeId, name: &'static str) -> String {
		match self.path.iter().position(|(id, _)| *id == key) {
			Some(start) => {
				let cycle: Vec<&str> = self.path[start..].iter().map(|(_, n)| *n).collect();
				format!("{} -> {}", cycle.join(" -> "), name)
			}
			None => format!("Unknown cycle involving {}", name),
		}
	}
}
