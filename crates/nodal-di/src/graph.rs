//! Dependency graph compilation
//!
//! [`DependencyGraph`] discovers the transitive closure of a set of requested
//! nodes, rejects cycles, and groups the nodes into topological layers: every
//! node sits one layer above the deepest of its dependencies, so the nodes of
//! a layer never depend on each other.

use crate::cycle_detection::{MAX_RESOLUTION_DEPTH, ResolutionPath};
use crate::dependency::{DependencyDescriptor, DependencyKind};
use crate::error::{DiError, DiResult};
use crate::node::NodeDescriptor;
use std::any::TypeId;
use std::collections::HashMap;

/// An acyclic graph over node types.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
	/// Nodes in discovery order
	nodes: Vec<NodeDescriptor>,
	index: HashMap<TypeId, usize>,
	/// Node-to-node edges, by index into `nodes`
	edges: Vec<Vec<usize>>,
	/// Non-node inputs declared by each node
	provided: Vec<Vec<DependencyDescriptor>>,
	/// Nodes in completion order; dependencies always precede dependents
	finished: Vec<usize>,
	requested: Vec<usize>,
}

impl DependencyGraph {
	/// Compile the closure of `requested` with the default depth limit.
	///
	/// # Examples
	///
	/// ```
	/// use nodal_di::{Composition, Dep, DependencyGraph, Node, NodeDescriptor, NodeResult};
	///
	/// struct A;
	/// #[async_trait::async_trait]
	/// impl Node for A {
	///     type Output = i32;
	///     type Deps = ();
	///     async fn compose(_: ()) -> NodeResult<Composition<i32>> { Ok(10.into()) }
	/// }
	///
	/// struct B;
	/// #[async_trait::async_trait]
	/// impl Node for B {
	///     type Output = i32;
	///     type Deps = (Dep<A>,);
	///     async fn compose((a,): (Dep<A>,)) -> NodeResult<Composition<i32>> { Ok((*a * 2).into()) }
	/// }
	///
	/// let graph = DependencyGraph::build([NodeDescriptor::of::<B>()]).unwrap();
	/// let layers: Vec<Vec<&str>> = graph
	///     .topological_layers()
	///     .iter()
	///     .map(|layer| layer.iter().map(|n| n.name()).collect())
	///     .collect();
	/// assert_eq!(layers, vec![vec!["A"], vec!["B"]]);
	/// ```
	pub fn build(requested: impl IntoIterator<Item = NodeDescriptor>) -> DiResult<Self> {
		Self::build_with_depth(requested, MAX_RESOLUTION_DEPTH)
	}

	/// Compile the closure of `requested`, rejecting chains deeper than
	/// `max_depth`.
	pub fn build_with_depth(
		requested: impl IntoIterator<Item = NodeDescriptor>,
		max_depth: usize,
	) -> DiResult<Self> {
		let mut graph = Self {
			nodes: Vec::new(),
			index: HashMap::new(),
			edges: Vec::new(),
			provided: Vec::new(),
			finished: Vec::new(),
			requested: Vec::new(),
		};
		let mut path = ResolutionPath::new(max_depth);

		for node in requested {
			let index = graph.visit(node, &mut path)?;
			if !graph.requested.contains(&index) {
				graph.requested.push(index);
			}
		}
		Ok(graph)
	}

	fn visit(&mut self, node: NodeDescriptor, path: &mut ResolutionPath) -> DiResult<usize> {
		// Path membership is checked before the visited table so that a node
		// still being walked reports a cycle rather than a cache hit.
		path.begin(node.key(), node.name())?;
		if let Some(&index) = self.index.get(&node.key()) {
			path.end(node.key());
			return Ok(index);
		}

		let index = self.nodes.len();
		self.nodes.push(node);
		self.index.insert(node.key(), index);
		self.edges.push(Vec::new());
		self.provided.push(Vec::new());

		for dependency in node.dependencies() {
			match dependency.kind {
				DependencyKind::Node(target) => {
					let target = self.visit(target, path)?;
					if !self.edges[index].contains(&target) {
						self.edges[index].push(target);
					}
				}
				DependencyKind::Provided { .. } => self.provided[index].push(dependency),
			}
		}

		path.end(node.key());
		self.finished.push(index);
		Ok(index)
	}

	/// Returns the cycle path that would make compiling `requested` fail.
	pub fn detect_cycle(requested: impl IntoIterator<Item = NodeDescriptor>) -> Option<String> {
		match Self::build(requested) {
			Err(DiError::CircularDependency { path }) => Some(path),
			_ => None,
		}
	}

	/// Nodes grouped into layers; every node's dependencies live in earlier
	/// layers. Within a layer nodes keep their discovery order.
	pub fn topological_layers(&self) -> Vec<Vec<NodeDescriptor>> {
		let mut level = vec![0usize; self.nodes.len()];
		for &index in &self.finished {
			level[index] = self.edges[index]
				.iter()
				.map(|&dep| level[dep] + 1)
				.max()
				.unwrap_or(0);
		}

		let depth = level.iter().copied().max().map_or(0, |max| max + 1);
		let mut layers = vec![Vec::new(); depth];
		for (index, node) in self.nodes.iter().enumerate() {
			layers[level[index]].push(*node);
		}
		layers
	}

	/// Direct node dependencies of `key`, in declaration order.
	pub fn dependencies_of(&self, key: TypeId) -> Option<Vec<NodeDescriptor>> {
		let index = *self.index.get(&key)?;
		Some(self.edges[index].iter().map(|&dep| self.nodes[dep]).collect())
	}

	/// Inputs of `key` that must be pushed into the scope rather than composed.
	pub fn provided_inputs_of(&self, key: TypeId) -> Option<&[DependencyDescriptor]> {
		let index = *self.index.get(&key)?;
		Some(&self.provided[index])
	}

	pub fn contains(&self, key: TypeId) -> bool {
		self.index.contains_key(&key)
	}

	/// Every node in the closure, in discovery order.
	pub fn nodes(&self) -> &[NodeDescriptor] {
		&self.nodes
	}

	pub fn node_names(&self) -> Vec<&'static str> {
		self.nodes.iter().map(NodeDescriptor::name).collect()
	}

	/// The nodes the graph was compiled for.
	pub fn requested(&self) -> Vec<NodeDescriptor> {
		self.requested.iter().map(|&index| self.nodes[index]).collect()
	}

	pub fn edge_count(&self) -> usize {
		self.edges.iter().map(Vec::len).sum()
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub(crate) fn edges(&self) -> impl Iterator<Item = (NodeDescriptor, NodeDescriptor)> + '_ {
		self.edges.iter().enumerate().flat_map(move |(from, targets)| {
			targets
				.iter()
				.map(move |&to| (self.nodes[from], self.nodes[to]))
		})
	}
}
