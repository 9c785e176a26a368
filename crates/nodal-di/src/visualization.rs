//! Dependency graph visualization for development and debugging
//!
//! Renders a compiled [`DependencyGraph`] in DOT format, which can be drawn
//! with Graphviz.
//!
//! ## Example
//!
//! ```rust
//! use nodal_di::{Composition, Dep, DependencyGraph, Node, NodeDescriptor, NodeResult, Provided};
//!
//! struct Tenant;
//! #[async_trait::async_trait]
//! impl Node for Tenant {
//!     type Output = String;
//!     type Deps = (Provided<u64>,);
//!     async fn compose((id,): (Provided<u64>,)) -> NodeResult<Composition<String>> {
//!         Ok(format!("tenant-{}", *id).into())
//!     }
//! }
//!
//! struct Database;
//! #[async_trait::async_trait]
//! impl Node for Database {
//!     type Output = String;
//!     type Deps = (Dep<Tenant>,);
//!     async fn compose((tenant,): (Dep<Tenant>,)) -> NodeResult<Composition<String>> {
//!         Ok(format!("db-{}", *tenant).into())
//!     }
//! }
//!
//! let graph = DependencyGraph::build([NodeDescriptor::of::<Database>()]).unwrap();
//! let dot = graph.to_dot();
//! assert!(dot.contains("\"Database\" -> \"Tenant\";"));
//! assert!(dot.contains("\"Tenant\" -> \"u64\" [style=dashed];"));
//! ```

use crate::graph::DependencyGraph;
use std::collections::BTreeSet;
use std::fmt::Write;

impl DependencyGraph {
	/// Generate DOT format output for Graphviz
	///
	/// Requested nodes are drawn in light green, other nodes in light blue, and
	/// values the host must push into the scope as dashed ellipses.
	pub fn to_dot(&self) -> String {
		let requested: BTreeSet<&str> = self.requested().iter().map(|n| n.name()).collect();

		let mut output = String::from("digraph DependencyGraph {\n");
		output.push_str("  rankdir=LR;\n");
		output.push_str("  node [shape=box, style=rounded];\n\n");

		for node in self.nodes() {
			let color = if requested.contains(node.name()) {
				"lightgreen"
			} else {
				"lightblue"
			};
			let _ = writeln!(
				output,
				"  \"{}\" [label=\"{}\", fillcolor={}, style=filled];",
				node.name(),
				node.name(),
				color
			);
		}

		let mut inputs = BTreeSet::new();
		for node in self.nodes() {
			for input in self.provided_inputs_of(node.key()).unwrap_or_default() {
				inputs.insert(input.name());
			}
		}
		for input in &inputs {
			let _ = writeln!(output, "  \"{}\" [shape=ellipse, style=dashed];", input);
		}

		output.push('\n');

		for (from, to) in self.edges() {
			let _ = writeln!(output, "  \"{}\" -> \"{}\";", from.name(), to.name());
		}
		for node in self.nodes() {
			for input in self.provided_inputs_of(node.key()).unwrap_or_default() {
				let _ = writeln!(
					output,
					"  \"{}\" -> \"{}\" [style=dashed];",
					node.name(),
					input.name()
				);
			}
		}

		output.push_str("}\n");
		output
	}

	/// Get statistics about the dependency graph
	pub fn statistics(&self) -> GraphStatistics {
		let provided: BTreeSet<&str> = self
			.nodes()
			.iter()
			.flat_map(|n| self.provided_inputs_of(n.key()).unwrap_or_default())
			.map(|d| d.name())
			.collect();

		GraphStatistics {
			node_count: self.len(),
			edge_count: self.edge_count(),
			requested_count: self.requested().len(),
			provided_count: provided.len(),
			layer_count: self.topological_layers().len(),
		}
	}
}

/// Statistics about a dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStatistics {
	/// Total number of nodes
	pub node_count: usize,
	/// Total number of node-to-node edges
	pub edge_count: usize,
	/// Number of nodes the graph was compiled for
	pub requested_count: usize,
	/// Number of distinct values that must be pushed into the scope
	pub provided_count: usize,
	/// Length of the longest dependency chain
	pub layer_count: usize,
}
