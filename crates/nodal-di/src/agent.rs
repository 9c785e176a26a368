//! Compiled execution plans
//!
//! An [`Agent`] is built once per set of requested nodes, typically once per
//! route, and run once per request against that request's scope.

use crate::error::DiResult;
use crate::graph::DependencyGraph;
use crate::node::NodeDescriptor;
use crate::scope::Scope;
use crate::settings::{DiSettings, Evaluation};
use futures::future::try_join_all;

/// A compiled dependency graph and its executor.
///
/// # Examples
///
/// ```
/// use nodal_di::{Agent, Composition, Dep, Node, NodeDescriptor, NodeResult, Scope};
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
/// # tokio_test::block_on(async {
/// let agent = Agent::build([NodeDescriptor::of::<B>()]).unwrap();
/// assert_eq!(agent.plan(), vec!["A", "B"]);
///
/// let scope = Scope::new("req:1");
/// agent.run(&scope).await.unwrap();
/// assert_eq!(*scope.retrieve_node::<B>().unwrap(), 20);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Agent {
	graph: DependencyGraph,
	layers: Vec<Vec<NodeDescriptor>>,
	evaluation: Evaluation,
}

impl Agent {
	/// Compile an agent for `requested` with default settings.
	pub fn build(requested: impl IntoIterator<Item = NodeDescriptor>) -> DiResult<Self> {
		Self::build_with_settings(requested, &DiSettings::default())
	}

	pub fn build_with_settings(
		requested: impl IntoIterator<Item = NodeDescriptor>,
		settings: &DiSettings,
	) -> DiResult<Self> {
		let graph = DependencyGraph::build_with_depth(requested, settings.max_depth)?;
		let layers = graph.topological_layers();
		tracing::debug!(
			nodes = graph.len(),
			layers = layers.len(),
			evaluation = %settings.evaluation,
			"compiled node graph"
		);
		Ok(Self {
			graph,
			layers,
			evaluation: settings.evaluation,
		})
	}

	/// Resolve every node of the graph into `scope`.
	///
	/// Dependencies are composed strictly before their dependents. Nodes that
	/// already have a value anywhere in the scope chain are skipped, which lets
	/// a shared scope or the host override a node. The first failure aborts the
	/// run and is returned.
	pub async fn run(&self, scope: &Scope) -> DiResult<()> {
		scope.ensure_open()?;

		for layer in &self.layers {
			let pending: Vec<&NodeDescriptor> = layer
				.iter()
				.filter(|node| !scope.contains_key(node.key()))
				.collect();
			if pending.is_empty() {
				continue;
			}

			match self.evaluation {
				Evaluation::Concurrent => {
					try_join_all(pending.iter().map(|node| node.compose(scope))).await?;
				}
				Evaluation::Sequential => {
					for node in pending {
						node.compose(scope).await?;
					}
				}
			}
		}
		Ok(())
	}

	/// Names of the nodes this agent was built for.
	pub fn requested(&self) -> Vec<&'static str> {
		self.graph
			.requested()
			.iter()
			.map(NodeDescriptor::name)
			.collect()
	}

	/// Node names in execution order.
	pub fn plan(&self) -> Vec<&'static str> {
		self.layers
			.iter()
			.flatten()
			.map(NodeDescriptor::name)
			.collect()
	}

	pub fn layers(&self) -> &[Vec<NodeDescriptor>] {
		&self.layers
	}

	pub fn graph(&self) -> &DependencyGraph {
		&self.graph
	}

	pub fn evaluation(&self) -> Evaluation {
		self.evaluation
	}

	pub fn len(&self) -> usize {
		self.graph.len()
	}

	pub fn is_empty(&self) -> bool {
		self.graph.is_empty()
	}
}
