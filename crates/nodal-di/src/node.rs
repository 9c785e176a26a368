//! Node declarations
//!
//! A node is a nominal type describing one kind of computed value. Its
//! [`Node::compose`] function receives the node's declared dependencies and
//! produces the value, optionally paired with a release action that runs when
//! the owning scope is disposed.
//!
//! # Examples
//!
//! ```
//! use nodal_di::{Composition, Dep, Node, NodeResult};
//!
//! struct Base;
//!
//! #[async_trait::async_trait]
//! impl Node for Base {
//!     type Output = i32;
//!     type Deps = ();
//!
//!     async fn compose(_deps: ()) -> NodeResult<Composition<i32>> {
//!         Ok(10.into())
//!     }
//! }
//!
//! struct Doubled;
//!
//! #[async_trait::async_trait]
//! impl Node for Doubled {
//!     type Output = i32;
//!     type Deps = (Dep<Base>,);
//!
//!     async fn compose(deps: (Dep<Base>,)) -> NodeResult<Composition<i32>> {
//!         let (base,) = deps;
//!         Ok((*base * 2).into())
//!     }
//! }
//! ```

use crate::dependency::{Dependencies, DependencyDescriptor};
use crate::error::{DiError, DiResult, NodeResult};
use crate::scope::Scope;
use futures::future::BoxFuture;
use std::any::TypeId;
use std::fmt;
use std::future::Future;

/// Deferred release action produced by a resource-acquiring composition.
pub type Release = Box<dyn FnOnce() -> BoxFuture<'static, NodeResult<()>> + Send>;

/// Type-erased composition entry point stored in a [`NodeDescriptor`].
pub type ComposeFn = for<'a> fn(&'a Scope) -> BoxFuture<'a, DiResult<()>>;

/// A declared kind of computed value.
///
/// The composition function may be synchronous (an `async fn` that never
/// awaits), asynchronous, or resource-acquiring (returning
/// [`Composition::resource`]). Its parameters are declared through
/// [`Node::Deps`], a tuple of [`Dep`](crate::Dep) and
/// [`Provided`](crate::Provided) markers.
#[async_trait::async_trait]
pub trait Node: Sized + Send + Sync + 'static {
	/// Value handed to callers that depend on this node
	type Output: Send + Sync + 'static;

	/// Dependencies the composition function receives
	type Deps: Dependencies;

	/// Produce this node's value from its resolved dependencies.
	async fn compose(deps: Self::Deps) -> NodeResult<Composition<Self::Output>>;

	/// Display name used in errors, logs and graph output.
	fn name() -> &'static str {
		short_type_name(std::any::type_name::<Self>())
	}
}

/// The value produced by a composition function.
pub struct Composition<T> {
	value: T,
	release: Option<Release>,
}

impl<T> Composition<T> {
	/// A plain value with nothing to release.
	pub fn value(value: T) -> Self {
		Self {
			value,
			release: None,
		}
	}

	/// A value whose `release` action runs when the owning scope is disposed.
	///
	/// Releases run after the handler returns, last-acquired first.
	///
	/// # Examples
	///
	/// ```
	/// use nodal_di::Composition;
	///
	/// let composition = Composition::resource("connection", || async {
	///     // close the connection
	///     Ok(())
	/// });
	/// assert!(composition.has_release());
	/// ```
	pub fn resource<F, Fut>(value: T, release: F) -> Self
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = NodeResult<()>> + Send + 'static,
	{
		Self {
			value,
			release: Some(Box::new(move || Box::pin(release()))),
		}
	}

	/// Returns true if a release action is attached.
	pub fn has_release(&self) -> bool {
		self.release.is_some()
	}

	/// Split into the value and its release action.
	pub fn into_parts(self) -> (T, Option<Release>) {
		(self.value, self.release)
	}
}

impl<T> From<T> for Composition<T> {
	fn from(value: T) -> Self {
		Self::value(value)
	}
}

impl<T: fmt::Debug> fmt::Debug for Composition<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Composition")
			.field("value", &self.value)
			.field("has_release", &self.release.is_some())
			.finish()
	}
}

/// Static description of a node type, used to compile graphs.
#[derive(Clone, Copy)]
pub struct NodeDescriptor {
	key: TypeId,
	name: &'static str,
	dependencies: fn() -> Vec<DependencyDescriptor>,
	compose: ComposeFn,
}

impl NodeDescriptor {
	/// Describe node type `N`.
	pub fn of<N: Node>() -> Self {
		Self {
			key: TypeId::of::<N>(),
			name: N::name(),
			dependencies: <N::Deps as Dependencies>::descriptors,
			compose: compose_into::<N>,
		}
	}

	/// Key under which this node's value is stored in a scope.
	pub fn key(&self) -> TypeId {
		self.key
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Dependencies declared by the composition function.
	pub fn dependencies(&self) -> Vec<DependencyDescriptor> {
		(self.dependencies)()
	}

	/// Compose this node against `scope`, storing the result there.
	///
	/// Dependencies must already be resolvable from `scope`.
	pub fn compose<'a>(&self, scope: &'a Scope) -> BoxFuture<'a, DiResult<()>> {
		(self.compose)(scope)
	}
}

impl fmt::Debug for NodeDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeDescriptor")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

impl PartialEq for NodeDescriptor {
	fn eq(&self, other: &Self) -> bool {
		self.key == other.key
	}
}

impl Eq for NodeDescriptor {}

fn compose_into<N: Node>(scope: &Scope) -> BoxFuture<'_, DiResult<()>> {
	Box::pin(async move {
		let deps = <N::Deps as Dependencies>::extract(scope)?;
		tracing::debug!(node = N::name(), scope = scope.detail(), "composing node");

		let composition = N::compose(deps)
			.await
			.map_err(|e| DiError::from_node(N::name(), e))?;
		let (value, release) = composition.into_parts();
		scope.store_node::<N>(value, release)
	})
}

/// Strip the module path from a type name, keeping generic arguments intact.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
	let head = match full.find('<') {
		Some(index) => &full[..index],
		None => full,
	};
	match head.rfind("::") {
		Some(index) => &full[index + 2..],
		None => full,
	}
}
