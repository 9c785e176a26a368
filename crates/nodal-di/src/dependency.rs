//! Dependency markers for composition functions
//!
//! A node declares what its composition function needs through a tuple of
//! markers in [`Node::Deps`](crate::Node::Deps):
//!
//! - [`Dep<N>`] resolves another node `N` and derefs to `N::Output`
//! - [`Provided<T>`] reads a value pushed into the scope chain, such as the
//!   ambient request or an application singleton
//! - `Option<Dep<N>>` and `Option<Provided<T>>` yield `None` instead of
//!   failing when the value is absent

use crate::error::{DiError, DiResult};
use crate::node::{Node, NodeDescriptor};
use crate::scope::Scope;
use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// What a single dependency marker points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
	/// Another node, resolved by the graph
	Node(NodeDescriptor),
	/// A value pushed into the scope chain by the host
	Provided {
		key: TypeId,
		type_name: &'static str,
	},
}

/// Static description of one dependency marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyDescriptor {
	pub kind: DependencyKind,
	pub optional: bool,
}

impl DependencyDescriptor {
	pub fn name(&self) -> &'static str {
		match self.kind {
			DependencyKind::Node(node) => node.name(),
			DependencyKind::Provided { type_name, .. } => type_name,
		}
	}

	/// The node this dependency points at, if any.
	pub fn node(&self) -> Option<NodeDescriptor> {
		match self.kind {
			DependencyKind::Node(node) => Some(node),
			DependencyKind::Provided { .. } => None,
		}
	}
}

/// A single injectable element of a composition function's parameters.
pub trait Dependency: Sized + Send + 'static {
	fn descriptor() -> DependencyDescriptor;

	/// Read the value out of the scope chain.
	fn extract(scope: &Scope) -> DiResult<Self>;
}

/// The resolved value of node `N`.
///
/// # Examples
///
/// ```
/// use nodal_di::Dep;
/// use std::sync::Arc;
///
/// struct Greeting;
/// #[async_trait::async_trait]
/// impl nodal_di::Node for Greeting {
///     type Output = String;
///     type Deps = ();
///     async fn compose(_: ()) -> nodal_di::NodeResult<nodal_di::Composition<String>> {
///         Ok("hi".to_string().into())
///     }
/// }
///
/// let dep = Dep::<Greeting>::from_arc(Arc::new("hi".to_string()));
/// assert_eq!(dep.len(), 2);
/// ```
pub struct Dep<N: Node> {
	value: Arc<N::Output>,
}

impl<N: Node> Dep<N> {
	pub fn from_arc(value: Arc<N::Output>) -> Self {
		Self { value }
	}

	pub fn into_arc(self) -> Arc<N::Output> {
		self.value
	}

	/// Looks up `N` in the scope chain without failing on a miss.
	pub fn from_scope(scope: &Scope) -> Option<Self> {
		scope.retrieve_node::<N>().map(Self::from_arc)
	}
}

impl<N: Node> Deref for Dep<N> {
	type Target = N::Output;

	fn deref(&self) -> &Self::Target {
		&self.value
	}
}

impl<N: Node> Clone for Dep<N> {
	fn clone(&self) -> Self {
		Self {
			value: Arc::clone(&self.value),
		}
	}
}

impl<N: Node> fmt::Debug for Dep<N>
where
	N::Output: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Dep").field(&self.value).finish()
	}
}

impl<N: Node> Dependency for Dep<N> {
	fn descriptor() -> DependencyDescriptor {
		DependencyDescriptor {
			kind: DependencyKind::Node(NodeDescriptor::of::<N>()),
			optional: false,
		}
	}

	fn extract(scope: &Scope) -> DiResult<Self> {
		Self::from_scope(scope).ok_or_else(|| DiError::NotFound(N::name().to_string()))
	}
}

impl<N: Node> Dependency for Option<Dep<N>> {
	fn descriptor() -> DependencyDescriptor {
		DependencyDescriptor {
			optional: true,
			..Dep::<N>::descriptor()
		}
	}

	fn extract(scope: &Scope) -> DiResult<Self> {
		Ok(Dep::<N>::from_scope(scope))
	}
}

/// A value pushed into the scope chain, shared by reference.
pub struct Provided<T>(Arc<T>);

impl<T> Provided<T> {
	pub fn into_arc(self) -> Arc<T> {
		self.0
	}
}

impl<T> Deref for Provided<T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.0
	}
}

impl<T> Clone for Provided<T> {
	fn clone(&self) -> Self {
		Self(Arc::clone(&self.0))
	}
}

impl<T: fmt::Debug> fmt::Debug for Provided<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Provided").field(&self.0).finish()
	}
}

impl<T: Any + Send + Sync> Dependency for Provided<T> {
	fn descriptor() -> DependencyDescriptor {
		DependencyDescriptor {
			kind: DependencyKind::Provided {
				key: TypeId::of::<T>(),
				type_name: crate::node::short_type_name(std::any::type_name::<T>()),
			},
			optional: false,
		}
	}

	fn extract(scope: &Scope) -> DiResult<Self> {
		scope
			.retrieve::<T>()
			.map(Provided)
			.ok_or_else(|| DiError::NotFound(std::any::type_name::<T>().to_string()))
	}
}

impl<T: Any + Send + Sync> Dependency for Option<Provided<T>> {
	fn descriptor() -> DependencyDescriptor {
		DependencyDescriptor {
			optional: true,
			..Provided::<T>::descriptor()
		}
	}

	fn extract(scope: &Scope) -> DiResult<Self> {
		Ok(scope.retrieve::<T>().map(Provided))
	}
}

/// The full parameter list of a composition function.
pub trait Dependencies: Sized + Send + 'static {
	fn descriptors() -> Vec<DependencyDescriptor>;

	fn extract(scope: &Scope) -> DiResult<Self>;
}

impl Dependencies for () {
	fn descriptors() -> Vec<DependencyDescriptor> {
		Vec::new()
	}

	fn extract(_scope: &Scope) -> DiResult<Self> {
		Ok(())
	}
}

macro_rules! impl_dependencies_tuple {
	($($ty:ident),+) => {
		impl<$($ty: Dependency),+> Dependencies for ($($ty,)+) {
			fn descriptors() -> Vec<DependencyDescriptor> {
				vec![$($ty::descriptor()),+]
			}

			fn extract(scope: &Scope) -> DiResult<Self> {
				Ok(($($ty::extract(scope)?,)+))
			}
		}
	};
}

impl_dependencies_tuple!(A);
impl_dependencies_tuple!(A, B);
impl_dependencies_tuple!(A, B, C);
impl_dependencies_tuple!(A, B, C, D);
impl_dependencies_tuple!(A, B, C, D, E);
impl_dependencies_tuple!(A, B, C, D, E, F);
impl_dependencies_tuple!(A, B, C, D, E, F, G);
impl_dependencies_tuple!(A, B, C, D, E, F, G, H);
