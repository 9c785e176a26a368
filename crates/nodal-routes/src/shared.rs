//! Application-wide shared scope
//!
//! A [`SharedScope`] is created once at startup, populated with
//! application-wide values, and passed to every route that should see them.
//! Request scopes chain to it, so its values are visible to every request
//! unless a request pushes a value of the same type.

use nodal_di::{DiResult, Node, Scope};
use std::any::Any;
use std::sync::Arc;

/// Handle to a process-lifetime scope.
///
/// Cloning the handle shares the same scope.
///
/// # Examples
///
/// ```
/// use nodal_routes::SharedScope;
///
/// struct FlagService {
///     rollout: f64,
/// }
///
/// let shared = SharedScope::new("app");
/// shared.set(FlagService { rollout: 0.5 }).unwrap();
///
/// assert_eq!(shared.get::<FlagService>().unwrap().rollout, 0.5);
/// assert!(shared.get::<String>().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SharedScope {
	scope: Arc<Scope>,
}

impl SharedScope {
	pub fn new(detail: impl Into<String>) -> Self {
		Self {
			scope: Arc::new(Scope::new(detail)),
		}
	}

	/// Store an application-wide value under its own type.
	pub fn set<T: Any + Send + Sync>(&self, value: T) -> DiResult<()> {
		self.scope.push(value)
	}

	/// Store a fixed value for node `N`, replacing its composition in every
	/// request chained to this scope.
	pub fn set_node<N: Node>(&self, output: N::Output) -> DiResult<()> {
		self.scope.push_node::<N>(output)
	}

	pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		self.scope.retrieve::<T>()
	}

	pub fn get_node<N: Node>(&self) -> Option<Arc<N::Output>> {
		self.scope.retrieve_node::<N>()
	}

	/// The underlying scope, for chaining request scopes to it.
	pub fn scope(&self) -> Arc<Scope> {
		Arc::clone(&self.scope)
	}

	/// Dispose the shared scope, running its cleanups.
	///
	/// Afterwards the scope holds nothing: lookups return `None`, and every
	/// route chained to it rejects requests with
	/// [`ScopeDisposed`](nodal_di::DiError::ScopeDisposed).
	pub async fn shutdown(&self) -> DiResult<()> {
		self.scope.dispose().await
	}
}

impl Default for SharedScope {
	fn default() -> Self {
		Self::new("app")
	}
}

/// Create a shared scope with the given detail.
pub fn create_scope(detail: impl Into<String>) -> SharedScope {
	SharedScope::new(detail)
}
