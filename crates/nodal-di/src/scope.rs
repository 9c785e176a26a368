//! Resolution scopes
//!
//! A [`Scope`] owns resolved values keyed by type and the release actions of
//! resources acquired while resolving them. Scopes chain to a parent: lookups
//! consult the local table first, then walk the parent chain.
//!
//! A shared scope lives for the whole process and holds application-wide
//! values; each request gets a child scope that is disposed when the request
//! completes.

use crate::error::{BoxError, DiError, DiResult, NodeResult};
use crate::node::{Node, Release};
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type Slot = Arc<dyn Any + Send + Sync>;

/// A pending cleanup action registered on a scope.
pub type Cleanup = Box<dyn FnOnce() -> BoxFuture<'static, DiResult<()>> + Send>;

/// Lifecycle state of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
	/// Created, not yet entered
	Idle,
	/// Entered; cleanups will run on exit
	Active,
	/// Disposed; no further pushes or resolutions
	Disposed,
}

pub struct Scope {
	detail: String,
	parent: Option<Arc<Scope>>,
	values: RwLock<HashMap<TypeId, Slot>>,
	cleanups: Mutex<Vec<(&'static str, Cleanup)>>,
	state: Mutex<ScopeState>,
}

impl Scope {
	/// Creates a root scope with no parent.
	///
	/// # Examples
	///
	/// ```
	/// use nodal_di::Scope;
	///
	/// let scope = Scope::new("app");
	/// assert_eq!(scope.detail(), "app");
	/// assert!(scope.parent().is_none());
	/// ```
	pub fn new(detail: impl Into<String>) -> Self {
		Self::with_parent(detail.into(), None)
	}

	/// Creates a child scope whose lookups fall back to this scope.
	///
	/// Fails with [`DiError::ScopeDisposed`] once this scope or any ancestor
	/// has been disposed.
	///
	/// # Examples
	///
	/// ```
	/// use nodal_di::Scope;
	/// use std::sync::Arc;
	///
	/// let shared = Arc::new(Scope::new("app"));
	/// shared.push(42u64).unwrap();
	///
	/// let request = shared.create_child("req:1").unwrap();
	/// assert_eq!(*request.retrieve::<u64>().unwrap(), 42);
	/// ```
	pub fn create_child(self: &Arc<Self>, detail: impl Into<String>) -> DiResult<Scope> {
		self.ensure_open()?;
		Ok(Self::with_parent(detail.into(), Some(Arc::clone(self))))
	}

	fn with_parent(detail: String, parent: Option<Arc<Scope>>) -> Self {
		Self {
			detail,
			parent,
			values: RwLock::new(HashMap::new()),
			cleanups: Mutex::new(Vec::new()),
			state: Mutex::new(ScopeState::Idle),
		}
	}

	pub fn detail(&self) -> &str {
		&self.detail
	}

	pub fn parent(&self) -> Option<&Arc<Scope>> {
		self.parent.as_ref()
	}

	pub fn state(&self) -> ScopeState {
		*self.state.lock()
	}

	pub fn is_disposed(&self) -> bool {
		self.state() == ScopeState::Disposed
	}

	/// Stores a value under its own type in this scope.
	///
	/// Overwrites any earlier value of the same type in this scope only;
	/// parent scopes are untouched.
	///
	/// # Examples
	///
	/// ```
	/// use nodal_di::Scope;
	///
	/// let scope = Scope::new("req");
	/// scope.push("hello".to_string()).unwrap();
	/// assert_eq!(*scope.retrieve::<String>().unwrap(), "hello");
	/// ```
	pub fn push<T: Any + Send + Sync>(&self, value: T) -> DiResult<()> {
		self.push_arc(Arc::new(value))
	}

	/// Stores a pre-wrapped `Arc<T>` under type `T`.
	pub fn push_arc<T: Any + Send + Sync>(&self, value: Arc<T>) -> DiResult<()> {
		self.insert(TypeId::of::<T>(), value)
	}

	/// Stores a value for node `N`, shadowing its composition in this scope
	/// and every scope chained to it.
	pub fn push_node<N: Node>(&self, output: N::Output) -> DiResult<()> {
		self.insert(TypeId::of::<N>(), Arc::new(output))
	}

	fn insert(&self, key: TypeId, slot: Slot) -> DiResult<()> {
		self.ensure_open()?;
		self.values.write().insert(key, slot);
		Ok(())
	}

	/// Looks up a value by type, walking the parent chain.
	///
	/// Returns `None` when no scope in the chain holds a value of type `T`.
	pub fn retrieve<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		self.retrieve_slot(TypeId::of::<T>())
			.and_then(|slot| slot.downcast::<T>().ok())
	}

	/// Looks up the resolved value of node `N`, walking the parent chain.
	pub fn retrieve_node<N: Node>(&self) -> Option<Arc<N::Output>> {
		self.retrieve_slot(TypeId::of::<N>())
			.and_then(|slot| slot.downcast::<N::Output>().ok())
	}

	fn retrieve_slot(&self, key: TypeId) -> Option<Slot> {
		self.live_chain()
			.find_map(|scope| scope.values.read().get(&key).map(Arc::clone))
	}

	/// Scopes consulted by lookups, nearest first.
	///
	/// The walk stops at the first disposed scope: values held there (and in
	/// its ancestors) may already have been released.
	fn live_chain(&self) -> impl Iterator<Item = &Scope> {
		std::iter::successors(Some(self), |scope| scope.parent.as_deref())
			.take_while(|scope| !scope.is_disposed())
	}

	/// Returns true if this scope or any live ancestor holds `key`.
	pub fn contains_key(&self, key: TypeId) -> bool {
		self.live_chain().any(|scope| scope.contains_local(key))
	}

	/// Returns true if this scope itself holds `key`.
	pub fn contains_local(&self, key: TypeId) -> bool {
		self.values.read().contains_key(&key)
	}

	/// Number of values stored directly in this scope.
	pub fn len(&self) -> usize {
		self.values.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Records the composed value of node `N`.
	///
	/// The node table is single-assignment: if `N` already has a value in this
	/// scope the first one is kept. A release action is always registered,
	/// since the resource it guards was acquired either way.
	pub(crate) fn store_node<N: Node>(
		&self,
		value: N::Output,
		release: Option<Release>,
	) -> DiResult<()> {
		self.ensure_open()?;
		if let Some(release) = release {
			self.push_cleanup(N::name(), Box::new(move || release_with_label(N::name(), release)));
		}

		let mut values = self.values.write();
		if values.contains_key(&TypeId::of::<N>()) {
			tracing::debug!(
				node = N::name(),
				scope = %self.detail,
				"node already resolved in scope; keeping first value"
			);
			return Ok(());
		}
		values.insert(TypeId::of::<N>(), Arc::new(value));
		Ok(())
	}

	/// Registers a cleanup action to run when this scope is disposed.
	///
	/// # Examples
	///
	/// ```
	/// use nodal_di::Scope;
	///
	/// # tokio_test::block_on(async {
	/// let scope = Scope::new("req");
	/// scope.defer("audit", || async { Ok(()) }).unwrap();
	/// assert_eq!(scope.pending_cleanups(), 1);
	///
	/// scope.dispose().await.unwrap();
	/// assert_eq!(scope.pending_cleanups(), 0);
	/// # });
	/// ```
	pub fn defer<F, Fut>(&self, label: &'static str, cleanup: F) -> DiResult<()>
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = NodeResult<()>> + Send + 'static,
	{
		self.ensure_open()?;
		let release: Release = Box::new(move || Box::pin(cleanup()));
		self.push_cleanup(label, Box::new(move || release_with_label(label, release)));
		Ok(())
	}

	fn push_cleanup(&self, label: &'static str, cleanup: Cleanup) {
		self.cleanups.lock().push((label, cleanup));
	}

	/// Number of cleanups registered and not yet run.
	pub fn pending_cleanups(&self) -> usize {
		self.cleanups.lock().len()
	}

	/// Marks this scope active and returns a guard that disposes it.
	///
	/// The guard must be finished with [`ScopeGuard::exit`]. If it is dropped
	/// first (the surrounding future was cancelled or panicked), the pending
	/// cleanups still run in the background.
	pub fn enter(self: &Arc<Self>) -> DiResult<ScopeGuard> {
		if let Some(parent) = &self.parent {
			parent.ensure_open()?;
		}
		{
			let mut state = self.state.lock();
			if *state == ScopeState::Disposed {
				return Err(self.disposed_error());
			}
			*state = ScopeState::Active;
		}
		Ok(ScopeGuard {
			scope: Arc::clone(self),
			armed: true,
		})
	}

	/// Disposes this scope, running every pending cleanup in reverse
	/// registration order.
	///
	/// Every cleanup runs even if earlier ones fail; failures are collected and
	/// returned together as [`DiError::Cleanup`] once the sweep completes.
	/// Disposing an already disposed scope runs whatever is still pending,
	/// which is normally nothing.
	pub async fn dispose(&self) -> DiResult<()> {
		*self.state.lock() = ScopeState::Disposed;

		let mut errors = Vec::new();
		let mut ran = 0usize;
		loop {
			// Pop one at a time so a cancelled sweep leaves the rest pending.
			let next = self.cleanups.lock().pop();
			let Some((label, cleanup)) = next else {
				break;
			};
			ran += 1;
			if let Err(error) = cleanup().await {
				tracing::warn!(scope = %self.detail, cleanup = label, error = %error, "cleanup failed");
				errors.push(error);
			}
		}

		tracing::debug!(scope = %self.detail, cleanups = ran, failed = errors.len(), "scope disposed");
		if errors.is_empty() {
			Ok(())
		} else {
			Err(DiError::Cleanup(errors))
		}
	}

	/// Fails with [`DiError::ScopeDisposed`] naming the nearest disposed scope
	/// in the chain, if there is one.
	pub fn ensure_open(&self) -> DiResult<()> {
		match std::iter::successors(Some(self), |scope| scope.parent.as_deref())
			.find(|scope| scope.is_disposed())
		{
			Some(disposed) => Err(disposed.disposed_error()),
			None => Ok(()),
		}
	}

	fn disposed_error(&self) -> DiError {
		DiError::ScopeDisposed {
			detail: self.detail.clone(),
		}
	}
}

fn release_with_label(label: &'static str, release: Release) -> BoxFuture<'static, DiResult<()>> {
	Box::pin(async move {
		release()
			.await
			.map_err(|error: BoxError| DiError::from_release(label, error))
	})
}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("detail", &self.detail)
			.field("parent", &self.parent.as_ref().map(|p| p.detail.clone()))
			.field("values", &self.len())
			.field("pending_cleanups", &self.pending_cleanups())
			.field("state", &self.state())
			.finish()
	}
}

/// Active acquisition of a [`Scope`].
///
/// Created by [`Scope::enter`]. Call [`exit`](ScopeGuard::exit) to dispose the
/// scope; dropping the guard early hands the pending cleanups to the tokio
/// runtime instead of leaking them.
#[must_use = "a scope guard must be exited to run cleanups deterministically"]
pub struct ScopeGuard {
	scope: Arc<Scope>,
	armed: bool,
}

impl ScopeGuard {
	pub fn scope(&self) -> &Arc<Scope> {
		&self.scope
	}

	/// Disposes the scope, running all cleanups last-acquired first.
	pub async fn exit(mut self) -> DiResult<()> {
		let outcome = self.scope.dispose().await;
		self.armed = false;
		outcome
	}
}

impl Drop for ScopeGuard {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}
		if self.scope.pending_cleanups() == 0 {
			*self.scope.state.lock() = ScopeState::Disposed;
			return;
		}

		tracing::warn!(
			scope = %self.scope.detail,
			pending = self.scope.pending_cleanups(),
			"scope guard dropped before exit; releasing resources in the background"
		);
		let sweep = DetachedSweep {
			scope: Some(Arc::clone(&self.scope)),
		};

		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				handle.spawn(sweep.run());
			}
			Err(_) => sweep.run_blocking(),
		}
	}
}

/// Cleanups of a scope whose guard was dropped.
///
/// Normally run as a task on the current runtime. If that task is dropped
/// before finishing (the runtime is shutting down), whatever is still pending
/// runs on a dedicated thread instead.
struct DetachedSweep {
	scope: Option<Arc<Scope>>,
}

impl DetachedSweep {
	async fn run(mut self) {
		if let Some(scope) = self.scope.as_ref().map(Arc::clone) {
			sweep(&scope).await;
		}
		self.scope = None;
	}

	fn run_blocking(mut self) {
		if let Some(scope) = self.scope.take() {
			sweep_on_fresh_runtime(&scope);
		}
	}
}

impl Drop for DetachedSweep {
	fn drop(&mut self) {
		let Some(scope) = self.scope.take() else {
			return;
		};
		if scope.pending_cleanups() == 0 {
			return;
		}
		// A runtime cannot be started from inside the one being torn down.
		let spawned = std::thread::Builder::new()
			.name("nodal-scope-cleanup".to_string())
			.spawn(move || sweep_on_fresh_runtime(&scope));
		if let Err(error) = spawned {
			tracing::error!(error = %error, "failed to start cleanup thread; resources leaked");
		}
	}
}

async fn sweep(scope: &Scope) {
	if let Err(error) = scope.dispose().await {
		tracing::warn!(scope = %scope.detail, error = %error, "background cleanup failed");
	}
}

fn sweep_on_fresh_runtime(scope: &Scope) {
	match tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
	{
		Ok(runtime) => runtime.block_on(sweep(scope)),
		Err(error) => {
			tracing::error!(error = %error, "no runtime available to run scope cleanups");
		}
	}
}
