//! Node routes
//!
//! [`NodeRoute`] wires a handler to a compiled [`Agent`] once, at
//! registration. The resulting [`Route`] then runs every request in its own
//! scope:
//!
//! 1. create a request scope, chained to the shared scope if one is configured
//! 2. push the ambient [`Request`]
//! 3. run the agent
//! 4. read the handler's node parameters out of the scope
//! 5. call the handler
//! 6. dispose the scope, releasing resources last-acquired first
//!
//! Handlers that declare no node parameters are called directly, without a
//! scope.

use crate::handler::NodeHandler;
use crate::shared::SharedScope;
use async_trait::async_trait;
use nodal_di::{Agent, Dep, DiError, DiResult, DiSettings, Node, NodeDescriptor, Scope};
use nodal_http::{FromRequest, ParamError, Request};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Instrument;

/// A single node-injected handler parameter.
pub trait NodeParam: Sized + Send + 'static {
	fn descriptor() -> NodeDescriptor;

	/// Read the resolved value out of the request scope.
	fn from_scope(scope: &Scope) -> DiResult<Self>;
}

impl<N: Node> NodeParam for Dep<N> {
	fn descriptor() -> NodeDescriptor {
		NodeDescriptor::of::<N>()
	}

	fn from_scope(scope: &Scope) -> DiResult<Self> {
		Dep::from_scope(scope).ok_or(DiError::Unresolved { node: N::name() })
	}
}

impl<N: Node> NodeParam for Option<Dep<N>> {
	fn descriptor() -> NodeDescriptor {
		NodeDescriptor::of::<N>()
	}

	fn from_scope(scope: &Scope) -> DiResult<Self> {
		Ok(Dep::from_scope(scope))
	}
}

/// The node-injected parameters of a handler: `()` or a tuple of
/// [`NodeParam`]s.
pub trait NodeParams: Sized + Send + 'static {
	fn descriptors() -> Vec<NodeDescriptor>;

	fn from_scope(scope: &Scope) -> DiResult<Self>;

	/// The value to pass when no nodes are declared.
	fn empty() -> Option<Self> {
		None
	}
}

impl NodeParams for () {
	fn descriptors() -> Vec<NodeDescriptor> {
		Vec::new()
	}

	fn from_scope(_scope: &Scope) -> DiResult<Self> {
		Ok(())
	}

	fn empty() -> Option<Self> {
		Some(())
	}
}

macro_rules! impl_node_params_tuple {
	($($ty:ident),+) => {
		impl<$($ty: NodeParam),+> NodeParams for ($($ty,)+) {
			fn descriptors() -> Vec<NodeDescriptor> {
				vec![$($ty::descriptor()),+]
			}

			fn from_scope(scope: &Scope) -> DiResult<Self> {
				Ok(($($ty::from_scope(scope)?,)+))
			}
		}
	};
}

impl_node_params_tuple!(A);
impl_node_params_tuple!(A, B);
impl_node_params_tuple!(A, B, C);
impl_node_params_tuple!(A, B, C, D);
impl_node_params_tuple!(A, B, C, D, E);
impl_node_params_tuple!(A, B, C, D, E, F);
impl_node_params_tuple!(A, B, C, D, E, F, G);
impl_node_params_tuple!(A, B, C, D, E, F, G, H);

/// Builder registering a handler as a node route.
///
/// # Examples
///
/// ```
/// use nodal_di::{Composition, Dep, Node, NodeResult, Provided};
/// use nodal_http::Request;
/// use nodal_routes::{NodeRoute, SharedScope};
///
/// struct CurrentUser;
///
/// #[nodal_di::async_trait]
/// impl Node for CurrentUser {
///     type Output = String;
///     type Deps = (Provided<Request>,);
///
///     async fn compose((request,): (Provided<Request>,)) -> NodeResult<Composition<String>> {
///         Ok(request.header("x-user").unwrap_or("anon").to_string().into())
///     }
/// }
///
/// async fn me((): (), (user,): (Dep<CurrentUser>,)) -> Result<String, nodal_di::DiError> {
///     Ok((*user).clone())
/// }
///
/// # tokio_test::block_on(async {
/// let shared = SharedScope::new("app");
/// let route = NodeRoute::new(me).with_scope(&shared).build().unwrap();
///
/// let request = Request::builder().header("x-user", "alice").build().unwrap();
/// assert_eq!(route.call((), request).await.unwrap(), "alice");
/// # });
/// ```
pub struct NodeRoute<H, P, N> {
	handler: H,
	shared: Option<Arc<Scope>>,
	settings: DiSettings,
	_marker: PhantomData<fn(P, N)>,
}

impl<H, P, N> NodeRoute<H, P, N>
where
	H: NodeHandler<P, N>,
	N: NodeParams,
{
	pub fn new(handler: H) -> Self {
		Self {
			handler,
			shared: None,
			settings: DiSettings::default(),
			_marker: PhantomData,
		}
	}

	/// Chain every request scope of this route to `shared`.
	pub fn with_scope(mut self, shared: &SharedScope) -> Self {
		self.shared = Some(shared.scope());
		self
	}

	pub fn with_settings(mut self, settings: DiSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Compile the route's node graph.
	///
	/// Fails if the declared nodes form a cycle or exceed the depth limit.
	pub fn build(self) -> DiResult<Route<H, P, N>> {
		self.settings.validate()?;
		let passthrough = N::empty().is_some();
		let agent = Agent::build_with_settings(N::descriptors(), &self.settings)?;
		if passthrough {
			tracing::debug!("route declares no nodes; handler is called directly");
		} else {
			tracing::debug!(nodes = ?agent.plan(), "registered node route");
		}

		Ok(Route {
			handler: self.handler,
			agent,
			passthrough,
			shared: self.shared,
			detail_prefix: self.settings.detail_prefix,
			counter: AtomicU64::new(0),
			_marker: PhantomData,
		})
	}
}

/// Register `handler` as a node route with standalone request scopes.
pub fn node_route<H, P, N>(handler: H) -> DiResult<Route<H, P, N>>
where
	H: NodeHandler<P, N>,
	N: NodeParams,
{
	NodeRoute::new(handler).build()
}

/// Register `handler` as a node route whose request scopes chain to `shared`.
pub fn node_route_with_scope<H, P, N>(handler: H, shared: &SharedScope) -> DiResult<Route<H, P, N>>
where
	H: NodeHandler<P, N>,
	N: NodeParams,
{
	NodeRoute::new(handler).with_scope(shared).build()
}

/// A registered node route.
pub struct Route<H, P, N> {
	handler: H,
	agent: Agent,
	passthrough: bool,
	shared: Option<Arc<Scope>>,
	detail_prefix: String,
	counter: AtomicU64,
	_marker: PhantomData<fn(P, N)>,
}

impl<H, P, N> Route<H, P, N>
where
	H: NodeHandler<P, N>,
	P: Send + 'static,
	N: NodeParams,
{
	/// Handle one request with native parameters supplied by the host.
	///
	/// Errors from the node graph reach the caller through `E: From<DiError>`
	/// without translation. If the handler succeeds but a cleanup fails, the
	/// cleanup error is returned; if both fail, the handler's error wins and
	/// the cleanup error is logged.
	pub async fn call<T, E>(&self, params: P, request: Request) -> Result<T, E>
	where
		H: NodeHandler<P, N, Output = Result<T, E>>,
		E: From<DiError>,
	{
		if let Some(nodes) = N::empty() {
			return self.handler.call(params, nodes).await;
		}

		let detail = format!(
			"{}:{}",
			self.detail_prefix,
			self.counter.fetch_add(1, Ordering::Relaxed) + 1
		);
		let scope = Arc::new(match &self.shared {
			Some(shared) => shared.create_child(detail)?,
			None => Scope::new(detail),
		});
		let span = tracing::debug_span!("request_scope", detail = %scope.detail());

		async move {
			let guard = scope.enter()?;
			let outcome = self.resolve_and_call(&scope, params, request).await;
			let cleanup = guard.exit().await;

			match (outcome, cleanup) {
				(Ok(value), Ok(())) => Ok(value),
				(Ok(_), Err(error)) => Err(error.into()),
				(Err(error), Ok(())) => Err(error),
				(Err(error), Err(cleanup_error)) => {
					tracing::error!(
						error = %cleanup_error,
						"cleanup failed after handler error; returning handler error"
					);
					Err(error)
				}
			}
		}
		.instrument(span)
		.await
	}

	async fn resolve_and_call<T, E>(&self, scope: &Scope, params: P, request: Request) -> Result<T, E>
	where
		H: NodeHandler<P, N, Output = Result<T, E>>,
		E: From<DiError>,
	{
		scope.push(request)?;
		self.agent.run(scope).await?;
		let nodes = N::from_scope(scope)?;
		self.handler.call(params, nodes).await
	}

	/// True if the handler declares no node parameters.
	pub fn is_passthrough(&self) -> bool {
		self.passthrough
	}

	/// The compiled agent, absent for pass-through routes.
	pub fn agent(&self) -> Option<&Agent> {
		(!self.passthrough).then_some(&self.agent)
	}

	/// Number of request scopes created so far.
	pub fn requests_served(&self) -> u64 {
		self.counter.load(Ordering::Relaxed)
	}
}

impl<H, P, N> fmt::Debug for Route<H, P, N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Route")
			.field("nodes", &self.agent.requested())
			.field("passthrough", &self.passthrough)
			.field("shared", &self.shared.as_ref().map(|s| s.detail().to_string()))
			.field("detail_prefix", &self.detail_prefix)
			.finish_non_exhaustive()
	}
}

/// Anything that can answer a [`Request`].
#[async_trait]
pub trait Endpoint: Send + Sync {
	type Output: Send;

	async fn handle(&self, request: Request) -> Self::Output;
}

#[async_trait]
impl<H, P, N, T, E> Endpoint for Route<H, P, N>
where
	H: NodeHandler<P, N, Output = Result<T, E>>,
	P: FromRequest + 'static,
	N: NodeParams,
	T: Send + 'static,
	E: From<DiError> + From<ParamError> + Send + 'static,
{
	type Output = Result<T, E>;

	/// Extract the native parameters from `request`, then [`call`](Route::call).
	async fn handle(&self, request: Request) -> Result<T, E> {
		let params = P::from_request(&request).await?;
		self.call(params, request).await
	}
}
