//! # Nodal
//!
//! Request-scoped node composition for async web handlers.
//!
//! A *node* is a type whose value is composed from other nodes and from
//! values already present in a scope. Handlers declare the nodes they need;
//! at registration the route compiles those declarations into an execution
//! plan, and on every request it builds a fresh scope, composes the plan,
//! calls the handler and releases any acquired resources in reverse order.
//!
//! ## Feature Flags
//!
//! - `generator` - generator-style nodes that yield one value and release it
//!   when the scope exits
//! - `dev-tools` - DOT export and statistics for compiled graphs
//! - `full` - all of the above
//!
//! ## Quick Example
//!
//! ```rust
//! use nodal::prelude::*;
//!
//! struct Greeting;
//!
//! #[async_trait]
//! impl Node for Greeting {
//!     type Output = String;
//!     type Deps = (Provided<Request>,);
//!
//!     async fn compose((request,): (Provided<Request>,)) -> NodeResult<Composition<String>> {
//!         Ok(format!("hello from {}", request.path()).into())
//!     }
//! }
//!
//! async fn hello((): (), (greeting,): (Dep<Greeting>,)) -> Result<String, DiError> {
//!     Ok((*greeting).clone())
//! }
//!
//! # tokio_test::block_on(async {
//! let route = node_route(hello).unwrap();
//! let request = Request::builder().uri("/hi").build().unwrap();
//!
//! assert_eq!(route.call((), request).await.unwrap(), "hello from /hi");
//! # });
//! ```

pub mod di;
pub mod http;
pub mod routes;

pub use nodal_di::{
	Agent, BoxError, Composition, Dep, DependencyGraph, DiError, DiResult, DiSettings, Evaluation,
	Node, NodeResult, Provided, Scope, ScopeGuard,
};
pub use nodal_http::{FromRequest, HeaderStruct, ParamError, Path, Query, Request};
pub use nodal_routes::{
	Endpoint, NodeRoute, Route, SharedScope, create_scope, node_route, node_route_with_scope,
	sync_handler,
};

#[cfg(feature = "dev-tools")]
pub use nodal_di::GraphStatistics;

/// Prelude module for convenient imports
///
/// Import everything commonly needed with:
/// ```rust
/// use nodal::prelude::*;
/// ```
pub mod prelude {
	pub use crate::{
		Composition, Dep, DiError, DiSettings, Endpoint, Evaluation, FromRequest, HeaderStruct,
		Node, NodeResult, NodeRoute, ParamError, Path, Provided, Query, Request, Route, Scope,
		SharedScope, create_scope, node_route, node_route_with_scope, sync_handler,
	};

	// External
	pub use nodal_di::async_trait;

	#[cfg(feature = "generator")]
	pub use nodal_di::Co;
}
