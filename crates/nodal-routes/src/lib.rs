//! # Nodal Routes
//!
//! Attaches node graphs to request handlers. A handler declares the nodes it
//! needs as its second parameter; the route compiles their graph once and
//! resolves it inside a fresh scope for every request.
//!
//! ## Example
//!
//! ```rust
//! use nodal_di::{Composition, Dep, DiError, Node, NodeResult, Provided};
//! use nodal_http::Request;
//! use nodal_routes::node_route;
//!
//! struct RequestMethod;
//!
//! #[nodal_di::async_trait]
//! impl Node for RequestMethod {
//!     type Output = String;
//!     type Deps = (Provided<Request>,);
//!
//!     async fn compose((request,): (Provided<Request>,)) -> NodeResult<Composition<String>> {
//!         Ok(request.method.to_string().into())
//!     }
//! }
//!
//! async fn echo((): (), (method,): (Dep<RequestMethod>,)) -> Result<String, DiError> {
//!     Ok(format!("method={}", *method))
//! }
//!
//! # tokio_test::block_on(async {
//! let route = node_route(echo).unwrap();
//! let request = Request::builder().method(hyper::Method::PUT).build().unwrap();
//! assert_eq!(route.call((), request).await.unwrap(), "method=PUT");
//! # });
//! ```

pub mod handler;
pub mod route;
pub mod shared;

pub use handler::{NodeHandler, SyncHandler, sync_handler};
pub use route::{Endpoint, NodeParam, NodeParams, NodeRoute, Route, node_route, node_route_with_scope};
pub use shared::{SharedScope, create_scope};
