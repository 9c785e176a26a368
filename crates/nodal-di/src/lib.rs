//! # Nodal Dependency Injection
//!
//! Request-scoped, type-keyed value composition.
//!
//! ## Features
//!
//! - **Type-safe**: nodes and their dependencies are checked at compile time
//! - **Async-first**: composition functions are async and may acquire resources
//! - **Scoped**: per-request scopes chained to a long-lived shared scope
//! - **Compiled**: dependency graphs are validated and planned once, then run
//!   per request
//!
//! ## Generator Support (generator feature)
//!
//! Single-yield generator compositions, where the code after the yield
//! releases the resource. Uses `genawaiter` in place of native async yield.
//!
//! ## Development Tools (dev-tools feature)
//!
//! DOT output and statistics for compiled graphs.
//!
//! ## Example
//!
//! ```rust
//! use nodal_di::{Agent, Composition, Dep, Node, NodeDescriptor, NodeResult, Provided, Scope};
//! use std::sync::Arc;
//!
//! struct Settings {
//!     greeting: &'static str,
//! }
//!
//! struct Greeting;
//!
//! #[async_trait::async_trait]
//! impl Node for Greeting {
//!     type Output = String;
//!     type Deps = (Provided<Settings>,);
//!
//!     async fn compose((settings,): (Provided<Settings>,)) -> NodeResult<Composition<String>> {
//!         Ok(format!("{}, world", settings.greeting).into())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let shared = Arc::new(Scope::new("app"));
//! shared.push(Settings { greeting: "hello" }).unwrap();
//!
//! let agent = Agent::build([NodeDescriptor::of::<Greeting>()]).unwrap();
//!
//! let request = Arc::new(shared.create_child("req:1").unwrap());
//! let guard = request.enter().unwrap();
//! agent.run(&request).await.unwrap();
//! let greeting = Dep::<Greeting>::from_scope(&request).unwrap();
//! assert_eq!(&*greeting, "hello, world");
//! guard.exit().await.unwrap();
//! # });
//! ```

pub mod agent;
pub mod cycle_detection;
pub mod dependency;
pub mod error;
#[cfg(feature = "generator")]
pub mod generator;
pub mod graph;
pub mod node;
pub mod scope;
pub mod settings;
#[cfg(feature = "dev-tools")]
pub mod visualization;

pub use agent::Agent;
pub use dependency::{Dep, Dependencies, Dependency, DependencyDescriptor, DependencyKind, Provided};
pub use error::{BoxError, DiError, DiResult, NodeResult};
pub use graph::DependencyGraph;
pub use node::{Composition, Node, NodeDescriptor, Release};
pub use scope::{Scope, ScopeGuard, ScopeState};
pub use settings::{DiSettings, Evaluation};

#[cfg(feature = "generator")]
pub use genawaiter::sync::Co;
#[cfg(feature = "dev-tools")]
pub use visualization::GraphStatistics;

/// Re-exported for implementing [`Node`] without a direct dependency.
pub use async_trait::async_trait;
