//! Route adapter: compile a handler's node graph once, resolve it per request.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nodal::routes::{SharedScope, node_route_with_scope};
//! ```

pub use nodal_routes::*;
