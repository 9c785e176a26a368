//! Node composition and scopes.
//!
//! # Examples
//!
//! ```rust
//! use nodal::di::{Scope, ScopeState};
//!
//! let scope = Scope::new("job:1");
//! assert_eq!(scope.state(), ScopeState::Idle);
//! ```

pub use nodal_di::*;
