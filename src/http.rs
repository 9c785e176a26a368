//! The ambient request and framework-native parameters.

pub use nodal_http::*;
