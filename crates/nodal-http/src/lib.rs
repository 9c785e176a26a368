//! # Nodal HTTP
//!
//! The ambient request object handed to node routes, and extraction of the
//! framework-native handler parameters (query, path, headers).

pub mod params;
pub mod request;

pub use params::{FromRequest, HeaderStruct, ParamError, ParamResult, Path, Query};
pub use request::{Request, RequestBuilder, RequestError};

// Re-export the HTTP types the request is made of
pub use bytes::Bytes;
pub use hyper::{HeaderMap, Method, Uri, Version};
