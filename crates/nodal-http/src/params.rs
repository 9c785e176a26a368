//! Framework-native parameter extraction
//!
//! These are the handler parameters that come straight from the request
//! rather than from the node graph: query strings, path segments and headers.

use crate::request::Request;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::ops::Deref;
use std::str::FromStr;

/// Errors raised while binding native parameters
#[derive(Debug, thiserror::Error)]
pub enum ParamError {
	#[error("Missing parameter: {0}")]
	MissingParameter(String),

	#[error("Ambiguous path parameter: route has {0} path parameters, expected exactly one")]
	AmbiguousPath(usize),

	#[error("Failed to parse parameter `{name}`: {source}")]
	ParseError {
		name: String,
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},
}

pub type ParamResult<T> = Result<T, ParamError>;

/// Trait for types that can be extracted from a request
#[async_trait]
pub trait FromRequest: Sized + Send {
	async fn from_request(req: &Request) -> ParamResult<Self>;
}

#[async_trait]
impl FromRequest for () {
	async fn from_request(_req: &Request) -> ParamResult<Self> {
		Ok(())
	}
}

macro_rules! impl_from_request_tuple {
	($($ty:ident),+) => {
		#[async_trait]
		impl<$($ty: FromRequest),+> FromRequest for ($($ty,)+) {
			async fn from_request(req: &Request) -> ParamResult<Self> {
				Ok(($($ty::from_request(req).await?,)+))
			}
		}
	};
}

impl_from_request_tuple!(A);
impl_from_request_tuple!(A, B);
impl_from_request_tuple!(A, B, C);
impl_from_request_tuple!(A, B, C, D);

macro_rules! wrapper {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		pub struct $name<T>(pub T);

		impl<T> $name<T> {
			pub fn into_inner(self) -> T {
				self.0
			}
		}

		impl<T> Deref for $name<T> {
			type Target = T;
			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}

		impl<T: Debug> Debug for $name<T> {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				self.0.fmt(f)
			}
		}
	};
}

wrapper! {
	/// Query string deserialized into `T`
	///
	/// # Examples
	///
	/// ```
	/// use nodal_http::{FromRequest, Query, Request};
	/// use serde::Deserialize;
	///
	/// #[derive(Deserialize)]
	/// struct Page {
	///     limit: u32,
	///     cursor: Option<String>,
	/// }
	///
	/// # tokio_test::block_on(async {
	/// let request = Request::builder().uri("/items?limit=5").build().unwrap();
	/// let page = Query::<Page>::from_request(&request).await.unwrap();
	/// assert_eq!(page.limit, 5);
	/// assert!(page.cursor.is_none());
	/// # });
	/// ```
	Query
}

wrapper! {
	/// The single path parameter of a route, parsed with [`FromStr`]
	Path
}

wrapper! {
	/// HeaderStruct extracts multiple headers into a struct
	///
	/// Header names are lower-cased before deserialization.
	HeaderStruct
}

#[async_trait]
impl<T> FromRequest for Query<T>
where
	T: DeserializeOwned + Send,
{
	async fn from_request(req: &Request) -> ParamResult<Self> {
		let query = req.uri.query().unwrap_or("");
		serde_urlencoded::from_str(query)
			.map(Query)
			.map_err(|e| ParamError::ParseError {
				name: "query".to_string(),
				source: Box::new(e),
			})
	}
}

#[async_trait]
impl<T> FromRequest for Path<T>
where
	T: FromStr + Send,
	T::Err: std::error::Error + Send + Sync + 'static,
{
	async fn from_request(req: &Request) -> ParamResult<Self> {
		let mut values = req.path_params.iter();
		let (name, raw) = match (values.next(), values.next()) {
			(Some(only), None) => only,
			(None, _) => return Err(ParamError::MissingParameter("path".to_string())),
			(Some(_), Some(_)) => return Err(ParamError::AmbiguousPath(req.path_params.len())),
		};
		raw.parse::<T>().map(Path).map_err(|e| ParamError::ParseError {
			name: name.clone(),
			source: Box::new(e),
		})
	}
}

/// Convert headers to a map for deserialization
/// Header names are converted to lowercase
fn headers_to_map(req: &Request) -> HashMap<String, String> {
	let mut result = HashMap::new();

	for (name, value) in req.headers.iter() {
		if let Ok(value_str) = value.to_str() {
			result.insert(name.as_str().to_lowercase(), value_str.to_string());
		}
	}

	result
}

#[async_trait]
impl<T> FromRequest for HeaderStruct<T>
where
	T: DeserializeOwned + Send,
{
	async fn from_request(req: &Request) -> ParamResult<Self> {
		let headers_map = headers_to_map(req);

		// Round-trip through serde_urlencoded so "123" coerces into numeric fields
		let encoded =
			serde_urlencoded::to_string(&headers_map).map_err(|e| ParamError::ParseError {
				name: "headers".to_string(),
				source: Box::new(e),
			})?;

		serde_urlencoded::from_str(&encoded)
			.map(HeaderStruct)
			.map_err(|e| ParamError::ParseError {
				name: "headers".to_string(),
				source: Box::new(e),
			})
	}
}
