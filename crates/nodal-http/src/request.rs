//! The ambient request object
//!
//! [`Request`] is what a host hands to a route: method, URI, headers, body and
//! the path parameters its router extracted. Each request scope holds it under
//! its own type, so compositions read it with `Provided<Request>`.

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Uri, Version};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;

/// Errors raised while building a [`Request`]
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
	#[error("Invalid URI: {0}")]
	InvalidUri(String),
	#[error("Invalid header `{0}`")]
	InvalidHeader(String),
}

#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	/// Parameters extracted from the route pattern, e.g. `id` in `/users/{id}`
	pub path_params: HashMap<String, String>,
	/// Raw (still percent-encoded) query parameters
	pub query_params: HashMap<String, String>,
}

impl Request {
	/// Start building a request.
	///
	/// # Examples
	///
	/// ```
	/// use nodal_http::Request;
	/// use hyper::Method;
	///
	/// let request = Request::builder()
	///     .method(Method::POST)
	///     .uri("/items?limit=5")
	///     .header("x-user", "alice")
	///     .build()
	///     .unwrap();
	///
	/// assert_eq!(request.method, Method::POST);
	/// assert_eq!(request.path(), "/items");
	/// assert_eq!(request.header("x-user"), Some("alice"));
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// Parse query parameters from URI
	fn parse_query_params(uri: &Uri) -> HashMap<String, String> {
		uri.query()
			.map(|q| {
				q.split('&')
					.filter(|pair| !pair.is_empty())
					.filter_map(|pair| {
						// Split on first '=' only to preserve '=' in values (e.g., Base64)
						let mut parts = pair.splitn(2, '=');
						Some((
							parts.next()?.to_string(),
							parts.next().unwrap_or("").to_string(),
						))
					})
					.collect()
			})
			.unwrap_or_default()
	}

	pub fn path(&self) -> &str {
		self.uri.path()
	}

	/// Get URL-decoded query parameters
	///
	/// # Examples
	///
	/// ```
	/// use nodal_http::Request;
	///
	/// let request = Request::builder().uri("/search?name=John%20Doe").build().unwrap();
	///
	/// let decoded = request.decoded_query_params();
	/// assert_eq!(decoded.get("name"), Some(&"John Doe".to_string()));
	/// ```
	pub fn decoded_query_params(&self) -> HashMap<String, String> {
		self.query_params
			.iter()
			.map(|(k, v)| {
				let decoded_key = percent_decode_str(k).decode_utf8_lossy().to_string();
				let decoded_value = percent_decode_str(v).decode_utf8_lossy().to_string();
				(decoded_key, decoded_value)
			})
			.collect()
	}

	/// Header value as a string; `None` when absent or not valid UTF-8.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	pub fn path_param(&self, name: &str) -> Option<&str> {
		self.path_params.get(name).map(String::as_str)
	}

	/// Set a path parameter (used by routers for path variable extraction)
	pub fn set_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.path_params.insert(key.into(), value.into());
	}
}

/// Builder for [`Request`]
#[derive(Debug)]
pub struct RequestBuilder {
	method: Method,
	uri: String,
	version: Version,
	headers: HeaderMap,
	body: Bytes,
	path_params: HashMap<String, String>,
	invalid_header: Option<String>,
}

impl Default for RequestBuilder {
	fn default() -> Self {
		Self {
			method: Method::GET,
			uri: "/".to_string(),
			version: Version::HTTP_11,
			headers: HeaderMap::new(),
			body: Bytes::new(),
			path_params: HashMap::new(),
			invalid_header: None,
		}
	}
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	pub fn uri(mut self, uri: impl Into<String>) -> Self {
		self.uri = uri.into();
		self
	}

	pub fn version(mut self, version: Version) -> Self {
		self.version = version;
		self
	}

	/// Replace all headers.
	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	/// Append one header. An invalid name or value fails [`build`](Self::build).
	pub fn header(mut self, name: &str, value: &str) -> Self {
		match (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			(Ok(name), Ok(value)) => {
				self.headers.append(name, value);
			}
			_ => {
				self.invalid_header.get_or_insert_with(|| name.to_string());
			}
		}
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.path_params.insert(key.into(), value.into());
		self
	}

	pub fn build(self) -> Result<Request, RequestError> {
		if let Some(name) = self.invalid_header {
			return Err(RequestError::InvalidHeader(name));
		}
		let uri: Uri = self
			.uri
			.parse()
			.map_err(|_| RequestError::InvalidUri(self.uri.clone()))?;
		let query_params = Request::parse_query_params(&uri);

		Ok(Request {
			method: self.method,
			uri,
			version: self.version,
			headers: self.headers,
			body: self.body,
			path_params: self.path_params,
			query_params,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("/", 0)]
	#[case("/a?x=1", 1)]
	#[case("/a?x=1&y=&z", 3)]
	#[case("/a?token=YWJj==&&", 1)]
	fn test_query_param_parsing(#[case] uri: &str, #[case] expected: usize) {
		let request = Request::builder().uri(uri).build().unwrap();

		assert_eq!(request.query_params.len(), expected);
	}

	#[rstest]
	fn test_query_value_keeps_equals_signs() {
		let request = Request::builder().uri("/a?token=YWJj==").build().unwrap();

		assert_eq!(request.query_params.get("token").unwrap(), "YWJj==");
	}

	#[rstest]
	fn test_invalid_header_fails_build() {
		// Act
		let result = Request::builder().header("bad header", "x").build();

		// Assert
		assert!(matches!(result, Err(RequestError::InvalidHeader(ref name)) if name == "bad header"));
	}

	#[rstest]
	fn test_invalid_uri_fails_build() {
		let result = Request::builder().uri("http://[::1").build();

		assert!(matches!(result, Err(RequestError::InvalidUri(_))));
	}

	#[rstest]
	fn test_path_params() {
		// Arrange
		let mut request = Request::builder()
			.uri("/users/7")
			.path_param("id", "7")
			.build()
			.unwrap();

		// Act
		request.set_path_param("org", "acme");

		// Assert
		assert_eq!(request.path_param("id"), Some("7"));
		assert_eq!(request.path_param("org"), Some("acme"));
		assert_eq!(request.path_param("missing"), None);
	}
}
