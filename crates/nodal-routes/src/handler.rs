//! Route handler abstraction
//!
//! A node route handler takes two arguments: the framework-native parameters
//! `P` and the node parameters `N`. Any `async fn(P, N) -> R` (or closure
//! returning a future) is a handler; synchronous functions are adapted with
//! [`sync_handler`].

use futures::future::BoxFuture;
use std::future::Future;

/// A callable route handler.
pub trait NodeHandler<P, N>: Send + Sync + 'static {
	type Output: Send + 'static;

	fn call(&self, params: P, nodes: N) -> BoxFuture<'static, Self::Output>;
}

impl<F, Fut, P, N> NodeHandler<P, N> for F
where
	F: Fn(P, N) -> Fut + Send + Sync + 'static,
	Fut: Future + Send + 'static,
	Fut::Output: Send + 'static,
{
	type Output = Fut::Output;

	fn call(&self, params: P, nodes: N) -> BoxFuture<'static, Self::Output> {
		Box::pin(self(params, nodes))
	}
}

/// A synchronous function used as a route handler.
///
/// Created by [`sync_handler`].
#[derive(Debug, Clone, Copy)]
pub struct SyncHandler<F>(F);

/// Adapt a synchronous function into a [`NodeHandler`].
///
/// # Examples
///
/// ```
/// use nodal_routes::{NodeHandler, sync_handler};
///
/// let handler = sync_handler(|(): (), (): ()| Ok::<_, String>("pong"));
/// # tokio_test::block_on(async {
/// assert_eq!(handler.call((), ()).await, Ok("pong"));
/// # });
/// ```
pub fn sync_handler<F>(function: F) -> SyncHandler<F> {
	SyncHandler(function)
}

impl<F, P, N, R> NodeHandler<P, N> for SyncHandler<F>
where
	F: Fn(P, N) -> R + Send + Sync + 'static,
	R: Send + 'static,
{
	type Output = R;

	fn call(&self, params: P, nodes: N) -> BoxFuture<'static, R> {
		Box::pin(std::future::ready((self.0)(params, nodes)))
	}
}
