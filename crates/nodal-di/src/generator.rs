//! Generator-style resource compositions
//!
//! A generator composition acquires a resource, yields it exactly once, and
//! keeps running after the yield when the owning scope is disposed. The code
//! after the yield is the release action.
//!
//! # Note
//!
//! Rust's native async generators (with `yield` keyword) are not yet stable.
//! This module uses the `genawaiter` crate to provide the single-yield form on
//! stable Rust.
//!
//! # Examples
//!
//! ```
//! use nodal_di::{Composition, Node, NodeResult};
//!
//! struct Connection;
//!
//! #[async_trait::async_trait]
//! impl Node for Connection {
//!     type Output = String;
//!     type Deps = ();
//!
//!     async fn compose(_: ()) -> NodeResult<Composition<String>> {
//!         Composition::generator(|co| async move {
//!             co.yield_("conn-1".to_string()).await;
//!             // close the connection here
//!             Ok(())
//!         })
//!         .await
//!     }
//! }
//! ```

use crate::error::{DiError, NodeResult};
use crate::node::Composition;
use genawaiter::GeneratorState;
use genawaiter::sync::{Co, Gen};
use std::future::Future;
use std::pin::Pin;

type Producer = Pin<Box<dyn Future<Output = NodeResult<()>> + Send + 'static>>;

impl<T: Send + 'static> Composition<T> {
	/// Run `producer` up to its first yield and use the yielded value.
	///
	/// The remainder of the producer runs as the release action. A producer
	/// that completes without yielding fails with
	/// [`DiError::GeneratorExhausted`] (or with its own error, if it returned
	/// one); a producer that yields again during release fails the release
	/// with [`DiError::MultipleYields`].
	pub async fn generator<P, Fut>(producer: P) -> NodeResult<Self>
	where
		P: FnOnce(Co<T>) -> Fut + Send + 'static,
		Fut: Future<Output = NodeResult<()>> + Send + 'static,
	{
		let mut generator: Gen<T, (), Producer> =
			Gen::new(move |co| Box::pin(producer(co)) as Producer);

		let first = generator.async_resume().await;
		match first {
			GeneratorState::Yielded(value) => Ok(Composition::resource(value, move || async move {
				match generator.async_resume().await {
					GeneratorState::Complete(outcome) => outcome,
					GeneratorState::Yielded(_) => Err(DiError::MultipleYields.into()),
				}
			})),
			GeneratorState::Complete(outcome) => {
				outcome?;
				Err(DiError::GeneratorExhausted.into())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::BoxError;
	use rstest::rstest;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicBool, Ordering};

	#[rstest]
	#[tokio::test]
	async fn test_yielded_value_and_deferred_cleanup() {
		// Arrange
		let closed = Arc::new(AtomicBool::new(false));
		let flag = closed.clone();

		// Act
		let composition = Composition::generator(move |co| async move {
			co.yield_(42u32).await;
			flag.store(true, Ordering::SeqCst);
			Ok(())
		})
		.await
		.unwrap();
		let (value, release) = composition.into_parts();

		// Assert
		assert_eq!(value, 42);
		assert!(!closed.load(Ordering::SeqCst));
		release.unwrap()().await.unwrap();
		assert!(closed.load(Ordering::SeqCst));
	}

	#[rstest]
	#[tokio::test]
	async fn test_generator_without_yield_is_exhausted() {
		// Act
		let result = Composition::<u32>::generator(|_co| async move { Ok(()) }).await;

		// Assert
		let error = result.unwrap_err();
		assert!(matches!(
			error.downcast_ref::<DiError>(),
			Some(DiError::GeneratorExhausted)
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_generator_error_before_yield_is_propagated() {
		// Act
		let result = Composition::<u32>::generator(|_co| async move {
			Err::<(), BoxError>("connect refused".into())
		})
		.await;

		// Assert
		assert_eq!(result.unwrap_err().to_string(), "connect refused");
	}

	#[rstest]
	#[tokio::test]
	async fn test_second_yield_fails_release() {
		// Arrange
		let composition = Composition::generator(|co| async move {
			co.yield_(1u8).await;
			co.yield_(2u8).await;
			Ok(())
		})
		.await
		.unwrap();

		// Act
		let (_, release) = composition.into_parts();
		let outcome = release.unwrap()().await;

		// Assert
		let error = outcome.unwrap_err();
		assert!(matches!(
			error.downcast_ref::<DiError>(),
			Some(DiError::MultipleYields)
		));
	}
}
