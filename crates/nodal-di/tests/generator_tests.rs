//! Tests for generator-style compositions (generator feature)

#![cfg(feature = "generator")]

use nodal_di::{Agent, Composition, Dep, DiError, Node, NodeDescriptor, NodeResult, Provided, Scope};
use parking_lot::Mutex;
use rstest::*;
use std::sync::Arc;

#[derive(Default)]
struct Log(Mutex<Vec<&'static str>>);

impl Log {
	fn push(&self, event: &'static str) {
		self.0.lock().push(event);
	}

	fn snapshot(&self) -> Vec<&'static str> {
		self.0.lock().clone()
	}
}

struct Connection;
struct Transaction;
struct Exhausted;

#[async_trait::async_trait]
impl Node for Connection {
	type Output = String;
	type Deps = (Provided<Log>,);

	async fn compose((log,): Self::Deps) -> NodeResult<Composition<String>> {
		Composition::generator(move |co| async move {
			log.push("connect");
			co.yield_("conn".to_string()).await;
			log.push("disconnect");
			Ok(())
		})
		.await
	}
}

#[async_trait::async_trait]
impl Node for Transaction {
	type Output = String;
	type Deps = (Dep<Connection>, Provided<Log>);

	async fn compose((conn, log): Self::Deps) -> NodeResult<Composition<String>> {
		let name = format!("{}/tx", *conn);
		Composition::generator(move |co| async move {
			log.push("begin");
			co.yield_(name).await;
			log.push("commit");
			Ok(())
		})
		.await
	}
}

#[async_trait::async_trait]
impl Node for Exhausted {
	type Output = u8;
	type Deps = ();

	async fn compose(_deps: ()) -> NodeResult<Composition<u8>> {
		Composition::generator(|_co| async move { Ok(()) }).await
	}
}

#[rstest]
#[tokio::test]
async fn test_generator_cleanup_runs_after_use_in_reverse_order() {
	// Arrange
	let scope = Arc::new(Scope::new("req:1"));
	scope.push(Log::default()).unwrap();
	let agent = Agent::build([NodeDescriptor::of::<Transaction>()]).unwrap();
	let guard = scope.enter().unwrap();

	// Act
	agent.run(&scope).await.unwrap();
	let value = scope.retrieve_node::<Transaction>().unwrap();
	let before_exit = scope.retrieve::<Log>().unwrap().snapshot();
	guard.exit().await.unwrap();

	// Assert
	assert_eq!(value.as_str(), "conn/tx");
	assert_eq!(before_exit, vec!["connect", "begin"]);
	assert_eq!(
		scope.retrieve::<Log>().unwrap().snapshot(),
		vec!["connect", "begin", "commit", "disconnect"]
	);
}

#[rstest]
#[tokio::test]
async fn test_generator_without_yield_fails_composition() {
	// Arrange
	let scope = Scope::new("req:1");
	let agent = Agent::build([NodeDescriptor::of::<Exhausted>()]).unwrap();

	// Act
	let result = agent.run(&scope).await;

	// Assert
	assert!(matches!(result, Err(DiError::GeneratorExhausted)));
}
