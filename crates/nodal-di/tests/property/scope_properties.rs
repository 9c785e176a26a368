//! Property-based tests for scopes
//!
//! Uses proptest to verify invariants of scope chains:
//! 1. Lookup precedence - the nearest scope holding a key wins
//! 2. Isolation - a parent never observes values pushed into a child
//! 3. Release ordering - cleanups run in exact reverse registration order
//! 4. Cleanup completeness - every cleanup runs even when some fail

use nodal_di::{BoxError, DiError, Scope};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
	tokio::runtime::Builder::new_current_thread()
		.build()
		.unwrap()
		.block_on(future)
}

// Property 1: Lookup precedence
proptest! {
	#[test]
	fn prop_nearest_scope_wins(shared in proptest::option::of(any::<u32>()), local in proptest::option::of(any::<u32>())) {
		let parent = Arc::new(Scope::new("app"));
		if let Some(value) = shared {
			parent.push(value).unwrap();
		}
		let child = parent.create_child("req:1").unwrap();
		if let Some(value) = local {
			child.push(value).unwrap();
		}

		let seen = child.retrieve::<u32>().map(|v| *v);
		prop_assert_eq!(seen, local.or(shared));
	}
}

// Property 2: Isolation
proptest! {
	#[test]
	fn prop_parent_never_sees_child_values(values in proptest::collection::vec(any::<i64>(), 1..8)) {
		let parent = Arc::new(Scope::new("app"));
		for (n, value) in values.iter().enumerate() {
			let child = parent.create_child(format!("req:{n}")).unwrap();
			child.push(*value).unwrap();
			prop_assert_eq!(child.retrieve::<i64>().map(|v| *v), Some(*value));
		}
		prop_assert!(parent.retrieve::<i64>().is_none());
		prop_assert!(parent.is_empty());
	}
}

// Properties 3 and 4: Release ordering and completeness
proptest! {
	#[test]
	fn prop_cleanups_run_in_reverse_order(failures in proptest::collection::vec(any::<bool>(), 0..16)) {
		let scope = Scope::new("req:1");
		let order = Arc::new(Mutex::new(Vec::new()));
		for (index, fail) in failures.iter().copied().enumerate() {
			let order = order.clone();
			scope
				.defer("step", move || async move {
					order.lock().push(index);
					if fail {
						Err::<(), BoxError>(format!("step {index} failed").into())
					} else {
						Ok(())
					}
				})
				.unwrap();
		}

		let outcome = block_on(scope.dispose());

		let expected: Vec<usize> = (0..failures.len()).rev().collect();
		prop_assert_eq!(order.lock().clone(), expected);
		let failed = failures.iter().filter(|f| **f).count();
		match outcome {
			Ok(()) => prop_assert_eq!(failed, 0),
			Err(DiError::Cleanup(errors)) => prop_assert_eq!(errors.len(), failed),
			Err(other) => prop_assert!(false, "unexpected error: {}", other),
		}
		prop_assert_eq!(scope.pending_cleanups(), 0);
	}
}
