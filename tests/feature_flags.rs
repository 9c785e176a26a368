//! Per-user feature flags resolved from a service held in the shared scope.

use nodal::prelude::*;
use rstest::*;
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
struct User {
	id: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Flags {
	new_ui: bool,
	dark_mode: bool,
}

/// Rollout percentage per flag
struct FlagService {
	rollout: HashMap<&'static str, f64>,
}

impl FlagService {
	fn new() -> Self {
		Self {
			rollout: HashMap::from([("new_ui", 0.5), ("dark_mode", 1.0)]),
		}
	}

	fn enabled(&self, user: &User, flag: &str) -> bool {
		let pct = self.rollout.get(flag).copied().unwrap_or(0.0);
		bucket(&format!("{}:{}", user.id, flag)) < pct
	}

	fn flags_for(&self, user: &User) -> Flags {
		Flags {
			new_ui: self.enabled(user, "new_ui"),
			dark_mode: self.enabled(user, "dark_mode"),
		}
	}
}

/// Stable position of `key` in [0, 1), FNV-1a
fn bucket(key: &str) -> f64 {
	let hash = key.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
		(hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
	});
	f64::from(hash) / (f64::from(u32::MAX) + 1.0)
}

struct CurrentUser;

#[async_trait]
impl Node for CurrentUser {
	type Output = User;
	type Deps = (Provided<Request>,);

	async fn compose((request,): Self::Deps) -> NodeResult<Composition<User>> {
		let id = request.header("x-user").unwrap_or("anon").to_string();
		tracing::debug!(user = %id, "resolved current user");
		Ok(User { id }.into())
	}
}

struct UserFlags;

#[async_trait]
impl Node for UserFlags {
	type Output = Flags;
	type Deps = (Dep<CurrentUser>, Provided<FlagService>);

	async fn compose((user, service): Self::Deps) -> NodeResult<Composition<Flags>> {
		Ok(service.flags_for(&user).into())
	}
}

async fn config(
	(): (),
	(user, flags): (Dep<CurrentUser>, Dep<UserFlags>),
) -> Result<(String, Flags), DiError> {
	Ok((user.id.clone(), *flags))
}

#[fixture]
fn app_scope() -> SharedScope {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
	let scope = create_scope("flags");
	scope.set(FlagService::new()).unwrap();
	scope
}

fn as_user(user: Option<&str>) -> Request {
	let mut builder = Request::builder().uri("/config");
	if let Some(user) = user {
		builder = builder.header("x-user", user);
	}
	builder.build().unwrap()
}

#[rstest]
#[case::alice(Some("alice"), "alice")]
#[case::bob(Some("bob"), "bob")]
#[case::anonymous(None, "anon")]
#[tokio::test]
async fn test_flags_follow_rollout(
	app_scope: SharedScope,
	#[case] header: Option<&str>,
	#[case] expected_user: &str,
) {
	// Arrange
	let route = node_route_with_scope(config, &app_scope).unwrap();
	let service = FlagService::new();
	let expected = service.flags_for(&User {
		id: expected_user.to_string(),
	});

	// Act
	let (user, flags) = route.call((), as_user(header)).await.unwrap();

	// Assert
	assert_eq!(user, expected_user);
	assert_eq!(flags, expected);
	assert!(flags.dark_mode);
}

#[rstest]
#[tokio::test]
async fn test_flags_are_stable_across_requests(app_scope: SharedScope) {
	// Arrange
	let route = node_route_with_scope(config, &app_scope).unwrap();

	// Act
	let first = route.call((), as_user(Some("carol"))).await.unwrap();
	let second = route.call((), as_user(Some("carol"))).await.unwrap();

	// Assert
	assert_eq!(first, second);
	assert_eq!(route.requests_served(), 2);
}

#[rstest]
fn test_bucket_is_in_unit_interval() {
	for key in ["", "a", "alice:new_ui", "bob:dark_mode"] {
		let value = bucket(key);
		assert!((0.0..1.0).contains(&value), "{key} -> {value}");
	}
}

#[rstest]
#[tokio::test]
async fn test_missing_service_is_reported(#[values(Evaluation::Concurrent, Evaluation::Sequential)] evaluation: Evaluation) {
	// Arrange
	let route = NodeRoute::new(config)
		.with_settings(DiSettings::default().with_evaluation(evaluation))
		.build()
		.unwrap();

	// Act
	let error = route.call((), as_user(Some("alice"))).await.unwrap_err();

	// Assert
	assert!(matches!(error, DiError::NotFound(ref name) if name.ends_with("FlagService")));
}

#[cfg(feature = "dev-tools")]
#[rstest]
fn test_graph_statistics() {
	let route = node_route(config).unwrap();

	let stats = route.agent().unwrap().graph().statistics();

	assert_eq!(stats.node_count, 2);
	assert_eq!(stats.requested_count, 2);
	assert!(route.agent().unwrap().graph().to_dot().contains("CurrentUser"));
}
