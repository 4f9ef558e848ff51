// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use grocery_admin::{
	_preludet::*,
	api::{Product, Unit},
	auth::SessionEvent,
	store::MemoryStore,
};

// Keeps the refresh in flight until every concurrent 401 has been received.
const REFRESH_DELAY: std::time::Duration = std::time::Duration::from_millis(300);
const UNITS: &str = r#"[{"id":1,"name":"Litre"},{"id":2,"name":"Piece"}]"#;

fn stored_tokens(store: &MemoryStore) -> Option<(String, Option<String>)> {
	store.snapshot().map(|session| {
		(
			session.tokens.access_token.expose().to_owned(),
			session.tokens.refresh_token.as_ref().map(|token| token.expose().to_owned()),
		)
	})
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.url("/api/"));

	seed_session(&client, "access-stale", "refresh-1").await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units").header("authorization", "Bearer access-stale");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"detail":"Token is expired"}"#);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units").header("authorization", "Bearer access-fresh");
			then.status(200).header("content-type", "application/json").body(UNITS);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/refresh")
				.json_body(json!({ "refresh_token": "refresh-1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access":"access-fresh","refresh":"refresh-2"}"#)
				.delay(REFRESH_DELAY);
		})
		.await;
	let (a, b, c, d) = tokio::join!(
		client.list_all::<Unit>(),
		client.list_all::<Unit>(),
		client.list_all::<Unit>(),
		client.list_all::<Unit>(),
	);

	for result in [a, b, c, d] {
		let units = result.expect("Every concurrent request should succeed after the refresh.");

		assert_eq!(units.len(), 2);
	}

	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(4).await;
	rejected.assert_calls_async(4).await;

	assert_eq!(client.refresh_metrics().attempts(), 1);
	assert_eq!(client.refresh_metrics().replays(), 4);
	assert_eq!(
		stored_tokens(&store),
		Some(("access-fresh".into(), Some("refresh-2".into()))),
		"Rotated tokens must be persisted."
	);
}

#[tokio::test]
async fn failed_refresh_logs_out_and_broadcasts_the_loss() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.url("/api/"));

	seed_session(&client, "access-stale", "refresh-revoked").await;

	let mut events = client.session().subscribe();

	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units");
			then.status(401);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"detail":"Token is blacklisted"}"#)
				.delay(REFRESH_DELAY);
		})
		.await;
	let (first, second) = tokio::join!(client.list_all::<Unit>(), client.list_all::<Unit>());

	for result in [first, second] {
		match result {
			Err(Error::AuthenticationLost { reason }) =>
				assert!(reason.contains("Token is blacklisted"), "Unexpected reason: {reason}"),
			other => panic!("Expected the session to be lost, got {other:?}."),
		}
	}

	refresh.assert_calls_async(1).await;

	assert!(!client.session().is_authenticated());
	assert!(store.snapshot().is_none(), "The persisted session must be cleared.");

	let lost = loop {
		match events.recv().await.expect("Session events should be delivered.") {
			SessionEvent::AuthenticationLost { reason } => break reason,
			_ => continue,
		}
	};

	assert!(lost.contains("Token is blacklisted"));
	assert!(matches!(client.list_all::<Unit>().await, Err(Error::Unauthorized)));
}

#[tokio::test]
async fn replayed_request_rejected_again_is_unauthorized() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(&server.url("/api/"));

	seed_session(&client, "access-stale", "refresh-1").await;

	let units = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"access-fresh"}"#);
		})
		.await;
	let err = client.list_all::<Unit>().await.expect_err("A second 401 must not be retried.");

	assert!(matches!(err, Error::Unauthorized));

	units.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;

	let tokens = client.session().tokens().expect("The refreshed session should remain.");

	assert_eq!(tokens.access_token.expose(), "access-fresh");
	assert_eq!(
		tokens.refresh_token.as_ref().map(|token| token.expose()),
		Some("refresh-1"),
		"A grant without a refresh token keeps the previous one."
	);
}

#[tokio::test]
async fn expired_jwt_is_refreshed_before_sending() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(&server.url("/api/"));
	let expired = fake_jwt("admin", OffsetDateTime::now_utc() - Duration::minutes(1));
	let fresh = fake_jwt("admin", OffsetDateTime::now_utc() + Duration::hours(1));

	seed_session(&client, &expired, "refresh-1").await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(format!(r#"{{"access_token":"{fresh}","refresh_token":"refresh-2"}}"#));
		})
		.await;
	let units = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units").header("authorization", format!("Bearer {fresh}"));
			then.status(200).header("content-type", "application/json").body(UNITS);
		})
		.await;

	client.list_all::<Unit>().await.expect("The request should use the refreshed token.");

	refresh.assert_calls_async(1).await;
	units.assert_calls_async(1).await;

	assert_eq!(client.refresh_metrics().replays(), 0, "No request should have been rejected.");
}

#[tokio::test]
async fn requests_without_a_session_are_not_sent() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(&server.url("/api/"));
	let units = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units");
			then.status(200).header("content-type", "application/json").body(UNITS);
		})
		.await;

	assert!(matches!(client.list_all::<Unit>().await, Err(Error::Unauthorized)));

	units.assert_calls_async(0).await;
}

#[tokio::test]
async fn preemptively_refreshed_request_is_not_refreshed_again() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(&server.url("/api/"));
	let expired = fake_jwt("admin", OffsetDateTime::now_utc() - Duration::minutes(1));

	seed_session(&client, &expired, "refresh-1").await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"access-fresh","refresh_token":"refresh-2"}"#);
		})
		.await;
	let units = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units");
			then.status(401);
		})
		.await;
	let err = client.list_all::<Unit>().await.expect_err("A rejected fresh token must fail.");

	assert!(matches!(err, Error::Unauthorized));

	refresh.assert_calls_async(1).await;
	units.assert_calls_async(1).await;

	assert_eq!(client.refresh_metrics().attempts(), 1);
}

#[tokio::test]
async fn late_unauthorized_response_reuses_the_refreshed_token() {
	let server = MockServer::start_async().await;
	let (client, _) = build_reqwest_test_client(&server.url("/api/"));

	seed_session(&client, "access-stale", "refresh-1").await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units").header("authorization", "Bearer access-stale");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/units").header("authorization", "Bearer access-fresh");
			then.status(200).header("content-type", "application/json").body(UNITS);
		})
		.await;

	// Answered only after the units request has finished refreshing.
	let late = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/products").header("authorization", "Bearer access-stale");
			then.status(401).delay(REFRESH_DELAY * 2);
		})
		.await;
	let replayed = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/products").header("authorization", "Bearer access-fresh");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access":"access-fresh","refresh":"refresh-2"}"#);
		})
		.await;
	let (units, products) = tokio::join!(client.list_all::<Unit>(), client.list_all::<Product>());

	assert_eq!(units.expect("Units should load after the refresh.").len(), 2);
	assert!(products.expect("Products should load with the current token.").is_empty());

	refresh.assert_calls_async(1).await;
	late.assert_calls_async(1).await;
	replayed.assert_calls_async(1).await;

	assert_eq!(client.refresh_metrics().attempts(), 1);
	assert_eq!(client.refresh_metrics().queued(), 0, "The late request must not wait on a refresh.");
	assert_eq!(client.refresh_metrics().replays(), 2);
}
