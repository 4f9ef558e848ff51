//! HTTP endpoints Slack posts Events API and interactivity requests to.
//!
//! Both handlers read the raw body first so the signature is checked against the exact bytes
//! Slack signed. Unsigned or stale requests get `401`, undecodable ones `400`.
//!
//! Event callbacks are acknowledged before they are handled: Slack retries deliveries that are
//! not answered within three seconds, and rendering a home tab takes an API round trip. Retried
//! deliveries (`X-Slack-Retry-Num`) are acknowledged and dropped since the first one is already
//! being handled.

// crates.io
use axum::{
	Json, Router,
	body::Bytes,
	extract::State,
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::post,
};
// self
use crate::{
	_prelude::*,
	http::HttpTransport,
	slack::{
		EventEnvelope, EventReply, Interaction, InteractionReply, SlackApi, SlackBot, SlackError,
		signature::{SIGNATURE_HEADER, SignatureVerifier, TIMESTAMP_HEADER},
	},
};

/// Path of the Events API request URL.
pub const EVENTS_PATH: &str = "/slack/events";
/// Path of the interactivity request URL.
pub const INTERACTIONS_PATH: &str = "/slack/interactions";
/// Header Slack adds to redelivered events.
pub const RETRY_HEADER: &str = "x-slack-retry-num";

struct ServerState<T, S>
where
	T: ?Sized + HttpTransport,
	S: ?Sized + SlackApi,
{
	bot: Arc<SlackBot<T, S>>,
	verifier: SignatureVerifier,
}

#[derive(Serialize)]
struct ChallengeBody {
	challenge: String,
}

#[derive(Serialize)]
struct ErrorsBody {
	response_action: &'static str,
	errors: BTreeMap<String, String>,
}

/// Builds the router serving both Slack endpoints.
pub fn router<T, S>(bot: Arc<SlackBot<T, S>>, verifier: SignatureVerifier) -> Router
where
	T: ?Sized + HttpTransport,
	S: ?Sized + SlackApi,
{
	Router::new()
		.route(EVENTS_PATH, post(events::<T, S>))
		.route(INTERACTIONS_PATH, post(interactions::<T, S>))
		.with_state(Arc::new(ServerState { bot, verifier }))
}

/// Serves the Slack endpoints on `bind_address` until Ctrl-C.
pub async fn serve<T, S>(
	bind_address: &str,
	bot: Arc<SlackBot<T, S>>,
	verifier: SignatureVerifier,
) -> std::io::Result<()>
where
	T: ?Sized + HttpTransport,
	S: ?Sized + SlackApi,
{
	let listener = tokio::net::TcpListener::bind(bind_address).await?;

	tracing::info!(address = %listener.local_addr()?, "Slack endpoints listening");

	axum::serve(listener, router(bot, verifier)).with_graceful_shutdown(shutdown_signal()).await
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "failed to listen for Ctrl-C");
	}

	tracing::info!("shutting down Slack endpoints");
}

async fn events<T, S>(
	State(state): State<Arc<ServerState<T, S>>>,
	headers: HeaderMap,
	body: Bytes,
) -> Response
where
	T: ?Sized + HttpTransport,
	S: ?Sized + SlackApi,
{
	if let Err(response) = verify(&state.verifier, &headers, &body) {
		return response;
	}

	let envelope = match serde_json::from_slice::<EventEnvelope>(&body) {
		Ok(envelope) => envelope,
		Err(err) => {
			tracing::warn!(error = %err, "undecodable Events API body");

			return StatusCode::BAD_REQUEST.into_response();
		},
	};

	if matches!(envelope, EventEnvelope::UrlVerification { .. }) {
		return match state.bot.handle_event(envelope).await {
			Ok(EventReply::Challenge(challenge)) =>
				Json(ChallengeBody { challenge }).into_response(),
			Ok(EventReply::Ack) => StatusCode::OK.into_response(),
			Err(err) => failure(err),
		};
	}
	if let Some(attempt) = headers.get(RETRY_HEADER) {
		tracing::debug!(?attempt, "ignoring redelivered Slack event");

		return StatusCode::OK.into_response();
	}

	tokio::spawn(async move {
		if let Err(err) = state.bot.handle_event(envelope).await {
			tracing::error!(error = %err, "Slack event handling failed");
		}
	});

	StatusCode::OK.into_response()
}

async fn interactions<T, S>(
	State(state): State<Arc<ServerState<T, S>>>,
	headers: HeaderMap,
	body: Bytes,
) -> Response
where
	T: ?Sized + HttpTransport,
	S: ?Sized + SlackApi,
{
	if let Err(response) = verify(&state.verifier, &headers, &body) {
		return response;
	}

	let Some(payload) = url::form_urlencoded::parse(&body)
		.find(|(key, _)| key == "payload")
		.map(|(_, value)| value.into_owned())
	else {
		tracing::warn!("interaction body has no payload field");

		return StatusCode::BAD_REQUEST.into_response();
	};
	let result = match Interaction::from_json(&payload) {
		Ok(interaction) => state.bot.handle_interaction(interaction).await,
		Err(err) => Err(err),
	};

	match result {
		Ok(InteractionReply::Errors { errors }) =>
			Json(ErrorsBody { response_action: "errors", errors }).into_response(),
		Ok(InteractionReply::Ack) => StatusCode::OK.into_response(),
		Err(err) => failure(err),
	}
}

fn verify(verifier: &SignatureVerifier, headers: &HeaderMap, body: &[u8]) -> Result<(), Response> {
	let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

	verifier
		.verify(header(TIMESTAMP_HEADER), header(SIGNATURE_HEADER), body, OffsetDateTime::now_utc())
		.map_err(|err| {
			tracing::warn!(error = %err, "rejected unsigned Slack request");

			(StatusCode::UNAUTHORIZED, err.to_string()).into_response()
		})
}

fn failure(err: SlackError) -> Response {
	if err.is_bad_request() {
		tracing::warn!(error = %err, "rejected Slack payload");

		return StatusCode::BAD_REQUEST.into_response();
	}

	tracing::error!(error = %err, "Slack request failed");

	StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use axum::body;
	// self
	use super::*;
	use crate::{
		_preludet::build_reqwest_test_client,
		auth::{SlackUserId, TokenSecret},
		http::ReqwestTransport,
		slack::{SlackFuture, blocks::View},
	};

	const HOME_OPENED: &[u8] =
		br#"{"type":"event_callback","event":{"type":"app_home_opened","user":"U024BE7LH","tab":"home"}}"#;

	#[derive(Default)]
	struct CountingSlack {
		published: AtomicUsize,
	}
	impl SlackApi for CountingSlack {
		fn open_view<'a>(&'a self, _: &'a str, _: &'a View) -> SlackFuture<'a, ()> {
			Box::pin(async { Ok(()) })
		}

		fn publish_view<'a>(&'a self, _: &'a SlackUserId, _: &'a View) -> SlackFuture<'a, ()> {
			Box::pin(async move {
				self.published.fetch_add(1, Ordering::SeqCst);

				Ok(())
			})
		}
	}

	type TestState = ServerState<ReqwestTransport, CountingSlack>;

	// The client has no session, so home tabs render an error without any network call.
	fn state() -> Arc<TestState> {
		let (client, _) = build_reqwest_test_client("http://127.0.0.1:9/api/");

		Arc::new(ServerState {
			bot: Arc::new(SlackBot::new(client, CountingSlack::default())),
			verifier: SignatureVerifier::new(TokenSecret::new("signing-secret")),
		})
	}

	fn published(state: &TestState) -> usize {
		state.bot.slack().published.load(Ordering::SeqCst)
	}

	fn signed_headers(verifier: &SignatureVerifier, body: &[u8]) -> HeaderMap {
		let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
		let signature = verifier.sign(&timestamp, body).expect("Signing should succeed.");
		let mut headers = HeaderMap::new();

		headers.insert(TIMESTAMP_HEADER, timestamp.parse().expect("Timestamp is a valid header."));
		headers.insert(SIGNATURE_HEADER, signature.parse().expect("Signature is a valid header."));

		headers
	}

	#[tokio::test]
	async fn url_verification_echoes_the_challenge() {
		let state = state();
		let body = Bytes::from_static(br#"{"type":"url_verification","challenge":"c-123"}"#);
		let headers = signed_headers(&state.verifier, &body);
		let response = events(State(state), headers, body).await;

		assert_eq!(response.status(), StatusCode::OK);

		let bytes = body::to_bytes(response.into_body(), usize::MAX)
			.await
			.expect("Response body should be readable.");

		assert_eq!(&bytes[..], br#"{"challenge":"c-123"}"#);
	}

	#[tokio::test]
	async fn unsigned_and_malformed_requests_are_rejected() {
		let state = state();
		let body = Bytes::from_static(br#"{"type":"url_verification","challenge":"c-123"}"#);
		let response = events(State(state.clone()), HeaderMap::new(), body).await;

		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

		let body = Bytes::from_static(b"payload=%7Bnot-json");
		let headers = signed_headers(&state.verifier, &body);
		let response = interactions(State(state.clone()), headers, body).await;

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);

		let body = Bytes::from_static(b"nothing=here");
		let headers = signed_headers(&state.verifier, &body);
		let response = interactions(State(state), headers, body).await;

		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn events_are_acknowledged_before_handling_and_retries_are_dropped() {
		let state = state();
		let body = Bytes::from_static(HOME_OPENED);
		let mut headers = signed_headers(&state.verifier, &body);

		headers.insert(RETRY_HEADER, "1".parse().expect("Retry count is a valid header."));

		let response = events(State(state.clone()), headers, body.clone()).await;

		assert_eq!(response.status(), StatusCode::OK);

		tokio::time::sleep(std::time::Duration::from_millis(50)).await;

		assert_eq!(published(&state), 0, "Redelivered events must not publish again.");

		let headers = signed_headers(&state.verifier, &body);
		let response = events(State(state.clone()), headers, body).await;

		assert_eq!(response.status(), StatusCode::OK);

		let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);

		while published(&state) == 0 {
			assert!(tokio::time::Instant::now() < deadline, "The home tab was never published.");

			tokio::time::sleep(std::time::Duration::from_millis(10)).await;
		}

		assert_eq!(published(&state), 1);
	}

	#[tokio::test]
	async fn unsupported_interactions_are_acknowledged() {
		let state = state();
		let body = Bytes::from_static(b"payload=%7B%22type%22%3A%22shortcut%22%7D");
		let headers = signed_headers(&state.verifier, &body);
		let response = interactions(State(state), headers, body).await;

		assert_eq!(response.status(), StatusCode::OK);
	}
}
