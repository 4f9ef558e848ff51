//! Typed REST client for the grocery API.
//!
//! [`ApiClient`] owns the transport, the shared [`SessionManager`], and the
//! [`RefreshCoordinator`]. Every authenticated call goes through [`ApiClient::send`], which
//! attaches the current access token and recovers from a 401 by refreshing the credential
//! exactly once per request:
//!
//! - a token that is known to be expired (JWT `exp` within the configured skew) is refreshed before
//!   the request leaves;
//! - a 401 answered to a token that is no longer current is replayed with the current token
//!   without another refresh;
//! - otherwise the request joins the single-flight refresh and replays with the token it yields;
//! - a replay answered with 401 again surfaces as [`Error::Unauthorized`].
//!
//! The refresh endpoint itself is called outside of this path, so its own 401 is a refresh
//! failure. Every refresh failure clears the session and broadcasts
//! [`SessionEvent::AuthenticationLost`](crate::auth::SessionEvent::AuthenticationLost).

mod account;
mod crud;
mod form;
mod model;
mod page;
mod resource;

pub use form::*;
pub use model::*;
pub use page::*;
pub use resource::*;

/// Runs `$body` with `$resource` bound to the record type of `$kind`.
macro_rules! with_resource {
	($kind:expr, |$resource:ident| $body:expr) => {
		match $kind {
			$crate::api::ResourceKind::Category => {
				type $resource = $crate::api::Category;
				$body
			},
			$crate::api::ResourceKind::Unit => {
				type $resource = $crate::api::Unit;
				$body
			},
			$crate::api::ResourceKind::Manufacturer => {
				type $resource = $crate::api::Manufacturer;
				$body
			},
			$crate::api::ResourceKind::Origin => {
				type $resource = $crate::api::Origin;
				$body
			},
			$crate::api::ResourceKind::Store => {
				type $resource = $crate::api::Store;
				$body
			},
			$crate::api::ResourceKind::Product => {
				type $resource = $crate::api::Product;
				$body
			},
			$crate::api::ResourceKind::Shopping => {
				type $resource = $crate::api::Shopping;
				$body
			},
		}
	};
}
pub(crate) use with_resource;

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{SessionManager, TokenGrant, TokenSecret},
	config::ApiConfig,
	error::{ApiError, ConfigError},
	http::{HttpRequest, HttpResponse, HttpTransport, Method},
	obs::{self, CallKind},
	refresh::{RefreshCoordinator, RefreshMetrics},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

const BODY_PREVIEW_LEN: usize = 200;

#[cfg(feature = "reqwest")]
/// API client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// A request addressed relative to the API base URL.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the base URL.
	pub path: String,
	/// JSON body bytes.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Builds a bodiless request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), body: None }
	}

	/// Attaches `body` serialized as JSON.
	pub fn json(mut self, body: &impl Serialize) -> Result<Self> {
		self.body = Some(serde_json::to_vec(body).map_err(ConfigError::from)?);

		Ok(self)
	}
}

/// Authenticated client for the grocery REST API.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	config: ApiConfig,
	transport: Arc<T>,
	session: Arc<SessionManager>,
	refresh: Arc<RefreshCoordinator>,
	login_guard: Arc<AsyncMutex<()>>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport and session.
	pub fn with_transport(
		config: ApiConfig,
		transport: impl Into<Arc<T>>,
		session: Arc<SessionManager>,
	) -> Self {
		Self {
			config,
			transport: transport.into(),
			session,
			refresh: Default::default(),
			login_guard: Default::default(),
		}
	}

	/// Session shared with every clone of this client.
	pub fn session(&self) -> &Arc<SessionManager> {
		&self.session
	}

	/// Settings the client was built with.
	pub fn config(&self) -> &ApiConfig {
		&self.config
	}

	/// Counters describing refresh activity.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		self.refresh.metrics()
	}

	/// Sends an authenticated request, refreshing the access token at most once.
	///
	/// The returned response may carry any status other than 401. A request that already went
	/// out with a token obtained by a preemptive refresh is not refreshed again.
	pub async fn send(&self, request: ApiRequest) -> Result<HttpResponse> {
		let mut token = self.session.access_token().ok_or(Error::Unauthorized)?;
		let mut refreshed = false;

		if self.is_expiring() {
			#[cfg(feature = "tracing")]
			tracing::debug!(path = %request.path, "access token expired; refreshing before send");

			token = self.refresh_from(&token).await?;
			refreshed = true;
		}

		let response = self.dispatch(&request, Some(token.clone())).await?;

		if response.status != 401 {
			return Ok(response);
		}
		if refreshed {
			return Err(Error::Unauthorized);
		}

		let token = self.refresh_from(&token).await?;

		self.refresh.metrics().record_replay();

		#[cfg(feature = "tracing")]
		tracing::debug!(path = %request.path, "replaying request with refreshed token");

		let response = self.dispatch(&request, Some(token)).await?;

		if response.status == 401 {
			return Err(Error::Unauthorized);
		}

		Ok(response)
	}

	/// Executes `request` once with the given bearer, without any 401 handling.
	pub(crate) async fn dispatch(
		&self,
		request: &ApiRequest,
		bearer: Option<TokenSecret>,
	) -> Result<HttpResponse> {
		let url = self.config.endpoint(&request.path)?;
		let response = self
			.transport
			.execute(HttpRequest { method: request.method, url, bearer, body: request.body.clone() })
			.await?;

		Ok(response)
	}

	fn is_expiring(&self) -> bool {
		self.session.tokens().is_some_and(|tokens| {
			tokens.is_access_expired_at(OffsetDateTime::now_utc(), self.config.token_skew)
		})
	}

	/// Returns a usable access token to replace `stale`.
	///
	/// A token that already differs from `stale` is returned as is; otherwise the caller joins
	/// the single-flight refresh. The session is checked again once the caller leads, since a
	/// refresh may have settled in between.
	async fn refresh_from(&self, stale: &TokenSecret) -> Result<TokenSecret> {
		match self.session.access_token() {
			Some(current) if current != *stale => return Ok(current),
			Some(_) => {},
			None => return Err(Error::Unauthorized),
		}

		self.refresh
			.refresh_or_reuse(
				|| self.session.access_token().filter(|current| current != stale),
				|| self.perform_refresh(),
			)
			.await
	}

	async fn perform_refresh(&self) -> Result<TokenSecret> {
		let outcome = obs::observe(CallKind::Refresh, "perform_refresh", async {
			let refresh_token = self.session.refresh_token().ok_or_else(|| {
				Error::AuthenticationLost { reason: "no refresh token is available".into() }
			})?;
			let request = ApiRequest::new(Method::Post, self.config.endpoints.refresh.clone())
				.json(&serde_json::json!({ "refresh_token": refresh_token.expose() }))?;
			let response = self.dispatch(&request, None).await?;
			let grant = decode::<TokenGrant>(expect_success(response)?)?;

			Ok::<_, Error>(grant)
		})
		.await;
		let grant = match outcome {
			Ok(grant) => grant,
			Err(err) => {
				let reason = match err {
					Error::AuthenticationLost { reason } => reason,
					other => other.to_string(),
				};

				if let Err(store_err) = self.session.expire(reason.clone()).await {
					#[cfg(feature = "tracing")]
					tracing::warn!(error = %store_err, "persisted session could not be cleared");
					#[cfg(not(feature = "tracing"))]
					let _ = store_err;
				}

				return Err(Error::AuthenticationLost { reason });
			},
		};

		match self.session.apply_refresh(grant).await {
			Ok(Some(token)) => Ok(token),
			Ok(None) => Err(Error::AuthenticationLost { reason: "session ended while refreshing".into() }),
			Err(err) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %err, "refreshed session could not be persisted");
				#[cfg(not(feature = "tracing"))]
				let _ = err;

				self.session.access_token().ok_or(Error::Unauthorized)
			},
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by a reqwest transport applying the configured timeout.
	pub fn new(config: ApiConfig, session: Arc<SessionManager>) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::with_timeout(config.timeout)?;

		Ok(Self::with_transport(config, transport, session))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			session: self.session.clone(),
			refresh: self.refresh.clone(),
			login_guard: self.login_guard.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("session", &self.session)
			.field("refresh_in_flight", &self.refresh.is_in_flight())
			.finish()
	}
}

/// Maps a non-2xx response to [`ApiError::Status`].
pub(crate) fn expect_success(response: HttpResponse) -> Result<HttpResponse> {
	if response.is_success() {
		return Ok(response);
	}

	Err(ApiError::Status {
		status: response.status,
		message: error_message(&response.body),
		retry_after: response.metadata.retry_after,
	}
	.into())
}

/// Decodes a JSON body, reporting the path of the first mismatch.
pub(crate) fn decode<R>(response: HttpResponse) -> Result<R>
where
	R: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ApiError::Decode { source, status: response.status }.into())
}

/// Extracts a human-readable message from an error payload.
pub(crate) fn error_message(body: &[u8]) -> String {
	if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
		for key in ["detail", "message", "error"] {
			if let Some(Value::String(message)) = map.get(key) {
				return message.clone();
			}
		}

		// Field validation payloads: {"name": ["This field is required."]}.
		let fields = map
			.iter()
			.filter_map(|(field, value)| match value {
				Value::String(message) => Some(format!("{field}: {message}")),
				Value::Array(messages) => {
					let joined = messages.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" ");

					(!joined.is_empty()).then(|| format!("{field}: {joined}"))
				},
				_ => None,
			})
			.collect::<Vec<_>>();

		if !fields.is_empty() {
			return fields.join("; ");
		}
	}

	let text = String::from_utf8_lossy(body);
	let text = text.trim();

	if text.is_empty() {
		return "empty response body".into();
	}

	let mut preview = text.chars().take(BODY_PREVIEW_LEN).collect::<String>();

	if text.chars().count() > BODY_PREVIEW_LEN {
		preview.push_str("...");
	}

	preview
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn error_message_prefers_known_keys() {
		assert_eq!(error_message(br#"{"detail":"Not allowed","error":"x"}"#), "Not allowed");
		assert_eq!(error_message(br#"{"error":"boom"}"#), "boom");
		assert_eq!(
			error_message(br#"{"name":["This field is required."],"code":7}"#),
			"name: This field is required."
		);
	}

	#[test]
	fn error_message_falls_back_to_a_preview() {
		assert_eq!(error_message(b""), "empty response body");
		assert_eq!(error_message(b"  Bad Gateway \n"), "Bad Gateway");

		let long = "y".repeat(BODY_PREVIEW_LEN + 50);
		let preview = error_message(long.as_bytes());

		assert_eq!(preview.len(), BODY_PREVIEW_LEN + 3);
		assert!(preview.ends_with("..."));
	}

	#[test]
	fn decode_reports_the_failing_path() {
		let response = HttpResponse {
			status: 200,
			body: br#"{"id":1,"name":"Fruit","extra":{}}"#.to_vec(),
			metadata: Default::default(),
		};
		let category: Category = decode(response).expect("Valid payload should decode.");

		assert_eq!(category.name, "Fruit");

		let response = HttpResponse {
			status: 200,
			body: br#"{"id":"one","name":"Fruit"}"#.to_vec(),
			metadata: Default::default(),
		};
		let err = decode::<Category>(response).expect_err("Wrong id type must fail.");

		match err {
			Error::Api(ApiError::Decode { source, status }) => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "id");
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}
}
