//! Outbound Slack Web API calls.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::SlackUserId,
	slack::{SlackError, blocks::View},
};
#[cfg(feature = "reqwest")]
use crate::{
	auth::TokenSecret,
	error::{ConfigError, TransportError},
	obs::{self, CallKind},
};

/// Boxed future returned by [`SlackApi`] calls.
pub type SlackFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SlackError>> + 'a + Send>>;

/// The Web API methods the bot relies on.
pub trait SlackApi
where
	Self: 'static + Send + Sync,
{
	/// `views.open`: shows `view` as a modal in response to `trigger_id`.
	fn open_view<'a>(&'a self, trigger_id: &'a str, view: &'a View) -> SlackFuture<'a, ()>;

	/// `views.publish`: replaces `user`'s home tab with `view`.
	fn publish_view<'a>(&'a self, user: &'a SlackUserId, view: &'a View) -> SlackFuture<'a, ()>;
}

/// Envelope every Web API method answers with.
#[cfg(feature = "reqwest")]
#[derive(Debug, Deserialize)]
struct WebResponse {
	ok: bool,
	#[serde(default)]
	error: Option<String>,
}

/// [`SlackApi`] backed by reqwest and a bot token.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestSlackApi {
	client: ReqwestClient,
	base_url: Url,
	token: TokenSecret,
}
#[cfg(feature = "reqwest")]
impl ReqwestSlackApi {
	/// Creates a client calling methods under `base_url` (normally `https://slack.com/api/`).
	pub fn new(client: ReqwestClient, base_url: Url, token: TokenSecret) -> Self {
		Self { client, base_url, token }
	}

	async fn call<B>(&self, method: &'static str, body: &B) -> Result<(), SlackError>
	where
		B: Serialize + Sync,
	{
		obs::observe(CallKind::Slack, method, async {
			let url = self.base_url.join(method).map_err(|source| ConfigError::InvalidUrl {
				value: method.to_owned(),
				source,
			})?;
			let response = self
				.client
				.post(url)
				.header(AUTHORIZATION, format!("Bearer {}", self.token.expose()))
				.header(CONTENT_TYPE, "application/json; charset=utf-8")
				.body(serde_json::to_vec(body)?)
				.send()
				.await
				.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let bytes = response.bytes().await.map_err(TransportError::from)?;

			if !(200..300).contains(&status) {
				return Err(SlackError::Api { method, error: format!("http_{status}") });
			}

			let parsed = serde_json::from_slice::<WebResponse>(&bytes)?;

			if parsed.ok {
				Ok(())
			} else {
				Err(SlackError::Api {
					method,
					error: parsed.error.unwrap_or_else(|| "unknown_error".into()),
				})
			}
		})
		.await
	}
}
#[cfg(feature = "reqwest")]
impl SlackApi for ReqwestSlackApi {
	fn open_view<'a>(&'a self, trigger_id: &'a str, view: &'a View) -> SlackFuture<'a, ()> {
		Box::pin(async move {
			#[derive(Serialize)]
			struct OpenView<'a> {
				trigger_id: &'a str,
				view: &'a View,
			}

			self.call("views.open", &OpenView { trigger_id, view }).await
		})
	}

	fn publish_view<'a>(&'a self, user: &'a SlackUserId, view: &'a View) -> SlackFuture<'a, ()> {
		Box::pin(async move {
			#[derive(Serialize)]
			struct PublishView<'a> {
				user_id: &'a SlackUserId,
				view: &'a View,
			}

			self.call("views.publish", &PublishView { user_id: user, view }).await
		})
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestSlackApi {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReqwestSlackApi")
			.field("base_url", &self.base_url.as_str())
			.field("token", &self.token)
			.finish()
	}
}
