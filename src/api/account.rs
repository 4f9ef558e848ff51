//! Login, logout, and profile calls.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiRequest, User, decode, expect_success},
	auth::{Credentials, TokenGrant, TokenPair},
	http::{HttpTransport, Method},
	obs::{self, CallKind},
};

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Exchanges `credentials` for a token pair, installs it, and loads the user profile.
	///
	/// Concurrent logins through clones of the same client run one after another. A 400 or 401
	/// from the login endpoint maps to [`Error::InvalidCredentials`].
	pub async fn login(&self, credentials: &Credentials) -> Result<User> {
		let _serialized = self.login_guard.lock().await;

		self.login_locked(credentials).await
	}

	/// Logs in with `credentials` unless a session already exists.
	///
	/// Used by long-running services to recover after authentication was lost. Callers racing
	/// on a lost session trigger a single login.
	pub async fn ensure_login(&self, credentials: &Credentials) -> Result<()> {
		let _serialized = self.login_guard.lock().await;

		if self.session.is_authenticated() {
			return Ok(());
		}

		#[cfg(feature = "tracing")]
		tracing::info!(username = %credentials.username, "no active session; logging in");

		self.login_locked(credentials).await.map(|_| ())
	}

	/// Ends the session.
	///
	/// The server-side logout is best effort: its failure is logged and local credentials are
	/// cleared regardless.
	pub async fn logout(&self) -> Result<()> {
		obs::observe(CallKind::Logout, "logout", async {
			if let Some(tokens) = self.session.tokens() {
				let body = serde_json::json!({
					"refresh_token": tokens.refresh_token.as_ref().map(|token| token.expose()),
				});
				let request = ApiRequest::new(Method::Post, self.config.endpoints.logout.clone())
					.json(&body)?;
				let outcome = self
					.dispatch(&request, Some(tokens.access_token.clone()))
					.await
					.and_then(expect_success);

				if let Err(err) = outcome {
					#[cfg(feature = "tracing")]
					tracing::warn!(error = %err, "server-side logout failed; clearing local session");
					#[cfg(not(feature = "tracing"))]
					let _ = err;
				}
			}

			self.session.logout().await
		})
		.await
	}

	/// Returns the signed-in user, fetching the profile when it is not cached.
	pub async fn current_user(&self) -> Result<User> {
		if let Some(user) = self.session.user() {
			return Ok(user);
		}

		let user = obs::observe(CallKind::Api, "current_user", async {
			let request = ApiRequest::new(Method::Get, self.config.endpoints.me.clone());
			let response = expect_success(self.send(request).await?)?;

			decode::<User>(response)
		})
		.await?;

		self.session.set_user(user.clone());

		Ok(user)
	}

	async fn login_locked(&self, credentials: &Credentials) -> Result<User> {
		let grant = obs::observe(CallKind::Login, "login", async {
			let request =
				ApiRequest::new(Method::Post, self.config.endpoints.login.clone()).json(credentials)?;
			let response = self.dispatch(&request, None).await?;

			if matches!(response.status, 400 | 401) {
				return Err(Error::InvalidCredentials);
			}

			decode::<TokenGrant>(expect_success(response)?)
		})
		.await?;

		self.session.establish(Some(credentials.username.clone()), TokenPair::from(grant)).await?;

		#[cfg(feature = "tracing")]
		tracing::info!(username = %credentials.username, "logged in");

		self.current_user().await
	}
}
