//! Redacted token secrets and the access/refresh pair held by a session.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Reads the `exp` claim when the secret is a JWT.
	///
	/// Signatures are not verified; the claim is only used to schedule refreshes early. Opaque
	/// tokens and malformed payloads yield `None`.
	pub fn jwt_expiry(&self) -> Option<OffsetDateTime> {
		#[derive(Deserialize)]
		struct Claims {
			exp: i64,
		}

		let payload = self.0.split('.').nth(1)?;
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
		let claims: Claims = serde_json::from_slice(&bytes).ok()?;

		OffsetDateTime::from_unix_timestamp(claims.exp).ok()
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access/refresh credentials issued by the API's login or refresh endpoints.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Short-lived credential sent as the bearer token.
	pub access_token: TokenSecret,
	/// Long-lived credential used to mint new access tokens.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the pair was stored locally.
	pub issued_at: OffsetDateTime,
}
impl TokenPair {
	/// Creates a pair holding only an access token.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: None,
			issued_at: OffsetDateTime::now_utc(),
		}
	}

	/// Attaches a refresh token.
	pub fn with_refresh(mut self, refresh_token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(refresh_token));

		self
	}

	/// Expiry of the access token, when it is a JWT with an `exp` claim.
	pub fn access_expires_at(&self) -> Option<OffsetDateTime> {
		self.access_token.jwt_expiry()
	}

	/// Returns `true` when the access token is known to expire within `skew` of `now`.
	///
	/// Tokens without a readable expiry are never considered expired; the API's 401 decides.
	/// An expiry too close to the representable minimum to subtract `skew` from counts as
	/// expired.
	pub fn is_access_expired_at(&self, now: OffsetDateTime, skew: Duration) -> bool {
		self.access_expires_at().is_some_and(|expires_at| {
			expires_at.checked_sub(skew).is_none_or(|refresh_at| refresh_at <= now)
		})
	}

	/// Applies a refresh response, keeping the current refresh token when none was rotated.
	pub fn rotate(&mut self, grant: TokenGrant) {
		self.access_token = grant.access_token;

		if let Some(refresh) = grant.refresh_token {
			self.refresh_token = Some(refresh);
		}

		self.issued_at = OffsetDateTime::now_utc();
	}
}
impl From<TokenGrant> for TokenPair {
	fn from(grant: TokenGrant) -> Self {
		Self {
			access_token: grant.access_token,
			refresh_token: grant.refresh_token,
			issued_at: OffsetDateTime::now_utc(),
		}
	}
}
impl Debug for TokenPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("access_expires_at", &self.access_expires_at())
			.finish()
	}
}

/// Body returned by the login and refresh endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenGrant {
	/// Newly minted access token.
	#[serde(alias = "access")]
	pub access_token: TokenSecret,
	/// Rotated refresh token, if the API rotates them.
	#[serde(default, alias = "refresh")]
	pub refresh_token: Option<TokenSecret>,
}

/// Username/password pair submitted to the login endpoint.
#[derive(Clone, Serialize)]
pub struct Credentials {
	/// Account name.
	pub username: crate::auth::Username,
	/// Account password.
	pub password: TokenSecret,
}
impl Credentials {
	/// Creates a credential pair.
	pub fn new(username: crate::auth::Username, password: impl Into<String>) -> Self {
		Self { username, password: TokenSecret::new(password) }
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}
