//! Session manager holding the signed-in user's credentials and broadcasting lifecycle events.
//!
//! The manager is the single source of truth for the access/refresh pair. The API client reads
//! the current access token before every request, writes rotated tokens after a refresh, and
//! calls [`SessionManager::expire`] when a refresh fails so every subscriber observes a
//! [`SessionEvent::AuthenticationLost`] and the persisted session is dropped.

// crates.io
use tokio::sync::broadcast;
// self
use crate::{
	_prelude::*,
	api::User,
	auth::{TokenGrant, TokenPair, TokenSecret, Username},
	store::{SessionStore, StoredSession},
};

const EVENT_CAPACITY: usize = 32;

/// Lifecycle notifications emitted by [`SessionManager`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
	/// Credentials were established by a login or restored from storage.
	LoggedIn {
		/// Account name, when known.
		username: Option<Username>,
	},
	/// The access token was replaced by a refresh.
	TokenRefreshed,
	/// The user logged out explicitly.
	LoggedOut,
	/// A refresh failed; the session has been cleared and the user must log in again.
	AuthenticationLost {
		/// Why the refresh failed.
		reason: String,
	},
}

#[derive(Debug, Default)]
struct SessionState {
	tokens: Option<TokenPair>,
	username: Option<Username>,
	user: Option<User>,
}

/// Holds the current credentials and user profile.
pub struct SessionManager {
	state: RwLock<SessionState>,
	store: Option<Arc<dyn SessionStore>>,
	events: broadcast::Sender<SessionEvent>,
}
impl SessionManager {
	/// Creates a manager that keeps the session in memory only.
	pub fn new() -> Self {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);

		Self { state: Default::default(), store: None, events }
	}

	/// Creates a manager that mirrors every change into `store`.
	pub fn with_store(store: Arc<dyn SessionStore>) -> Self {
		Self { store: Some(store), ..Self::new() }
	}

	/// Subscribes to lifecycle events. Events emitted before subscribing are not replayed.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.events.subscribe()
	}

	/// Reloads a previously persisted session. Returns `true` when one was found.
	pub async fn restore(&self) -> Result<bool> {
		let Some(store) = &self.store else {
			return Ok(false);
		};
		let Some(stored) = store.load().await? else {
			return Ok(false);
		};

		{
			let mut state = self.state.write();

			state.username = stored.username.clone();
			state.tokens = Some(stored.tokens);
			state.user = None;
		}

		self.emit(SessionEvent::LoggedIn { username: stored.username });

		Ok(true)
	}

	/// Installs freshly issued credentials for `username`.
	pub async fn establish(&self, username: Option<Username>, tokens: TokenPair) -> Result<()> {
		{
			let mut state = self.state.write();

			state.username = username.clone();
			state.tokens = Some(tokens.clone());
			state.user = None;
		}

		self.persist(username.clone(), tokens).await?;
		self.emit(SessionEvent::LoggedIn { username });

		Ok(())
	}

	/// Applies a refresh response and returns the new access token.
	///
	/// Returns `None` if the session was cleared while the refresh was in flight, in which case
	/// the grant is discarded.
	pub async fn apply_refresh(&self, grant: TokenGrant) -> Result<Option<TokenSecret>> {
		let (username, tokens) = {
			let mut state = self.state.write();
			let username = state.username.clone();
			let Some(tokens) = state.tokens.as_mut() else {
				return Ok(None);
			};

			tokens.rotate(grant);

			(username, tokens.clone())
		};
		let access = tokens.access_token.clone();

		self.persist(username, tokens).await?;
		self.emit(SessionEvent::TokenRefreshed);

		Ok(Some(access))
	}

	/// Caches the profile returned by the API.
	pub fn set_user(&self, user: User) {
		let mut state = self.state.write();

		if state.tokens.is_some() {
			state.user = Some(user);
		}
	}

	/// Clears the session after an explicit logout.
	pub async fn logout(&self) -> Result<()> {
		self.clear().await?;
		self.emit(SessionEvent::LoggedOut);

		Ok(())
	}

	/// Clears the session after a failed refresh and broadcasts the loss.
	///
	/// The in-memory session is always cleared, even when the store cannot be updated.
	pub async fn expire(&self, reason: impl Into<String>) -> Result<()> {
		let reason = reason.into();
		let cleared = self.clear().await;

		#[cfg(feature = "tracing")]
		tracing::warn!(%reason, "authentication lost; session cleared");

		self.emit(SessionEvent::AuthenticationLost { reason });

		cleared
	}

	/// Returns the current access token.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.state.read().tokens.as_ref().map(|tokens| tokens.access_token.clone())
	}

	/// Returns the current refresh token.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.state.read().tokens.as_ref().and_then(|tokens| tokens.refresh_token.clone())
	}

	/// Returns a copy of the current credentials.
	pub fn tokens(&self) -> Option<TokenPair> {
		self.state.read().tokens.clone()
	}

	/// Returns the cached user profile.
	pub fn user(&self) -> Option<User> {
		self.state.read().user.clone()
	}

	/// Returns the account name the session belongs to.
	pub fn username(&self) -> Option<Username> {
		self.state.read().username.clone()
	}

	/// Returns `true` when credentials are present.
	pub fn is_authenticated(&self) -> bool {
		self.state.read().tokens.is_some()
	}

	async fn clear(&self) -> Result<()> {
		*self.state.write() = SessionState::default();

		if let Some(store) = &self.store {
			store.clear().await?;
		}

		Ok(())
	}

	async fn persist(&self, username: Option<Username>, tokens: TokenPair) -> Result<()> {
		if let Some(store) = &self.store {
			store.save(StoredSession { username, tokens }).await?;
		}

		Ok(())
	}

	fn emit(&self, event: SessionEvent) {
		// No subscribers is not an error.
		let _ = self.events.send(event);
	}
}
impl Default for SessionManager {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for SessionManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.read();

		f.debug_struct("SessionManager")
			.field("username", &state.username)
			.field("authenticated", &state.tokens.is_some())
			.field("persistent", &self.store.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn username() -> Username {
		Username::new("admin").expect("Username fixture should be valid.")
	}

	#[tokio::test]
	async fn establish_persists_and_broadcasts() {
		let store = Arc::new(MemoryStore::default());
		let session = SessionManager::with_store(store.clone());
		let mut events = session.subscribe();

		session
			.establish(Some(username()), TokenPair::new("access").with_refresh("refresh"))
			.await
			.expect("Establishing a session should succeed.");

		assert!(session.is_authenticated());
		assert_eq!(session.access_token().map(|t| t.expose().to_owned()), Some("access".into()));
		assert_eq!(
			events.recv().await.expect("LoggedIn should be broadcast."),
			SessionEvent::LoggedIn { username: Some(username()) }
		);
		assert_eq!(
			store.snapshot().map(|stored| stored.tokens.access_token.expose().to_owned()),
			Some("access".into())
		);
	}

	#[tokio::test]
	async fn refresh_rotates_tokens_in_memory_and_store() {
		let store = Arc::new(MemoryStore::default());
		let session = SessionManager::with_store(store.clone());

		session
			.establish(None, TokenPair::new("access-1").with_refresh("refresh-1"))
			.await
			.expect("Establishing a session should succeed.");

		let access = session
			.apply_refresh(TokenGrant { access_token: TokenSecret::new("access-2"), refresh_token: None })
			.await
			.expect("Applying a refresh should succeed.")
			.expect("A live session should accept the refreshed token.");

		assert_eq!(access.expose(), "access-2");
		assert_eq!(session.refresh_token().map(|t| t.expose().to_owned()), Some("refresh-1".into()));
		assert_eq!(
			store.snapshot().map(|stored| stored.tokens.access_token.expose().to_owned()),
			Some("access-2".into())
		);
	}

	#[tokio::test]
	async fn refresh_after_clear_is_discarded() {
		let session = SessionManager::new();
		let applied = session
			.apply_refresh(TokenGrant { access_token: TokenSecret::new("late"), refresh_token: None })
			.await
			.expect("Applying a refresh without a session should not fail.");

		assert!(applied.is_none());
		assert!(!session.is_authenticated());
	}

	#[tokio::test]
	async fn expire_clears_state_store_and_notifies() {
		let store = Arc::new(MemoryStore::default());
		let session = SessionManager::with_store(store.clone());

		session
			.establish(Some(username()), TokenPair::new("access").with_refresh("refresh"))
			.await
			.expect("Establishing a session should succeed.");

		let mut events = session.subscribe();

		session.expire("refresh rejected").await.expect("Expiring should succeed.");

		assert!(!session.is_authenticated());
		assert!(store.snapshot().is_none());
		assert_eq!(
			events.recv().await.expect("AuthenticationLost should be broadcast."),
			SessionEvent::AuthenticationLost { reason: "refresh rejected".into() }
		);
	}

	#[tokio::test]
	async fn restore_reloads_persisted_session() {
		let store = Arc::new(MemoryStore::default());

		store
			.save(StoredSession {
				username: Some(username()),
				tokens: TokenPair::new("persisted").with_refresh("refresh"),
			})
			.await
			.expect("Seeding the store should succeed.");

		let session = SessionManager::with_store(store);

		assert!(session.restore().await.expect("Restoring should succeed."));
		assert_eq!(session.username(), Some(username()));
		assert!(!SessionManager::new().restore().await.expect("Restoring should succeed."));
	}
}
