//! In-process [`SessionStore`] used by the bot and by tests.

// self
use crate::{
	_prelude::*,
	store::{SessionStore, StoreFuture, StoredSession},
};

/// Thread-safe storage backend that keeps the session in memory only.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<StoredSession>>>);
impl MemoryStore {
	/// Returns the currently stored snapshot without going through the async contract.
	pub fn snapshot(&self) -> Option<StoredSession> {
		self.0.read().clone()
	}
}
impl SessionStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<StoredSession>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn save(&self, session: StoredSession) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(session);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			slot.write().take();

			Ok(())
		})
	}
}
