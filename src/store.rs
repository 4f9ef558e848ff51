//! Persistence contract and built-in backends for session credentials.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenPair, Username},
};

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend that keeps the signed-in session between process runs.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Loads the persisted session, if any.
	fn load(&self) -> StoreFuture<'_, Option<StoredSession>>;

	/// Persists or replaces the session.
	fn save(&self, session: StoredSession) -> StoreFuture<'_, ()>;

	/// Removes any persisted session.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Snapshot written by [`SessionStore::save`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
	/// Account the tokens belong to, when known.
	pub username: Option<Username>,
	/// Current credentials.
	pub tokens: TokenPair,
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "disk full".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("disk full"));

		let source =
			StdError::source(&error).expect("Crate error should expose the store error as source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
