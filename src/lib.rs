//! Typed admin client for the grocery expense tracking REST API, with a single-flight token
//! refresh interceptor, a persistent session manager, and a Slack bot that exposes the same CRUD
//! surface through Block Kit views.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
#[cfg(feature = "cli")] pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod refresh;
pub mod slack;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		api::ApiClient,
		auth::{SessionManager, TokenPair, Username},
		config::ApiConfig,
		http::ReqwestTransport,
		store::{MemoryStore, SessionStore},
	};

	/// API client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = ApiClient<ReqwestTransport>;

	/// Builds an API client pointed at `base_url` with an in-memory session store.
	pub fn build_reqwest_test_client(base_url: &str) -> (ReqwestTestClient, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn SessionStore> = store_backend.clone();
		let config = ApiConfig::new(
			Url::parse(base_url).expect("Failed to parse mock API base URL for tests."),
		);
		let session = Arc::new(SessionManager::with_store(store));
		let client = ApiClient::with_transport(config, ReqwestTransport::default(), session);

		(client, store_backend)
	}

	/// Installs an opaque access/refresh pair for `admin`.
	pub async fn seed_session(client: &ReqwestTestClient, access: &str, refresh: &str) {
		let username = Username::new("admin").expect("Username fixture should be valid.");

		client
			.session()
			.establish(Some(username), TokenPair::new(access).with_refresh(refresh))
			.await
			.expect("Seeding the session should succeed.");
	}

	/// Encodes an unsigned JWT whose payload carries the provided `exp` claim.
	pub fn fake_jwt(subject: &str, exp: OffsetDateTime) -> String {
		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
		let payload = URL_SAFE_NO_PAD
			.encode(format!(r#"{{"sub":"{subject}","exp":{}}}"#, exp.unix_timestamp()));

		format!("{header}.{payload}.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
