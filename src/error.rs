//! Crate-level error types shared across the API client, session manager, and stores.

// self
use crate::{_prelude::*, api::ResourceKind};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The REST API answered with an unexpected status or payload.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// A draft failed field validation.
	#[error(transparent)]
	Form(#[from] crate::api::FormError),

	/// The request was rejected even after a credential refresh, or no session exists.
	#[error("Request is not authorized.")]
	Unauthorized,
	/// Login was rejected by the API.
	#[error("Username or password was rejected.")]
	InvalidCredentials,
	/// The refresh token could not mint a new access token; the session has been cleared.
	#[error("Authentication lost: {reason}.")]
	AuthenticationLost {
		/// Why the refresh failed.
		reason: String,
	},
	/// The addressed record does not exist.
	#[error("{resource} {id} was not found.")]
	NotFound {
		/// Resource kind of the missing record.
		resource: ResourceKind,
		/// Identifier that was requested.
		id: i64,
	},
}
impl Error {
	/// Returns `true` when the error means the caller has to log in again.
	pub fn is_auth_failure(&self) -> bool {
		matches!(self, Self::Unauthorized | Self::AuthenticationLost { .. })
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured URL cannot be parsed.
	#[error("Configured URL `{value}` is invalid.")]
	InvalidUrl {
		/// Raw configured value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The configuration file could not be read.
	#[error("Configuration file {path} could not be read.")]
	Read {
		/// Path that was read.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The configuration file is not valid TOML for the expected schema.
	#[error("Configuration file is malformed.")]
	Parse(#[from] toml::de::Error),
	/// A value was present but out of range or malformed.
	#[error("Configuration value `{key}` is invalid: {reason}.")]
	InvalidValue {
		/// Dotted configuration key.
		key: &'static str,
		/// Human-readable reason.
		reason: String,
	},
	/// A value required by the running component is missing.
	#[error("Configuration value `{key}` is required.")]
	Missing {
		/// Dotted configuration key.
		key: &'static str,
	},
	/// A request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Serialize(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Unexpected responses returned by the REST API.
#[derive(Debug, ThisError)]
pub enum ApiError {
	/// Non-success status other than 401/404.
	#[error("API returned HTTP {status}: {message}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Message extracted from the error payload.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Successful status but a body that does not match the expected shape.
	#[error("API returned malformed JSON.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
}
impl ApiError {
	/// Returns the HTTP status carried by the error.
	pub fn status(&self) -> u16 {
		match self {
			Self::Status { status, .. } | Self::Decode { status, .. } => *status,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn auth_failures_are_classified() {
		assert!(Error::Unauthorized.is_auth_failure());
		assert!(Error::AuthenticationLost { reason: "expired".into() }.is_auth_failure());
		assert!(!Error::InvalidCredentials.is_auth_failure());
		assert!(
			!Error::NotFound { resource: ResourceKind::Product, id: 7 }.is_auth_failure(),
			"Missing records must not force a new login."
		);
	}

	#[test]
	fn not_found_message_names_the_resource() {
		let err = Error::NotFound { resource: ResourceKind::Manufacturer, id: 42 };

		assert_eq!(err.to_string(), "manufacturer 42 was not found.");
	}
}
