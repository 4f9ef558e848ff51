//! Slack front end: Block Kit rendering, inbound payloads, the interaction dispatcher, and (with
//! the `bot` feature) request signature checks plus the HTTP endpoints Slack posts to.
//!
//! The home tab lists one resource at a time with navigation, pagination, and per-row edit and
//! delete buttons. Add and edit open modals generated from the same field schema the command-line
//! front end validates against, so both surfaces report identical field errors.

pub mod blocks;
#[cfg(feature = "bot")] pub mod server;
#[cfg(feature = "bot")] pub mod signature;
pub mod views;

mod bot;
mod payload;
mod web;

pub use bot::*;
pub use payload::*;
pub use web::*;

// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};
#[cfg(feature = "bot")] use signature::SignatureError;

/// Failures raised while talking to Slack or handling its payloads.
#[derive(Debug, ThisError)]
pub enum SlackError {
	/// A Web API method answered with `ok: false` or a non-success status.
	#[error("Slack method {method} failed: {error}.")]
	Api {
		/// Web API method name.
		method: &'static str,
		/// Slack error code.
		error: String,
	},
	/// Network failure while calling Slack.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Missing or invalid Slack configuration.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A body could not be encoded or decoded.
	#[error("Slack JSON could not be processed.")]
	Json(#[from] serde_json::Error),
	/// An inbound payload does not match the expected shape.
	#[error("Slack payload is malformed.")]
	Payload(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// The REST API call behind an interaction failed.
	#[error(transparent)]
	Client(#[from] Error),
	/// An inbound request carried an invalid signature.
	#[cfg(feature = "bot")]
	#[error(transparent)]
	Signature(#[from] SignatureError),
}
impl SlackError {
	/// Returns `true` when the error was caused by the inbound request rather than the bot.
	pub fn is_bad_request(&self) -> bool {
		match self {
			Self::Payload(_) => true,
			#[cfg(feature = "bot")]
			Self::Signature(_) => true,
			_ => false,
		}
	}
}
