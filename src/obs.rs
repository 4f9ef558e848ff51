//! Optional observability helpers for API calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `grocery_admin.call` with the `kind` and
//!   `stage` (call site) fields.
//! - Enable `metrics` to increment the `grocery_admin_call_total` counter for every
//!   attempt/success/failure, labeled by `kind` + `outcome`, to record
//!   `grocery_admin_call_duration_seconds`, and to count refresh interceptor events as
//!   `grocery_admin_refresh_total{event}`.

mod metrics;
#[cfg(any(feature = "cli", feature = "bot"))] mod subscriber;
mod tracing;

pub use metrics::*;
#[cfg(any(feature = "cli", feature = "bot"))] pub use subscriber::*;
pub use tracing::*;

// std
use std::time::Instant;
// self
use crate::_prelude::*;

/// Call categories observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Resource CRUD request.
	Api,
	/// Login exchange.
	Login,
	/// Refresh endpoint call.
	Refresh,
	/// Logout call.
	Logout,
	/// Slack Web API or interaction handling.
	Slack,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Api => "api",
			CallKind::Login => "login",
			CallKind::Refresh => "refresh",
			CallKind::Logout => "logout",
			CallKind::Slack => "slack",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a client helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a call span, counting the attempt and recording outcome and duration.
pub async fn observe<T, E, Fut>(kind: CallKind, stage: &'static str, fut: Fut) -> Result<T, E>
where
	E: Display,
	Fut: Future<Output = Result<T, E>>,
{
	let span = CallSpan::new(kind, stage);
	let started = Instant::now();

	record_call_outcome(kind, CallOutcome::Attempt);

	let result = span.instrument(fut).await;
	let elapsed = started.elapsed();
	let (outcome, error) = match &result {
		Ok(_) => (CallOutcome::Success, None),
		Err(err) => (CallOutcome::Failure, Some(err as &dyn Display)),
	};

	span.finish(outcome, elapsed, error);
	record_call_outcome(kind, outcome);
	record_call_duration(kind, outcome, elapsed);

	result
}
