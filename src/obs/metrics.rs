// std
use std::time::Duration as StdDuration;
// self
use crate::obs::{CallKind, CallOutcome};

/// Refresh interceptor events exported as `grocery_admin_refresh_total{event}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshEvent {
	/// A refresh endpoint call started.
	Attempt,
	/// A refresh minted a new access token.
	Success,
	/// A refresh failed and the session was lost.
	Failure,
	/// A caller waited on another caller's refresh.
	Queued,
	/// A refresh leader was cancelled before settling.
	Abandoned,
	/// A rejected request was replayed with a new credential.
	Replay,
}
impl RefreshEvent {
	/// Returns the label value used for the `event` label.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshEvent::Attempt => "attempt",
			RefreshEvent::Success => "success",
			RefreshEvent::Failure => "failure",
			RefreshEvent::Queued => "queued",
			RefreshEvent::Abandoned => "abandoned",
			RefreshEvent::Replay => "replay",
		}
	}
}

/// Counts a call outcome as `grocery_admin_call_total{kind,outcome}`.
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"grocery_admin_call_total",
		"kind" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records how long a settled call took as `grocery_admin_call_duration_seconds{kind,outcome}`.
pub fn record_call_duration(kind: CallKind, outcome: CallOutcome, elapsed: StdDuration) {
	#[cfg(feature = "metrics")]
	metrics::histogram!(
		"grocery_admin_call_duration_seconds",
		"kind" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.record(elapsed.as_secs_f64());
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome, elapsed);
}

/// Counts a refresh interceptor event.
pub fn record_refresh_event(event: RefreshEvent) {
	#[cfg(feature = "metrics")]
	metrics::counter!("grocery_admin_refresh_total", "event" => event.as_str()).increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = event;
}
