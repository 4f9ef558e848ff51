// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{self, RefreshEvent};

/// Thread-safe counters for the refresh interceptor.
///
/// Every recorded event is also exported through [`obs::record_refresh_event`].
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	queued: AtomicU64,
	abandoned: AtomicU64,
	replays: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refresh endpoint calls started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that minted a new access token.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh calls that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how many callers waited on another caller's refresh.
	pub fn queued(&self) -> u64 {
		self.queued.load(Ordering::Relaxed)
	}

	/// Returns how many refreshes were cancelled before settling.
	pub fn abandoned(&self) -> u64 {
		self.abandoned.load(Ordering::Relaxed)
	}

	/// Returns how many requests were replayed with a new credential.
	pub fn replays(&self) -> u64 {
		self.replays.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		bump(&self.attempts, RefreshEvent::Attempt);
	}

	pub(crate) fn record_success(&self) {
		bump(&self.success, RefreshEvent::Success);
	}

	pub(crate) fn record_failure(&self) {
		bump(&self.failure, RefreshEvent::Failure);
	}

	pub(crate) fn record_queued(&self) {
		bump(&self.queued, RefreshEvent::Queued);
	}

	pub(crate) fn record_abandoned(&self) {
		bump(&self.abandoned, RefreshEvent::Abandoned);
	}

	pub(crate) fn record_replay(&self) {
		bump(&self.replays, RefreshEvent::Replay);
	}
}

fn bump(counter: &AtomicU64, event: RefreshEvent) {
	counter.fetch_add(1, Ordering::Relaxed);
	obs::record_refresh_event(event);
}
