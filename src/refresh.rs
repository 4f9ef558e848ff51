//! Single-flight token refresh with a FIFO wait queue.
//!
//! [`RefreshCoordinator::refresh`] guarantees that at most one refresh call runs at a time.
//! The first caller becomes the leader and runs its refresh future; every caller that arrives
//! while the leader is in flight is queued and resumed, in arrival order, with the leader's
//! outcome. A new access token is handed to every waiter so each can replay its own request; a
//! failure rejects every waiter with the same reason.
//!
//! If the leader is cancelled before settling, the in-flight flag is cleared and the waiters
//! are released to compete again, so one of them leads the next attempt.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Outcome delivered to queued callers.
#[derive(Clone, Debug)]
enum Settlement {
	Refreshed(TokenSecret),
	Rejected(String),
	Abandoned,
}

enum Ticket {
	Lead,
	Wait(oneshot::Receiver<Settlement>),
}

#[derive(Debug, Default)]
struct FlightState {
	in_flight: bool,
	waiters: VecDeque<oneshot::Sender<Settlement>>,
}

/// Serializes refresh calls and fans their outcome out to queued callers.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<FlightState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Runs `refresh` unless another refresh is already in flight, in which case the caller
	/// waits for that one instead.
	///
	/// The leader receives its own result unchanged. Waiters receive the leader's token on
	/// success and [`Error::AuthenticationLost`] carrying the leader's error message on
	/// failure.
	pub async fn refresh<F, Fut>(&self, refresh: F) -> Result<TokenSecret>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<TokenSecret>>,
	{
		self.refresh_or_reuse(|| None, refresh).await
	}

	/// Same as [`refresh`](Self::refresh), except that a caller who becomes the leader first
	/// asks `reuse` for a token minted since it last looked.
	///
	/// When `reuse` yields a token, `refresh` is not called and queued waiters receive that
	/// token. No attempt is recorded.
	pub async fn refresh_or_reuse<U, F, Fut>(&self, reuse: U, refresh: F) -> Result<TokenSecret>
	where
		U: Fn() -> Option<TokenSecret>,
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<TokenSecret>>,
	{
		loop {
			let receiver = match self.ticket() {
				Ticket::Lead => {
					if let Some(token) = reuse() {
						self.release(Settlement::Refreshed(token.clone()));

						return Ok(token);
					}

					return self.lead(refresh).await;
				},
				Ticket::Wait(receiver) => receiver,
			};

			self.metrics.record_queued();

			#[cfg(feature = "tracing")]
			tracing::debug!("joining in-flight token refresh");

			match receiver.await {
				Ok(Settlement::Refreshed(token)) => return Ok(token),
				Ok(Settlement::Rejected(reason)) => return Err(Error::AuthenticationLost { reason }),
				Ok(Settlement::Abandoned) | Err(_) => {
					#[cfg(feature = "tracing")]
					tracing::debug!("in-flight token refresh was abandoned; retrying");
				},
			}
		}
	}

	/// Returns `true` while a refresh call is running.
	pub fn is_in_flight(&self) -> bool {
		self.state.lock().in_flight
	}

	/// Returns the number of callers currently waiting on the in-flight refresh.
	pub fn queued_len(&self) -> usize {
		self.state.lock().waiters.len()
	}

	/// Counters describing refresh activity.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	fn ticket(&self) -> Ticket {
		let mut state = self.state.lock();

		if state.in_flight {
			let (sender, receiver) = oneshot::channel();

			state.waiters.push_back(sender);

			Ticket::Wait(receiver)
		} else {
			state.in_flight = true;

			Ticket::Lead
		}
	}

	async fn lead<F, Fut>(&self, refresh: F) -> Result<TokenSecret>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<TokenSecret>>,
	{
		let mut flight = Flight { coordinator: self, settled: false };

		self.metrics.record_attempt();

		let result = refresh().await;

		match &result {
			Ok(token) => {
				self.metrics.record_success();
				flight.settle(Settlement::Refreshed(token.clone()));
			},
			Err(err) => {
				let reason = match err {
					Error::AuthenticationLost { reason } => reason.clone(),
					other => other.to_string(),
				};

				self.metrics.record_failure();
				flight.settle(Settlement::Rejected(reason));
			},
		}

		result
	}

	fn release(&self, settlement: Settlement) {
		let waiters = {
			let mut state = self.state.lock();

			state.in_flight = false;

			mem::take(&mut state.waiters)
		};

		#[cfg(feature = "tracing")]
		tracing::debug!(waiters = waiters.len(), "releasing token refresh waiters");

		// FIFO: waiters are resumed in the order they queued.
		for waiter in waiters {
			let _ = waiter.send(settlement.clone());
		}
	}
}

/// Settles the flight exactly once, including when the leader future is dropped mid-refresh.
struct Flight<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl Flight<'_> {
	fn settle(&mut self, settlement: Settlement) {
		self.settled = true;
		self.coordinator.release(settlement);
	}
}
impl Drop for Flight<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.metrics.record_abandoned();
			self.settle(Settlement::Abandoned);
		}
	}
}
