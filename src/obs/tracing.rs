// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	obs::{CallKind, CallOutcome},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// `grocery_admin.call` span around one API, login, refresh, or Slack call.
///
/// The span is opened with `kind` and `stage`; `outcome`, `elapsed_ms`, and on failure `error`
/// are filled in by [`CallSpan::finish`] once the call settles.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Opens a span for `kind` at call site `stage`.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"grocery_admin.call",
				kind = kind.as_str(),
				stage,
				outcome = tracing::field::Empty,
				elapsed_ms = tracing::field::Empty,
				error = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments the call future without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}

	/// Records how the call ended. Failures are also logged at debug level inside the span.
	pub fn finish(&self, outcome: CallOutcome, elapsed: StdDuration, error: Option<&dyn Display>) {
		#[cfg(feature = "tracing")]
		{
			let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

			self.span.record("outcome", outcome.as_str());
			self.span.record("elapsed_ms", elapsed_ms);

			if let Some(error) = error {
				self.span.record("error", tracing::field::display(error));
				self.span.in_scope(|| tracing::debug!(%error, elapsed_ms, "call failed"));
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (outcome, elapsed, error);
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrumented_call_yields_its_output() {
		let span = CallSpan::new(CallKind::Api, "list");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn finish_accepts_failures_and_huge_durations() {
		let span = CallSpan::new(CallKind::Refresh, "perform_refresh");
		let error = Error::AuthenticationLost { reason: "revoked".into() };

		span.finish(CallOutcome::Failure, StdDuration::MAX, Some(&error));
		span.finish(CallOutcome::Success, StdDuration::from_millis(12), None);
	}
}
