//! Verification of Slack's `v0` request signatures.
//!
//! Slack signs `v0:<timestamp>:<raw body>` with HMAC-SHA256 keyed by the app's signing secret
//! and sends the hex digest as `X-Slack-Signature: v0=<hex>` alongside
//! `X-Slack-Request-Timestamp`. Requests older than the tolerance are rejected to limit replay.

// crates.io
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::{_prelude::*, auth::TokenSecret};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-slack-signature";
/// Header carrying the request timestamp.
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

const VERSION: &str = "v0";

/// Why a request signature was rejected.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SignatureError {
	/// A signature header was absent.
	#[error("Request is missing the {0} header.")]
	MissingHeader(&'static str),
	/// The timestamp header is not a Unix timestamp.
	#[error("Request timestamp is malformed.")]
	MalformedTimestamp,
	/// The timestamp is outside the accepted window.
	#[error("Request timestamp is outside the accepted window.")]
	Stale,
	/// The signature is not `v0=<hex>`.
	#[error("Request signature is malformed.")]
	MalformedSignature,
	/// The signature does not match the body.
	#[error("Request signature does not match.")]
	Mismatch,
}

/// Checks inbound request signatures against the signing secret.
#[derive(Clone, Debug)]
pub struct SignatureVerifier {
	secret: TokenSecret,
	tolerance: Duration,
}
impl SignatureVerifier {
	/// Window within which a request timestamp is accepted.
	pub const DEFAULT_TOLERANCE: Duration = Duration::minutes(5);

	/// Creates a verifier with the default tolerance.
	pub fn new(secret: TokenSecret) -> Self {
		Self { secret, tolerance: Self::DEFAULT_TOLERANCE }
	}

	/// Verifies `body` against the raw header values at `now`.
	pub fn verify(
		&self,
		timestamp: Option<&str>,
		signature: Option<&str>,
		body: &[u8],
		now: OffsetDateTime,
	) -> Result<(), SignatureError> {
		let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?.trim();
		let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?.trim();
		let sent_at = timestamp.parse::<i64>().map_err(|_| SignatureError::MalformedTimestamp)?;

		if now.unix_timestamp().abs_diff(sent_at) > self.tolerance.whole_seconds().unsigned_abs() {
			return Err(SignatureError::Stale);
		}

		let digest = signature
			.strip_prefix(VERSION)
			.and_then(|rest| rest.strip_prefix('='))
			.and_then(|digest| hex::decode(digest).ok())
			.ok_or(SignatureError::MalformedSignature)?;

		self.mac(timestamp, body)?.verify_slice(&digest).map_err(|_| SignatureError::Mismatch)
	}

	/// Computes the `v0=<hex>` signature Slack would send for `body` at `timestamp`.
	pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
		let digest = self.mac(timestamp, body)?.finalize().into_bytes();

		Ok(format!("{VERSION}={}", hex::encode(digest)))
	}

	fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
		let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.expose().as_bytes())
			.map_err(|_| SignatureError::Mismatch)?;

		mac.update(VERSION.as_bytes());
		mac.update(b":");
		mac.update(timestamp.as_bytes());
		mac.update(b":");
		mac.update(body);

		Ok(mac)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn verifier() -> SignatureVerifier {
		SignatureVerifier::new(TokenSecret::new("8f742231b10e8888abcd99yyyzzz85a5"))
	}

	#[test]
	fn accepts_slack_reference_signature() {
		let body = b"token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
		let now = OffsetDateTime::from_unix_timestamp(1_531_420_618)
			.expect("Fixture timestamp should be valid.");

		verifier()
			.verify(
				Some("1531420618"),
				Some("v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503"),
				body,
				now,
			)
			.expect("Slack's documented example must verify.");
	}

	#[test]
	fn rejects_tampering_staleness_and_malformed_headers() {
		let verifier = verifier();
		let now = OffsetDateTime::now_utc();
		let timestamp = now.unix_timestamp().to_string();
		let signature =
			verifier.sign(&timestamp, b"payload=1").expect("Signing should succeed.");

		assert_eq!(verifier.verify(Some(&timestamp), Some(&signature), b"payload=1", now), Ok(()));
		assert_eq!(
			verifier.verify(Some(&timestamp), Some(&signature), b"payload=2", now),
			Err(SignatureError::Mismatch)
		);
		assert_eq!(
			verifier.verify(Some(&timestamp), Some(&signature), b"payload=1", now + Duration::minutes(6)),
			Err(SignatureError::Stale)
		);
		assert_eq!(
			verifier.verify(Some(&timestamp), Some("v1=abcd"), b"payload=1", now),
			Err(SignatureError::MalformedSignature)
		);
		assert_eq!(
			verifier.verify(None, Some(&signature), b"payload=1", now),
			Err(SignatureError::MissingHeader(TIMESTAMP_HEADER))
		);
		assert_eq!(
			verifier.verify(Some("yesterday"), Some(&signature), b"payload=1", now),
			Err(SignatureError::MalformedTimestamp)
		);
		assert_eq!(
			verifier.verify(Some("-9223372036854775808"), Some("v0=00"), b"", now),
			Err(SignatureError::Stale)
		);
		assert_eq!(
			verifier.verify(Some("9223372036854775807"), Some("v0=00"), b"", now),
			Err(SignatureError::Stale)
		);
		assert_eq!(
			verifier.verify(Some(&timestamp), Some("v0=zz"), b"payload=1", now),
			Err(SignatureError::MalformedSignature)
		);
	}
}
