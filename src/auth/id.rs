//! Validated identifiers for API accounts and Slack members.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $max:expr) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Maximum accepted length in bytes.
			pub const MAX_LEN: usize = $max;

			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view, $max)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value, $max)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} cannot be empty.")]
	Empty {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the allowed length.
	#[error("{kind} exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted length.
		max: usize,
	},
}

def_id! { Username, "Login name of a REST API account.", "Username", 150 }
def_id! { SlackUserId, "Slack member identifier (`U…`/`W…`).", "SlackUser", 32 }

fn validate_view(kind: &'static str, view: &str, max: usize) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > max {
		return Err(IdentifierError::TooLong { kind, max });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace_and_empty_values() {
		assert!(Username::new(" admin").is_err(), "Leading whitespace must be rejected.");
		assert!(Username::new("admin ").is_err(), "Trailing whitespace must be rejected.");
		assert!(SlackUserId::new("").is_err());

		let user = Username::new("admin").expect("Username fixture should be valid.");

		assert_eq!(user.as_ref(), "admin");
		assert_eq!(format!("{user:?}"), "Username(admin)");
	}

	#[test]
	fn length_limits_are_per_kind() {
		Username::new("a".repeat(Username::MAX_LEN)).expect("Exact length should succeed.");

		assert!(Username::new("a".repeat(Username::MAX_LEN + 1)).is_err());
		assert!(matches!(
			SlackUserId::new("U".repeat(33)),
			Err(IdentifierError::TooLong { max: 32, .. })
		));
	}

	#[test]
	fn serde_enforces_validation() {
		let user: SlackUserId =
			serde_json::from_str("\"U024BE7LH\"").expect("Slack user should deserialize.");

		assert_eq!(user.as_ref(), "U024BE7LH");
		assert!(serde_json::from_str::<SlackUserId>("\"with space\"").is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<SlackUserId, u8> = HashMap::from_iter([(
			SlackUserId::new("U1").expect("Slack user used for lookup should be valid."),
			3_u8,
		)]);

		assert_eq!(map.get("U1"), Some(&3));
	}
}
