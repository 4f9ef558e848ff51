//! Field schemas and validation for resource drafts.
//!
//! Every draft declares its fields once in [`Form::FIELDS`]. Both front ends build their input
//! from that schema (command-line `--field key=value` flags and Slack modal blocks) and hand the
//! collected strings to [`Form::from_values`], which reports every invalid field at once.

// crates.io
use rust_decimal::Decimal;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::{
	_prelude::*,
	api::{EntityId, ResourceKind},
};

/// Calendar date format used on the wire and in form input.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

const MAX_TEXT_LEN: usize = 255;

/// Raw form input keyed by [`FieldSpec::key`].
pub type FieldValues = BTreeMap<String, String>;

/// Input kind of a draft field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
	/// Free text.
	Text,
	/// Non-negative decimal number.
	Decimal,
	/// Calendar date in `YYYY-MM-DD` form.
	Date,
	/// Identifier of a record in another collection.
	Reference(ResourceKind),
}

/// Static description of one draft field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
	/// Wire and form key.
	pub key: &'static str,
	/// Human-facing label.
	pub label: &'static str,
	/// Input kind.
	pub kind: FieldKind,
	/// Whether an empty value is rejected.
	pub required: bool,
}
impl FieldSpec {
	/// Declares a required field.
	pub const fn required(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
		Self { key, label, kind, required: true }
	}

	/// Declares an optional field.
	pub const fn optional(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
		Self { key, label, kind, required: false }
	}
}

/// Validation failures keyed by field.
#[derive(Clone, Debug, Default, PartialEq, Eq, ThisError)]
#[error("Form has {} invalid field(s): {}.", .errors.len(), summarize(.errors))]
pub struct FormError {
	/// Message per offending field key.
	pub errors: BTreeMap<String, String>,
}
impl FormError {
	/// Builds an error for a single field.
	pub fn field(key: impl Into<String>, message: impl Into<String>) -> Self {
		Self { errors: BTreeMap::from([(key.into(), message.into())]) }
	}

	/// Returns `true` when no field failed.
	pub fn is_empty(&self) -> bool {
		self.errors.is_empty()
	}
}

fn summarize(errors: &BTreeMap<String, String>) -> String {
	errors.iter().map(|(key, message)| format!("{key}: {message}")).collect::<Vec<_>>().join("; ")
}

/// A writable draft with a declarative field schema.
pub trait Form
where
	Self: 'static + Clone + Debug + Send + Sync + Serialize + DeserializeOwned,
{
	/// Field schema in display order.
	const FIELDS: &'static [FieldSpec];

	/// Parses and validates raw input.
	fn from_values(values: &FieldValues) -> Result<Self, FormError>;

	/// Renders the draft back into raw input, used to prefill edit forms.
	fn to_values(&self) -> FieldValues;
}

/// Collects typed values and per-field errors while a draft is parsed.
///
/// Accessors return a placeholder when a field is invalid; [`FieldReader::finish`] discards the
/// placeholder draft if any error was recorded.
#[derive(Debug)]
pub struct FieldReader<'a> {
	values: &'a FieldValues,
	errors: BTreeMap<String, String>,
}
impl<'a> FieldReader<'a> {
	/// Starts reading `values`.
	pub fn new(values: &'a FieldValues) -> Self {
		Self { values, errors: BTreeMap::new() }
	}

	/// Reads a required text field.
	pub fn text(&mut self, key: &str) -> String {
		self.optional_text(key).unwrap_or_else(|| {
			self.reject(key, "This field is required.");

			String::new()
		})
	}

	/// Reads an optional text field; blank input is `None`.
	pub fn optional_text(&mut self, key: &str) -> Option<String> {
		let value = self.raw(key)?;

		if value.chars().count() > MAX_TEXT_LEN {
			self.reject(key, format!("Must be at most {MAX_TEXT_LEN} characters."));
		}

		Some(value.to_owned())
	}

	/// Reads a required reference to another record.
	pub fn reference(&mut self, key: &str) -> EntityId {
		self.optional_reference(key).unwrap_or_else(|| {
			if !self.errors.contains_key(key) {
				self.reject(key, "This field is required.");
			}

			0
		})
	}

	/// Reads an optional reference to another record.
	pub fn optional_reference(&mut self, key: &str) -> Option<EntityId> {
		let value = self.raw(key)?;

		match value.parse::<EntityId>() {
			Ok(id) if id > 0 => Some(id),
			_ => {
				self.reject(key, "Must be a positive record id.");

				None
			},
		}
	}

	/// Reads a required decimal that must be strictly positive when `positive` is set and
	/// non-negative otherwise. A decimal comma is accepted.
	pub fn decimal(&mut self, key: &str, positive: bool) -> Decimal {
		let Some(value) = self.raw(key) else {
			self.reject(key, "This field is required.");

			return Decimal::ZERO;
		};
		let normalized = value.replace(',', ".");

		match Decimal::from_str(&normalized) {
			Ok(number) if positive && number <= Decimal::ZERO => {
				self.reject(key, "Must be greater than zero.");

				Decimal::ZERO
			},
			Ok(number) if number.is_sign_negative() => {
				self.reject(key, "Must not be negative.");

				Decimal::ZERO
			},
			Ok(number) => number,
			Err(_) => {
				self.reject(key, "Must be a number.");

				Decimal::ZERO
			},
		}
	}

	/// Reads a required `YYYY-MM-DD` date.
	pub fn date(&mut self, key: &str) -> Date {
		let Some(value) = self.raw(key) else {
			self.reject(key, "This field is required.");

			return Date::MIN;
		};

		Date::parse(value, DATE_FORMAT).unwrap_or_else(|_| {
			self.reject(key, "Must be a date in YYYY-MM-DD form.");

			Date::MIN
		})
	}

	/// Returns `draft` if every field was valid.
	pub fn finish<T>(self, draft: T) -> Result<T, FormError> {
		if self.errors.is_empty() { Ok(draft) } else { Err(FormError { errors: self.errors }) }
	}

	fn raw(&self, key: &str) -> Option<&'a str> {
		self.values.get(key).map(|value| value.trim()).filter(|value| !value.is_empty())
	}

	fn reject(&mut self, key: &str, message: impl Into<String>) {
		self.errors.entry(key.to_owned()).or_insert_with(|| message.into());
	}
}

/// Builds [`FieldValues`] from a draft's fields, skipping absent optionals.
#[derive(Debug, Default)]
pub struct FieldWriter(FieldValues);
impl FieldWriter {
	/// Writes a present value.
	pub fn set(mut self, key: &str, value: impl Display) -> Self {
		self.0.insert(key.to_owned(), value.to_string());

		self
	}

	/// Writes an optional value.
	pub fn set_opt(self, key: &str, value: Option<impl Display>) -> Self {
		match value {
			Some(value) => self.set(key, value),
			None => self,
		}
	}

	/// Returns the collected values.
	pub fn finish(self) -> FieldValues {
		self.0
	}
}

/// Formats a date the way [`FieldReader::date`] parses it.
pub fn format_date(date: Date) -> String {
	date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}
