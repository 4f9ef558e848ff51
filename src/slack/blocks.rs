//! Typed Block Kit surface: text objects, interactive elements, layout blocks, and views.
//!
//! Only the subset the bot renders is modeled. Every type serializes to the exact JSON shape
//! Slack expects, so a [`View`] can be posted to `views.open` or `views.publish` as is.

// self
use crate::_prelude::*;

/// Longest view title Slack accepts.
pub const MAX_TITLE_LEN: usize = 24;
/// Most options a static select may carry.
pub const MAX_SELECT_OPTIONS: usize = 100;

/// Text object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
	/// Literal text.
	PlainText {
		/// Content.
		text: String,
	},
	/// Slack-flavored markdown.
	Mrkdwn {
		/// Content.
		text: String,
	},
}
impl Text {
	/// Builds a plain text object.
	pub fn plain(text: impl Into<String>) -> Self {
		Self::PlainText { text: text.into() }
	}

	/// Builds a markdown text object.
	pub fn mrkdwn(text: impl Into<String>) -> Self {
		Self::Mrkdwn { text: text.into() }
	}

	/// Returns the raw content.
	pub fn as_str(&self) -> &str {
		match self {
			Self::PlainText { text } | Self::Mrkdwn { text } => text,
		}
	}
}

/// Visual emphasis of a button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
	/// Green call to action.
	Primary,
	/// Red destructive action.
	Danger,
}

/// Confirmation dialog shown before an action fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Confirm {
	/// Dialog title.
	pub title: Text,
	/// Explanatory text.
	pub text: Text,
	/// Label of the accepting button.
	pub confirm: Text,
	/// Label of the cancelling button.
	pub deny: Text,
	/// Emphasis of the accepting button.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub style: Option<ButtonStyle>,
}
impl Confirm {
	/// Builds a dialog guarding a destructive action.
	pub fn danger(title: impl Into<String>, text: impl Into<String>) -> Self {
		Self {
			title: Text::plain(title),
			text: Text::mrkdwn(text),
			confirm: Text::plain("Delete"),
			deny: Text::plain("Cancel"),
			style: Some(ButtonStyle::Danger),
		}
	}
}

/// Choice offered by a select menu.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
	/// Visible label.
	pub text: Text,
	/// Value reported back on selection.
	pub value: String,
}
impl SelectOption {
	/// Builds an option; Slack caps option labels at 75 characters.
	pub fn new(label: impl AsRef<str>, value: impl Into<String>) -> Self {
		Self { text: Text::plain(truncate(label.as_ref(), 75)), value: value.into() }
	}
}

/// Interactive element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
	/// Push button.
	Button {
		/// Identifier reported in `block_actions`.
		action_id: String,
		/// Label.
		text: Text,
		/// Payload reported with the action.
		#[serde(skip_serializing_if = "Option::is_none")]
		value: Option<String>,
		/// Emphasis.
		#[serde(skip_serializing_if = "Option::is_none")]
		style: Option<ButtonStyle>,
		/// Confirmation dialog.
		#[serde(skip_serializing_if = "Option::is_none")]
		confirm: Option<Confirm>,
	},
	/// Single- or multi-line text field.
	PlainTextInput {
		/// Identifier reported in view state.
		action_id: String,
		/// Prefilled value.
		#[serde(skip_serializing_if = "Option::is_none")]
		initial_value: Option<String>,
	},
	/// Numeric field.
	NumberInput {
		/// Identifier reported in view state.
		action_id: String,
		/// Whether fractional values are accepted.
		is_decimal_allowed: bool,
		/// Prefilled value.
		#[serde(skip_serializing_if = "Option::is_none")]
		initial_value: Option<String>,
		/// Smallest accepted value.
		#[serde(skip_serializing_if = "Option::is_none")]
		min_value: Option<String>,
	},
	/// Calendar picker reporting `YYYY-MM-DD`.
	Datepicker {
		/// Identifier reported in view state.
		action_id: String,
		/// Preselected date.
		#[serde(skip_serializing_if = "Option::is_none")]
		initial_date: Option<String>,
	},
	/// Menu over a fixed option list.
	StaticSelect {
		/// Identifier reported in view state.
		action_id: String,
		/// Hint shown before a choice is made.
		placeholder: Text,
		/// Choices.
		options: Vec<SelectOption>,
		/// Preselected choice.
		#[serde(skip_serializing_if = "Option::is_none")]
		initial_option: Option<SelectOption>,
	},
}
impl Element {
	/// Builds a button.
	pub fn button(action_id: impl Into<String>, label: impl Into<String>) -> Self {
		Self::Button {
			action_id: action_id.into(),
			text: Text::plain(label),
			value: None,
			style: None,
			confirm: None,
		}
	}

	/// Sets the value of a button; other elements are returned unchanged.
	pub fn with_value(mut self, new_value: impl Into<String>) -> Self {
		if let Self::Button { value, .. } = &mut self {
			*value = Some(new_value.into());
		}

		self
	}

	/// Sets the style of a button; other elements are returned unchanged.
	pub fn with_style(mut self, new_style: ButtonStyle) -> Self {
		if let Self::Button { style, .. } = &mut self {
			*style = Some(new_style);
		}

		self
	}

	/// Attaches a confirmation dialog to a button; other elements are returned unchanged.
	pub fn with_confirm(mut self, dialog: Confirm) -> Self {
		if let Self::Button { confirm, .. } = &mut self {
			*confirm = Some(dialog);
		}

		self
	}

	/// Returns the element's action identifier.
	pub fn action_id(&self) -> &str {
		match self {
			Self::Button { action_id, .. }
			| Self::PlainTextInput { action_id, .. }
			| Self::NumberInput { action_id, .. }
			| Self::Datepicker { action_id, .. }
			| Self::StaticSelect { action_id, .. } => action_id,
		}
	}
}

/// Layout block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
	/// Large bold title.
	Header {
		/// Title text; plain text only.
		text: Text,
	},
	/// Text with an optional element on the right.
	Section {
		/// Stable identifier.
		#[serde(skip_serializing_if = "Option::is_none")]
		block_id: Option<String>,
		/// Body.
		text: Text,
		/// Element rendered beside the text.
		#[serde(skip_serializing_if = "Option::is_none")]
		accessory: Option<Element>,
	},
	/// Row of interactive elements.
	Actions {
		/// Stable identifier.
		block_id: String,
		/// Elements, at most 25.
		elements: Vec<Element>,
	},
	/// Small print.
	Context {
		/// Text fragments.
		elements: Vec<Text>,
	},
	/// Horizontal rule.
	Divider,
	/// Labeled form field inside a modal.
	Input {
		/// Identifier keying the submitted value and any validation error.
		block_id: String,
		/// Field label.
		label: Text,
		/// Input element.
		element: Element,
		/// Whether Slack accepts an empty submission.
		optional: bool,
	},
}
impl Block {
	/// Builds a header.
	pub fn header(text: impl Into<String>) -> Self {
		Self::Header { text: Text::plain(text) }
	}

	/// Builds a markdown section.
	pub fn section(text: impl Into<String>) -> Self {
		Self::Section { block_id: None, text: Text::mrkdwn(text), accessory: None }
	}

	/// Builds a markdown section with an element beside it.
	pub fn section_with(text: impl Into<String>, accessory: Element) -> Self {
		Self::Section { block_id: None, text: Text::mrkdwn(text), accessory: Some(accessory) }
	}

	/// Builds a context line.
	pub fn context(text: impl Into<String>) -> Self {
		Self::Context { elements: vec![Text::mrkdwn(text)] }
	}

	/// Returns the block identifier, if any.
	pub fn block_id(&self) -> Option<&str> {
		match self {
			Self::Section { block_id, .. } => block_id.as_deref(),
			Self::Actions { block_id, .. } | Self::Input { block_id, .. } => Some(block_id),
			Self::Header { .. } | Self::Context { .. } | Self::Divider => None,
		}
	}
}

/// Surface kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
	/// App Home tab.
	Home,
	/// Dialog.
	Modal,
}

/// Home tab or modal definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct View {
	/// Surface kind.
	#[serde(rename = "type")]
	pub kind: ViewKind,
	/// Modal title.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<Text>,
	/// Modal submit label.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub submit: Option<Text>,
	/// Modal close label.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub close: Option<Text>,
	/// Identifier echoed in `view_submission`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub callback_id: Option<String>,
	/// Opaque state echoed in `view_submission`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub private_metadata: Option<String>,
	/// Content.
	pub blocks: Vec<Block>,
}
impl View {
	/// Builds a home tab.
	pub fn home(blocks: Vec<Block>) -> Self {
		Self {
			kind: ViewKind::Home,
			title: None,
			submit: None,
			close: None,
			callback_id: None,
			private_metadata: None,
			blocks,
		}
	}

	/// Builds a modal with submit and cancel buttons.
	pub fn modal(title: &str, callback_id: impl Into<String>, blocks: Vec<Block>) -> Self {
		Self {
			kind: ViewKind::Modal,
			title: Some(Text::plain(truncate(title, MAX_TITLE_LEN))),
			submit: Some(Text::plain("Save")),
			close: Some(Text::plain("Cancel")),
			callback_id: Some(callback_id.into()),
			private_metadata: None,
			blocks,
		}
	}

	/// Attaches opaque state echoed back on submission.
	pub fn with_private_metadata(mut self, metadata: impl Into<String>) -> Self {
		self.private_metadata = Some(metadata.into());

		self
	}
}

fn truncate(text: &str, max: usize) -> String {
	if text.chars().count() <= max {
		return text.to_owned();
	}

	let mut cut = text.chars().take(max.saturating_sub(1)).collect::<String>();

	cut.push('…');

	cut
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn buttons_serialize_in_block_kit_shape() {
		let button = Element::button("delete:store", "Delete")
			.with_value("4")
			.with_style(ButtonStyle::Danger)
			.with_confirm(Confirm::danger("Delete store?", "This cannot be undone."));
		let encoded = serde_json::to_value(&button).expect("Button should serialize.");

		assert_eq!(encoded["type"], "button");
		assert_eq!(encoded["action_id"], "delete:store");
		assert_eq!(encoded["value"], "4");
		assert_eq!(encoded["style"], "danger");
		assert_eq!(encoded["confirm"]["confirm"], json!({ "type": "plain_text", "text": "Delete" }));
	}

	#[test]
	fn modal_titles_are_truncated_and_optional_fields_omitted() {
		let view = View::modal("Edit a very long resource name", "form", vec![Block::Divider]);
		let encoded = serde_json::to_value(&view).expect("View should serialize.");

		assert_eq!(encoded["type"], "modal");
		assert_eq!(encoded["title"]["text"].as_str().map(|t| t.chars().count()), Some(MAX_TITLE_LEN));
		assert!(encoded.get("private_metadata").is_none());
		assert_eq!(encoded["blocks"], json!([{ "type": "divider" }]));
	}

	#[test]
	fn input_elements_use_slack_type_names() {
		let picker = Element::Datepicker { action_id: "day".into(), initial_date: None };
		let number = Element::NumberInput {
			action_id: "price".into(),
			is_decimal_allowed: true,
			initial_value: Some("2.5".into()),
			min_value: Some("0".into()),
		};

		assert_eq!(serde_json::to_value(&picker).expect("Datepicker should serialize.")["type"], "datepicker");
		assert_eq!(
			serde_json::to_value(&number).expect("Number input should serialize.")["type"],
			"number_input"
		);
	}
}
