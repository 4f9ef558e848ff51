//! Inbound Slack payloads: Events API envelopes, interaction payloads, and action identifiers.

// self
use crate::{
	_prelude::*,
	api::{EntityId, FieldValues, ResourceKind},
	auth::SlackUserId,
	slack::SlackError,
};

/// Body posted to the events endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
	/// Endpoint ownership check; the challenge must be echoed.
	UrlVerification {
		/// Value to echo.
		challenge: String,
	},
	/// A subscribed event.
	EventCallback {
		/// The event itself.
		event: Event,
	},
	/// Any other envelope type.
	#[serde(other)]
	Unsupported,
}

/// Subscribed event.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
	/// A user opened the app's Home or Messages tab.
	AppHomeOpened {
		/// User who opened the tab.
		user: SlackUserId,
		/// `home` or `messages`.
		#[serde(default)]
		tab: Option<String>,
	},
	/// Any other event type.
	#[serde(other)]
	Unsupported,
}

/// Decoded `payload` field posted to the interactions endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
	/// Buttons and other interactive elements.
	BlockActions(BlockActions),
	/// A modal was submitted.
	ViewSubmission(ViewSubmission),
	/// Any other interaction type.
	#[serde(other)]
	Unsupported,
}
impl Interaction {
	/// Decodes the JSON carried in the form-encoded `payload` field.
	pub fn from_json(raw: &str) -> Result<Self, SlackError> {
		let mut deserializer = serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(&mut deserializer).map_err(SlackError::from)
	}
}

/// Acting user.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SlackUser {
	/// User identifier.
	pub id: SlackUserId,
}

/// `block_actions` payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BlockActions {
	/// Acting user.
	pub user: SlackUser,
	/// Short-lived handle for opening a modal.
	pub trigger_id: String,
	/// Elements that fired.
	#[serde(default)]
	pub actions: Vec<ActionEvent>,
}

/// One fired element.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ActionEvent {
	/// Element identifier.
	pub action_id: String,
	/// Button value.
	#[serde(default)]
	pub value: Option<String>,
}

/// `view_submission` payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ViewSubmission {
	/// Acting user.
	pub user: SlackUser,
	/// Submitted view.
	pub view: SubmittedView,
}

/// The modal as submitted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SubmittedView {
	/// Identifier set when the modal was opened.
	#[serde(default)]
	pub callback_id: String,
	/// State set when the modal was opened.
	#[serde(default)]
	pub private_metadata: String,
	/// Input values.
	pub state: ViewState,
}

/// Input values keyed by block then action identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ViewState {
	/// Values per block.
	pub values: BTreeMap<String, BTreeMap<String, StateValue>>,
}
impl ViewState {
	/// Flattens the state into form input keyed by block identifier.
	///
	/// Empty inputs are omitted.
	pub fn field_values(&self) -> FieldValues {
		self.values
			.iter()
			.filter_map(|(block_id, actions)| {
				actions.values().find_map(StateValue::as_text).map(|value| (block_id.clone(), value))
			})
			.collect()
	}
}

/// Value of one input element.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct StateValue {
	/// Text and number inputs.
	#[serde(default)]
	pub value: Option<String>,
	/// Static selects.
	#[serde(default)]
	pub selected_option: Option<SelectedOption>,
	/// Date pickers.
	#[serde(default)]
	pub selected_date: Option<String>,
}
impl StateValue {
	fn as_text(&self) -> Option<String> {
		self.value
			.clone()
			.or_else(|| self.selected_option.as_ref().map(|option| option.value.clone()))
			.or_else(|| self.selected_date.clone())
	}
}

/// Chosen select option.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SelectedOption {
	/// Option value.
	pub value: String,
}

/// State carried through a modal's `private_metadata`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormMetadata {
	/// Resource being edited.
	pub kind: ResourceKind,
	/// Record being edited; `None` when adding.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<EntityId>,
	/// Home tab page to return to.
	pub page: usize,
}
impl FormMetadata {
	/// Encodes the metadata as compact JSON.
	pub fn encode(&self) -> Result<String, SlackError> {
		Ok(serde_json::to_string(self)?)
	}

	/// Decodes metadata produced by [`FormMetadata::encode`].
	pub fn decode(raw: &str) -> Result<Self, SlackError> {
		let mut deserializer = serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(&mut deserializer).map_err(SlackError::from)
	}
}

/// Home tab and list interactions, encoded as `<verb>:<kind>[:<suffix>]` action identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
	/// Show a resource list.
	Navigate(ResourceKind),
	/// Open the add modal.
	Add(ResourceKind),
	/// Open the edit modal for a record.
	Edit(ResourceKind, EntityId),
	/// Delete a record.
	Delete(ResourceKind, EntityId),
	/// Show another page of a list.
	Page(ResourceKind, usize),
}
impl Action {
	/// Parses a fired element. Returns `None` for foreign or malformed actions.
	pub fn parse(action_id: &str, value: Option<&str>) -> Option<Self> {
		let mut parts = action_id.splitn(3, ':');
		let verb = parts.next()?;
		let kind = parts.next()?.parse::<ResourceKind>().ok()?;
		let value = value.map(str::trim);

		match verb {
			"nav" => Some(Self::Navigate(kind)),
			"add" => Some(Self::Add(kind)),
			"edit" => Some(Self::Edit(kind, value?.parse().ok()?)),
			"delete" => Some(Self::Delete(kind, value?.parse().ok()?)),
			"page" => Some(Self::Page(kind, value?.parse::<usize>().ok()?.max(1))),
			_ => None,
		}
	}

	/// Action identifier of the element triggering this action.
	pub fn action_id(&self) -> String {
		match self {
			Self::Navigate(kind) => format!("nav:{kind}"),
			Self::Add(kind) => format!("add:{kind}"),
			Self::Edit(kind, _) => format!("edit:{kind}"),
			Self::Delete(kind, _) => format!("delete:{kind}"),
			Self::Page(kind, _) => format!("page:{kind}"),
		}
	}

	/// Value carried by the triggering element.
	pub fn value(&self) -> Option<String> {
		match self {
			Self::Navigate(_) | Self::Add(_) => None,
			Self::Edit(_, id) | Self::Delete(_, id) => Some(id.to_string()),
			Self::Page(_, page) => Some(page.to_string()),
		}
	}
}
