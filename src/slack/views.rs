//! Home tab and modal rendering.

// self
use crate::{
	_prelude::*,
	api::{EntityId, FieldKind, FieldSpec, FieldValues, Page, ResourceKind},
	slack::{
		Action, FormMetadata, SlackError,
		blocks::{Block, ButtonStyle, Confirm, Element, MAX_SELECT_OPTIONS, SelectOption, Text, View},
	},
};

/// Callback identifier of every add and edit modal.
pub const FORM_CALLBACK_ID: &str = "resource_form";

/// One list entry shown on the home tab.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
	/// Record identifier.
	pub id: EntityId,
	/// Display label.
	pub label: String,
}

/// Reference picker choices keyed by the referenced resource.
pub type ReferenceOptions = BTreeMap<ResourceKind, Vec<(EntityId, String)>>;

/// Renders the home tab for `kind`.
///
/// `listing` is either the current page or a message explaining why it could not be loaded.
pub fn home_view(kind: ResourceKind, listing: Result<&Page<Row>, &str>) -> View {
	let mut blocks = vec![Block::header("Grocery admin")];

	blocks.push(Block::Actions {
		block_id: "nav".into(),
		elements: ResourceKind::ALL
			.into_iter()
			.map(|candidate| {
				let button = Element::button(Action::Navigate(candidate).action_id(), candidate.title());

				if candidate == kind { button.with_style(ButtonStyle::Primary) } else { button }
			})
			.collect(),
	});
	blocks.push(Block::Divider);

	let page = match listing {
		Ok(page) => page,
		Err(message) => {
			blocks.push(Block::section(format!("*{}*", kind.title())));
			blocks.push(Block::section(format!(":warning: {}", escape(message))));

			return View::home(blocks);
		},
	};

	blocks.push(Block::section_with(
		format!("*{}* ({})", kind.title(), page.total),
		Element::button(Action::Add(kind).action_id(), "Add").with_style(ButtonStyle::Primary),
	));

	if page.items.is_empty() {
		blocks.push(Block::context(if page.total == 0 {
			format!("No {} yet.", kind.title().to_lowercase())
		} else {
			"Nothing on this page.".to_owned()
		}));
	}

	for row in &page.items {
		blocks.push(Block::section(escape(&row.label)));
		blocks.push(Block::Actions {
			block_id: format!("row:{}", row.id),
			elements: vec![
				Element::button(Action::Edit(kind, row.id).action_id(), "Edit")
					.with_value(row.id.to_string()),
				Element::button(Action::Delete(kind, row.id).action_id(), "Delete")
					.with_value(row.id.to_string())
					.with_style(ButtonStyle::Danger)
					.with_confirm(Confirm::danger(
						format!("Delete {kind}?"),
						format!("*{}* will be deleted permanently.", escape(&row.label)),
					)),
			],
		});
	}

	blocks.push(Block::context(format!("Page {} of {}", page.page, page.total_pages())));

	let mut pager = Vec::new();

	if page.has_prev() {
		pager.push(
			Element::button(format!("{}:prev", Action::Page(kind, 1).action_id()), "Previous")
				.with_value((page.page - 1).to_string()),
		);
	}
	if page.has_next() {
		pager.push(
			Element::button(format!("{}:next", Action::Page(kind, 1).action_id()), "Next")
				.with_value((page.page + 1).to_string()),
		);
	}
	if !pager.is_empty() {
		blocks.push(Block::Actions { block_id: "pager".into(), elements: pager });
	}

	View::home(blocks)
}

/// Renders an add (`metadata.id == None`) or edit modal from a field schema.
///
/// `values` prefills the inputs; reference fields offer the choices in `options`.
pub fn form_view(
	metadata: &FormMetadata,
	fields: &[FieldSpec],
	values: &FieldValues,
	options: &ReferenceOptions,
) -> Result<View, SlackError> {
	let verb = if metadata.id.is_some() { "Edit" } else { "Add" };
	let blocks = fields
		.iter()
		.map(|field| Block::Input {
			block_id: field.key.into(),
			label: Text::plain(field.label),
			element: input_element(field, values.get(field.key).map(String::as_str), options),
			optional: !field.required,
		})
		.collect();

	Ok(View::modal(&format!("{verb} {}", metadata.kind), FORM_CALLBACK_ID, blocks)
		.with_private_metadata(metadata.encode()?))
}

fn input_element(field: &FieldSpec, value: Option<&str>, options: &ReferenceOptions) -> Element {
	let action_id = field.key.to_owned();
	let value = value.map(str::to_owned);

	match field.kind {
		FieldKind::Text => Element::PlainTextInput { action_id, initial_value: value },
		FieldKind::Decimal => Element::NumberInput {
			action_id,
			is_decimal_allowed: true,
			initial_value: value,
			min_value: Some("0".into()),
		},
		FieldKind::Date => Element::Datepicker { action_id, initial_date: value },
		FieldKind::Reference(kind) => {
			let choices = options
				.get(&kind)
				.map(|choices| {
					choices
						.iter()
						.take(MAX_SELECT_OPTIONS)
						.map(|(id, label)| SelectOption::new(label, id.to_string()))
						.collect::<Vec<_>>()
				})
				.unwrap_or_default();

			// Slack rejects selects without options.
			if choices.is_empty() {
				return Element::PlainTextInput { action_id, initial_value: value };
			}

			let initial_option = value
				.as_deref()
				.and_then(|value| choices.iter().find(|choice| choice.value == value).cloned());

			Element::StaticSelect {
				action_id,
				placeholder: Text::plain(format!("Choose a {kind}")),
				options: choices,
				initial_option,
			}
		},
	}
}

/// Escapes the characters Slack treats as control sequences in `mrkdwn`.
pub fn escape(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::api::{Form, ProductDraft};

	fn rows(count: usize) -> Vec<Row> {
		(1..=count as i64).map(|id| Row { id, label: format!("Item {id}") }).collect()
	}

	fn action_ids(view: &View) -> Vec<String> {
		view.blocks
			.iter()
			.flat_map(|block| match block {
				Block::Actions { elements, .. } => elements.iter().map(|e| e.action_id().to_owned()).collect(),
				Block::Section { accessory: Some(element), .. } => vec![element.action_id().to_owned()],
				_ => Vec::new(),
			})
			.collect()
	}

	#[test]
	fn home_lists_rows_with_edit_delete_and_pager() {
		let page = Page { items: rows(2), page: 2, per_page: 2, total: 6 };
		let view = home_view(ResourceKind::Store, Ok(&page));
		let ids = action_ids(&view);

		assert!(ids.contains(&"nav:shopping".to_owned()));
		assert!(ids.contains(&"add:store".to_owned()));
		assert_eq!(ids.iter().filter(|id| *id == "edit:store").count(), 2);
		assert_eq!(ids.iter().filter(|id| *id == "delete:store").count(), 2);
		assert!(ids.contains(&"page:store:prev".to_owned()));
		assert!(ids.contains(&"page:store:next".to_owned()));

		let confirm = view.blocks.iter().find_map(|block| match block {
			Block::Actions { elements, .. } => elements.iter().find_map(|element| match element {
				Element::Button { confirm: Some(confirm), .. } => Some(confirm.clone()),
				_ => None,
			}),
			_ => None,
		});

		assert!(confirm.is_some(), "Delete buttons must ask for confirmation.");
	}

	#[test]
	fn home_shows_load_failures_instead_of_rows() {
		let view = home_view(ResourceKind::Unit, Err("API returned HTTP 500: <boom>."));

		assert!(view.blocks.iter().any(|block| matches!(
			block,
			Block::Section { text, .. } if text.as_str().contains("&lt;boom&gt;")
		)));
		assert!(!action_ids(&view).contains(&"add:unit".to_owned()));
	}

	#[test]
	fn edit_form_prefills_inputs_and_selects() {
		let draft = ProductDraft {
			name: "Oat milk".into(),
			category_id: 2,
			unit_id: 1,
			manufacturer_id: None,
			origin_id: None,
		};
		let options = ReferenceOptions::from([
			(ResourceKind::Category, vec![(1, "Bakery".into()), (2, "Dairy".into())]),
			(ResourceKind::Unit, vec![(1, "Litre".into())]),
		]);
		let metadata = FormMetadata { kind: ResourceKind::Product, id: Some(5), page: 3 };
		let view = form_view(&metadata, ProductDraft::FIELDS, &draft.to_values(), &options)
			.expect("Form should render.");

		assert_eq!(view.title.as_ref().map(Text::as_str), Some("Edit product"));
		assert_eq!(view.blocks.len(), ProductDraft::FIELDS.len());
		assert_eq!(
			view.private_metadata.as_deref().map(FormMetadata::decode).and_then(Result::ok),
			Some(metadata)
		);

		match &view.blocks[1] {
			Block::Input { block_id, element: Element::StaticSelect { initial_option, options, .. }, optional, .. } => {
				assert_eq!(block_id, "category_id");
				assert_eq!(options.len(), 2);
				assert_eq!(initial_option.as_ref().map(|o| o.value.as_str()), Some("2"));
				assert!(!optional);
			},
			other => panic!("Unexpected block: {other:?}"),
		}
		match &view.blocks[3] {
			Block::Input { element: Element::PlainTextInput { initial_value, .. }, optional, .. } => {
				assert!(initial_value.is_none());
				assert!(optional);
			},
			other => panic!("Unexpected block: {other:?}"),
		}
	}
}
