//! Client-side search and pagination over a fetched collection.

// self
use crate::{_prelude::*, api::Resource};

/// Search and paging parameters for list calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
	/// Case-insensitive substring matched against record labels.
	pub search: Option<String>,
	/// 1-based page number.
	pub page: usize,
	/// Items per page.
	pub per_page: usize,
}
impl ListQuery {
	/// Default page size.
	pub const DEFAULT_PER_PAGE: usize = 10;
	/// Largest accepted page size.
	pub const MAX_PER_PAGE: usize = 100;

	/// Sets the search term; blank terms clear it.
	pub fn with_search(mut self, search: impl Into<String>) -> Self {
		let search = search.into();
		let search = search.trim();

		self.search = (!search.is_empty()).then(|| search.to_owned());

		self
	}

	/// Sets the page, clamped to at least 1.
	pub fn with_page(mut self, page: usize) -> Self {
		self.page = page.max(1);

		self
	}

	/// Sets the page size, clamped to `1..=MAX_PER_PAGE`.
	pub fn with_per_page(mut self, per_page: usize) -> Self {
		self.per_page = per_page.clamp(1, Self::MAX_PER_PAGE);

		self
	}

	/// Filters `items` by label and slices out the requested page.
	pub fn apply<R>(&self, items: Vec<R>) -> Page<R>
	where
		R: Resource,
	{
		let page = self.page.max(1);
		let per_page = self.per_page.clamp(1, Self::MAX_PER_PAGE);
		let needle = self.search.as_deref().map(str::to_lowercase);
		let matching = items
			.into_iter()
			.filter(|item| match &needle {
				Some(needle) => item.label().to_lowercase().contains(needle.as_str()),
				None => true,
			})
			.collect::<Vec<_>>();
		let total = matching.len();
		let items = matching.into_iter().skip((page - 1).saturating_mul(per_page)).take(per_page).collect();

		Page { items, page, per_page, total }
	}
}
impl Default for ListQuery {
	fn default() -> Self {
		Self { search: None, page: 1, per_page: Self::DEFAULT_PER_PAGE }
	}
}

/// One page of a filtered collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
	/// Records on this page.
	pub items: Vec<T>,
	/// 1-based page number.
	pub page: usize,
	/// Page size the slice was cut with.
	pub per_page: usize,
	/// Number of matching records across all pages.
	pub total: usize,
}
impl<T> Page<T> {
	/// Number of pages; an empty result still has one.
	pub fn total_pages(&self) -> usize {
		self.total.div_ceil(self.per_page.max(1)).max(1)
	}

	/// Returns `true` when a later page exists.
	pub fn has_next(&self) -> bool {
		self.page < self.total_pages()
	}

	/// Returns `true` when an earlier page exists.
	pub fn has_prev(&self) -> bool {
		self.page > 1
	}

	/// Transforms the items while keeping the paging metadata.
	pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
		Page {
			items: self.items.into_iter().map(f).collect(),
			page: self.page,
			per_page: self.per_page,
			total: self.total,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::api::Category;

	fn categories(names: &[&str]) -> Vec<Category> {
		names
			.iter()
			.enumerate()
			.map(|(i, name)| Category { id: i as i64 + 1, name: (*name).into() })
			.collect()
	}

	#[test]
	fn search_is_case_insensitive_and_counts_matches() {
		let query = ListQuery::default().with_search("  FRUIT ");
		let page = query.apply(categories(&["Fruit", "Dried fruit", "Dairy", "fruitcake"]));

		assert_eq!(page.total, 3);
		assert_eq!(page.items.iter().map(|c| c.id).collect::<Vec<_>>(), [1, 2, 4]);
		assert!(!page.has_next());
		assert!(!page.has_prev());
	}

	#[test]
	fn pages_slice_and_report_neighbours() {
		let names = (0..25).map(|i| format!("c{i:02}")).collect::<Vec<_>>();
		let items = categories(&names.iter().map(String::as_str).collect::<Vec<_>>());
		let page = ListQuery::default().with_page(3).apply(items.clone());

		assert_eq!(page.items.len(), 5);
		assert_eq!(page.total_pages(), 3);
		assert!(page.has_prev());
		assert!(!page.has_next());

		let past_end = ListQuery::default().with_page(9).apply(items);

		assert!(past_end.items.is_empty());
		assert_eq!(past_end.total, 25);
	}

	#[test]
	fn paging_parameters_are_clamped() {
		let query = ListQuery::default().with_page(0).with_per_page(1_000).with_search("   ");

		assert_eq!(query.page, 1);
		assert_eq!(query.per_page, ListQuery::MAX_PER_PAGE);
		assert_eq!(query.search, None);
		assert_eq!(ListQuery::default().with_per_page(0).per_page, 1);
		assert_eq!(Page::<()> { items: vec![], page: 1, per_page: 10, total: 0 }.total_pages(), 1);
	}
}
