//! Resource kinds and the trait tying each record type to its draft and REST path.

// self
use crate::{_prelude::*, api::Form};

/// Server-assigned record identifier.
pub type EntityId = i64;

/// The seven administrable resource collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
	/// Product categories.
	Category,
	/// Measurement units.
	Unit,
	/// Product manufacturers.
	Manufacturer,
	/// Countries or regions of origin.
	Origin,
	/// Shops where purchases happen.
	Store,
	/// Purchasable products.
	Product,
	/// Individual purchase records.
	Shopping,
}
impl ResourceKind {
	/// Every kind, in navigation order.
	pub const ALL: [ResourceKind; 7] = [
		ResourceKind::Shopping,
		ResourceKind::Product,
		ResourceKind::Store,
		ResourceKind::Category,
		ResourceKind::Unit,
		ResourceKind::Manufacturer,
		ResourceKind::Origin,
	];

	/// Singular lowercase name used in messages and action identifiers.
	pub const fn as_str(self) -> &'static str {
		match self {
			ResourceKind::Category => "category",
			ResourceKind::Unit => "unit",
			ResourceKind::Manufacturer => "manufacturer",
			ResourceKind::Origin => "origin",
			ResourceKind::Store => "store",
			ResourceKind::Product => "product",
			ResourceKind::Shopping => "shopping",
		}
	}

	/// Collection path relative to the API base URL.
	pub const fn path(self) -> &'static str {
		match self {
			ResourceKind::Category => "categories",
			ResourceKind::Unit => "units",
			ResourceKind::Manufacturer => "manufacturers",
			ResourceKind::Origin => "origins",
			ResourceKind::Store => "stores",
			ResourceKind::Product => "products",
			ResourceKind::Shopping => "shoppings",
		}
	}

	/// Human-facing plural title.
	pub const fn title(self) -> &'static str {
		match self {
			ResourceKind::Category => "Categories",
			ResourceKind::Unit => "Units",
			ResourceKind::Manufacturer => "Manufacturers",
			ResourceKind::Origin => "Origins",
			ResourceKind::Store => "Stores",
			ResourceKind::Product => "Products",
			ResourceKind::Shopping => "Shoppings",
		}
	}

	/// Path of a single record.
	pub fn record_path(self, id: EntityId) -> String {
		format!("{}/{id}", self.path())
	}
}
impl Display for ResourceKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ResourceKind {
	type Err = UnknownResource;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let needle = s.trim().to_ascii_lowercase();

		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == needle || kind.path() == needle)
			.ok_or_else(|| UnknownResource(s.to_owned()))
	}
}

/// Raised when a resource name cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown resource `{0}`.")]
pub struct UnknownResource(pub String);

/// A record type served from one REST collection.
pub trait Resource
where
	Self: 'static + Clone + Debug + Send + Sync + Serialize + DeserializeOwned,
{
	/// Collection the record lives in.
	const KIND: ResourceKind;

	/// Writable subset submitted on create and update.
	type Draft: Form;

	/// Server-assigned identifier.
	fn id(&self) -> EntityId;

	/// Display label used in lists, selects, and search.
	fn label(&self) -> String;

	/// Copies the writable fields into a draft, used to prefill edit forms.
	fn draft(&self) -> Self::Draft;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_singular_and_plural_names() {
		assert_eq!("product".parse(), Ok(ResourceKind::Product));
		assert_eq!("Categories".parse(), Ok(ResourceKind::Category));
		assert_eq!(" shoppings ".parse(), Ok(ResourceKind::Shopping));
		assert_eq!(
			"vegetables".parse::<ResourceKind>(),
			Err(UnknownResource("vegetables".into()))
		);
	}

	#[test]
	fn record_paths_join_the_id() {
		assert_eq!(ResourceKind::Origin.record_path(9), "origins/9");
		assert_eq!(ResourceKind::ALL.len(), 7);
	}
}
