//! Record and draft types for every resource collection.

// crates.io
use rust_decimal::Decimal;
use time::Date;
// self
use crate::{
	_prelude::*,
	api::{
		EntityId, FieldKind, FieldReader, FieldSpec, FieldValues, FieldWriter, Form, FormError,
		Resource, ResourceKind, form,
	},
};

time::serde::format_description!(wire_date, Date, "[year]-[month]-[day]");

macro_rules! def_named_resource {
	($record:ident, $draft:ident, $kind:ident, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
		pub struct $record {
			/// Server-assigned identifier.
			pub id: EntityId,
			/// Display name.
			pub name: String,
		}
		impl Resource for $record {
			type Draft = $draft;

			const KIND: ResourceKind = ResourceKind::$kind;

			fn id(&self) -> EntityId {
				self.id
			}

			fn label(&self) -> String {
				self.name.clone()
			}

			fn draft(&self) -> Self::Draft {
				$draft { name: self.name.clone() }
			}
		}

		#[doc = concat!("Writable fields of [`", stringify!($record), "`].")]
		#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
		pub struct $draft {
			/// Display name.
			pub name: String,
		}
		impl Form for $draft {
			const FIELDS: &'static [FieldSpec] = &[FieldSpec::required("name", "Name", FieldKind::Text)];

			fn from_values(values: &FieldValues) -> Result<Self, FormError> {
				let mut reader = FieldReader::new(values);
				let name = reader.text("name");

				reader.finish(Self { name })
			}

			fn to_values(&self) -> FieldValues {
				FieldWriter::default().set("name", &self.name).finish()
			}
		}
	};
}

def_named_resource!(Category, CategoryDraft, Category, "A product category.");
def_named_resource!(Unit, UnitDraft, Unit, "A unit products are measured in.");
def_named_resource!(Manufacturer, ManufacturerDraft, Manufacturer, "A product manufacturer.");
def_named_resource!(Origin, OriginDraft, Origin, "A country or region products come from.");

/// A shop where purchases happen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
	/// Server-assigned identifier.
	pub id: EntityId,
	/// Display name.
	pub name: String,
	/// Street address.
	#[serde(default)]
	pub address: Option<String>,
}
impl Resource for Store {
	type Draft = StoreDraft;

	const KIND: ResourceKind = ResourceKind::Store;

	fn id(&self) -> EntityId {
		self.id
	}

	fn label(&self) -> String {
		match &self.address {
			Some(address) => format!("{} ({address})", self.name),
			None => self.name.clone(),
		}
	}

	fn draft(&self) -> Self::Draft {
		StoreDraft { name: self.name.clone(), address: self.address.clone() }
	}
}

/// Writable fields of [`Store`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDraft {
	/// Display name.
	pub name: String,
	/// Street address.
	pub address: Option<String>,
}
impl Form for StoreDraft {
	const FIELDS: &'static [FieldSpec] = &[
		FieldSpec::required("name", "Name", FieldKind::Text),
		FieldSpec::optional("address", "Address", FieldKind::Text),
	];

	fn from_values(values: &FieldValues) -> Result<Self, FormError> {
		let mut reader = FieldReader::new(values);
		let name = reader.text("name");
		let address = reader.optional_text("address");

		reader.finish(Self { name, address })
	}

	fn to_values(&self) -> FieldValues {
		FieldWriter::default().set("name", &self.name).set_opt("address", self.address.as_ref()).finish()
	}
}

/// A purchasable product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
	/// Server-assigned identifier.
	pub id: EntityId,
	/// Display name.
	pub name: String,
	/// Owning [`Category`].
	pub category_id: EntityId,
	/// [`Unit`] the product is measured in.
	pub unit_id: EntityId,
	/// Optional [`Manufacturer`].
	#[serde(default)]
	pub manufacturer_id: Option<EntityId>,
	/// Optional [`Origin`].
	#[serde(default)]
	pub origin_id: Option<EntityId>,
}
impl Resource for Product {
	type Draft = ProductDraft;

	const KIND: ResourceKind = ResourceKind::Product;

	fn id(&self) -> EntityId {
		self.id
	}

	fn label(&self) -> String {
		self.name.clone()
	}

	fn draft(&self) -> Self::Draft {
		ProductDraft {
			name: self.name.clone(),
			category_id: self.category_id,
			unit_id: self.unit_id,
			manufacturer_id: self.manufacturer_id,
			origin_id: self.origin_id,
		}
	}
}

/// Writable fields of [`Product`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
	/// Display name.
	pub name: String,
	/// Owning [`Category`].
	pub category_id: EntityId,
	/// [`Unit`] the product is measured in.
	pub unit_id: EntityId,
	/// Optional [`Manufacturer`].
	pub manufacturer_id: Option<EntityId>,
	/// Optional [`Origin`].
	pub origin_id: Option<EntityId>,
}
impl Form for ProductDraft {
	const FIELDS: &'static [FieldSpec] = &[
		FieldSpec::required("name", "Name", FieldKind::Text),
		FieldSpec::required("category_id", "Category", FieldKind::Reference(ResourceKind::Category)),
		FieldSpec::required("unit_id", "Unit", FieldKind::Reference(ResourceKind::Unit)),
		FieldSpec::optional(
			"manufacturer_id",
			"Manufacturer",
			FieldKind::Reference(ResourceKind::Manufacturer),
		),
		FieldSpec::optional("origin_id", "Origin", FieldKind::Reference(ResourceKind::Origin)),
	];

	fn from_values(values: &FieldValues) -> Result<Self, FormError> {
		let mut reader = FieldReader::new(values);
		let name = reader.text("name");
		let category_id = reader.reference("category_id");
		let unit_id = reader.reference("unit_id");
		let manufacturer_id = reader.optional_reference("manufacturer_id");
		let origin_id = reader.optional_reference("origin_id");

		reader.finish(Self { name, category_id, unit_id, manufacturer_id, origin_id })
	}

	fn to_values(&self) -> FieldValues {
		FieldWriter::default()
			.set("name", &self.name)
			.set("category_id", self.category_id)
			.set("unit_id", self.unit_id)
			.set_opt("manufacturer_id", self.manufacturer_id)
			.set_opt("origin_id", self.origin_id)
			.finish()
	}
}

/// One purchase of a product at a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shopping {
	/// Server-assigned identifier.
	pub id: EntityId,
	/// Purchased [`Product`].
	pub product_id: EntityId,
	/// [`Store`] the purchase happened at.
	pub store_id: EntityId,
	/// Amount bought, in the product's unit.
	#[serde(serialize_with = "rust_decimal::serde::float::serialize")]
	pub quantity: Decimal,
	/// Total price paid.
	#[serde(serialize_with = "rust_decimal::serde::float::serialize")]
	pub price: Decimal,
	/// Day of purchase.
	#[serde(with = "wire_date")]
	pub purchased_on: Date,
}
impl Resource for Shopping {
	type Draft = ShoppingDraft;

	const KIND: ResourceKind = ResourceKind::Shopping;

	fn id(&self) -> EntityId {
		self.id
	}

	fn label(&self) -> String {
		format!(
			"{}: product {} at store {}, {} for {}",
			form::format_date(self.purchased_on),
			self.product_id,
			self.store_id,
			self.quantity.normalize(),
			self.price.normalize(),
		)
	}

	fn draft(&self) -> Self::Draft {
		ShoppingDraft {
			product_id: self.product_id,
			store_id: self.store_id,
			quantity: self.quantity,
			price: self.price,
			purchased_on: self.purchased_on,
		}
	}
}

/// Writable fields of [`Shopping`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingDraft {
	/// Purchased [`Product`].
	pub product_id: EntityId,
	/// [`Store`] the purchase happened at.
	pub store_id: EntityId,
	/// Amount bought, in the product's unit.
	#[serde(serialize_with = "rust_decimal::serde::float::serialize")]
	pub quantity: Decimal,
	/// Total price paid.
	#[serde(serialize_with = "rust_decimal::serde::float::serialize")]
	pub price: Decimal,
	/// Day of purchase.
	#[serde(with = "wire_date")]
	pub purchased_on: Date,
}
impl Form for ShoppingDraft {
	const FIELDS: &'static [FieldSpec] = &[
		FieldSpec::required("product_id", "Product", FieldKind::Reference(ResourceKind::Product)),
		FieldSpec::required("store_id", "Store", FieldKind::Reference(ResourceKind::Store)),
		FieldSpec::required("quantity", "Quantity", FieldKind::Decimal),
		FieldSpec::required("price", "Price", FieldKind::Decimal),
		FieldSpec::required("purchased_on", "Purchased on", FieldKind::Date),
	];

	fn from_values(values: &FieldValues) -> Result<Self, FormError> {
		let mut reader = FieldReader::new(values);
		let product_id = reader.reference("product_id");
		let store_id = reader.reference("store_id");
		let quantity = reader.decimal("quantity", true);
		let price = reader.decimal("price", false);
		let purchased_on = reader.date("purchased_on");

		reader.finish(Self { product_id, store_id, quantity, price, purchased_on })
	}

	fn to_values(&self) -> FieldValues {
		FieldWriter::default()
			.set("product_id", self.product_id)
			.set("store_id", self.store_id)
			.set("quantity", self.quantity.normalize())
			.set("price", self.price.normalize())
			.set("purchased_on", form::format_date(self.purchased_on))
			.finish()
	}
}

/// Profile of the signed-in account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Server-assigned identifier.
	pub id: EntityId,
	/// Login name.
	pub username: String,
	/// Contact address.
	#[serde(default)]
	pub email: Option<String>,
}
