//! Typed create, read, update, and delete calls for every [`Resource`].

// self
use crate::{
	_prelude::*,
	api::{
		ApiClient, ApiRequest, EntityId, ListQuery, Page, Resource, ResourceKind, decode,
		expect_success, with_resource,
	},
	http::{HttpResponse, HttpTransport, Method},
	obs::{self, CallKind},
};

/// Collection payloads come either as a bare array or wrapped in a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum Collection<R> {
	Bare(Vec<R>),
	Wrapped { results: Vec<R> },
}
impl<R> Collection<R> {
	fn into_items(self) -> Vec<R> {
		match self {
			Collection::Bare(items) | Collection::Wrapped { results: items } => items,
		}
	}
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Fetches every record of `R`.
	pub async fn list_all<R>(&self) -> Result<Vec<R>>
	where
		R: Resource,
	{
		obs::observe(CallKind::Api, "list", async {
			let response = self.send(ApiRequest::new(Method::Get, R::KIND.path())).await?;

			decode::<Collection<R>>(expect_success(response)?).map(Collection::into_items)
		})
		.await
	}

	/// Fetches the collection and returns the page selected by `query`.
	pub async fn list<R>(&self, query: &ListQuery) -> Result<Page<R>>
	where
		R: Resource,
	{
		Ok(query.apply(self.list_all::<R>().await?))
	}

	/// Fetches one record.
	pub async fn get<R>(&self, id: EntityId) -> Result<R>
	where
		R: Resource,
	{
		obs::observe(CallKind::Api, "get", async {
			let response =
				self.send(ApiRequest::new(Method::Get, R::KIND.record_path(id))).await?;

			decode(found(response, R::KIND, id)?)
		})
		.await
	}

	/// Creates a record from `draft` and returns it as stored by the server.
	pub async fn create<R>(&self, draft: &R::Draft) -> Result<R>
	where
		R: Resource,
	{
		obs::observe(CallKind::Api, "create", async {
			let request = ApiRequest::new(Method::Post, R::KIND.path()).json(draft)?;

			decode(expect_success(self.send(request).await?)?)
		})
		.await
	}

	/// Replaces the writable fields of record `id`.
	pub async fn update<R>(&self, id: EntityId, draft: &R::Draft) -> Result<R>
	where
		R: Resource,
	{
		obs::observe(CallKind::Api, "update", async {
			let request = ApiRequest::new(Method::Put, R::KIND.record_path(id)).json(draft)?;

			decode(found(self.send(request).await?, R::KIND, id)?)
		})
		.await
	}

	/// Deletes record `id` of `R`.
	pub async fn delete<R>(&self, id: EntityId) -> Result<()>
	where
		R: Resource,
	{
		self.delete_kind(R::KIND, id).await
	}

	/// Deletes record `id` from the `kind` collection.
	pub async fn delete_kind(&self, kind: ResourceKind, id: EntityId) -> Result<()> {
		obs::observe(CallKind::Api, "delete", async {
			let response = self.send(ApiRequest::new(Method::Delete, kind.record_path(id))).await?;

			found(response, kind, id).map(|_| ())
		})
		.await
	}

	/// Returns `(id, label)` pairs for every record of `kind`, sorted by label.
	///
	/// Used to populate reference pickers.
	pub async fn options(&self, kind: ResourceKind) -> Result<Vec<(EntityId, String)>> {
		let mut options = with_resource!(kind, |R| {
			self.list_all::<R>()
				.await?
				.into_iter()
				.map(|record| (record.id(), record.label()))
				.collect::<Vec<_>>()
		});

		options.sort_by_cached_key(|(_, label)| label.to_lowercase());

		Ok(options)
	}
}

fn found(response: HttpResponse, resource: ResourceKind, id: EntityId) -> Result<HttpResponse> {
	if response.status == 404 {
		return Err(Error::NotFound { resource, id });
	}

	expect_success(response)
}
