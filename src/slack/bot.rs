//! Interaction dispatcher tying Slack surfaces to the REST API.
//!
//! The bot keeps one navigation state (resource and page) per Slack user, renders the home tab
//! from it, and translates button presses and modal submissions into API calls. It logs in with
//! its service credentials before the first call and again whenever the session was lost.

// self
use crate::{
	_prelude::*,
	api::{
		ApiClient, EntityId, FieldKind, FieldValues, Form, FormError, ListQuery, Page, Resource,
		ResourceKind, with_resource,
	},
	auth::{Credentials, SessionEvent, SlackUserId},
	http::HttpTransport,
	slack::{
		Action, BlockActions, Event, EventEnvelope, FormMetadata, Interaction, SlackApi,
		SlackError, ViewSubmission,
		views::{self, FORM_CALLBACK_ID, ReferenceOptions, Row},
	},
};

/// Where a user currently is on the home tab.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HomeState {
	/// Listed resource.
	pub kind: ResourceKind,
	/// 1-based page.
	pub page: usize,
}
impl Default for HomeState {
	fn default() -> Self {
		Self { kind: ResourceKind::ALL[0], page: 1 }
	}
}

/// Synchronous answer to an Events API request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventReply {
	/// Echo of a URL verification challenge.
	Challenge(String),
	/// Plain acknowledgement.
	Ack,
}

/// Synchronous answer to an interaction request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionReply {
	/// Keep the modal open and show these messages under the keyed blocks.
	Errors {
		/// Message per input block identifier.
		errors: BTreeMap<String, String>,
	},
	/// Plain acknowledgement; a submitted modal closes.
	Ack,
}

/// Slack bot over an API client and a Web API implementation.
pub struct SlackBot<T, S>
where
	T: ?Sized + HttpTransport,
	S: ?Sized + SlackApi,
{
	client: ApiClient<T>,
	slack: Arc<S>,
	credentials: Option<Credentials>,
	homes: Mutex<HashMap<SlackUserId, HomeState>>,
	per_page: usize,
}
impl<T, S> SlackBot<T, S>
where
	T: ?Sized + HttpTransport,
	S: ?Sized + SlackApi,
{
	/// Creates a bot that relies on whatever session `client` already holds.
	pub fn new(client: ApiClient<T>, slack: impl Into<Arc<S>>) -> Self {
		Self {
			client,
			slack: slack.into(),
			credentials: None,
			homes: Default::default(),
			per_page: ListQuery::DEFAULT_PER_PAGE,
		}
	}

	/// Logs in with `credentials` whenever no session is active.
	pub fn with_credentials(mut self, credentials: Credentials) -> Self {
		self.credentials = Some(credentials);

		self
	}

	/// Overrides the number of rows per home tab page.
	pub fn with_per_page(mut self, per_page: usize) -> Self {
		self.per_page = per_page.clamp(1, ListQuery::MAX_PER_PAGE);

		self
	}

	/// API client the bot calls through.
	pub fn client(&self) -> &ApiClient<T> {
		&self.client
	}

	/// Web API implementation views are sent through.
	pub fn slack(&self) -> &Arc<S> {
		&self.slack
	}

	/// Current navigation state of `user`.
	pub fn home_state(&self, user: &SlackUserId) -> HomeState {
		self.homes.lock().get(user).copied().unwrap_or_default()
	}

	/// Handles an Events API envelope.
	pub async fn handle_event(&self, envelope: EventEnvelope) -> Result<EventReply, SlackError> {
		match envelope {
			EventEnvelope::UrlVerification { challenge } => Ok(EventReply::Challenge(challenge)),
			EventEnvelope::EventCallback { event: Event::AppHomeOpened { user, tab } } => {
				if tab.as_deref().is_none_or(|tab| tab == "home") {
					self.publish_home(&user).await?;
				}

				Ok(EventReply::Ack)
			},
			EventEnvelope::EventCallback { event: Event::Unsupported } | EventEnvelope::Unsupported =>
				Ok(EventReply::Ack),
		}
	}

	/// Handles a decoded interaction payload.
	pub async fn handle_interaction(
		&self,
		interaction: Interaction,
	) -> Result<InteractionReply, SlackError> {
		match interaction {
			Interaction::BlockActions(actions) => {
				self.handle_actions(actions).await?;

				Ok(InteractionReply::Ack)
			},
			Interaction::ViewSubmission(submission) => self.handle_submission(submission).await,
			Interaction::Unsupported => Ok(InteractionReply::Ack),
		}
	}

	/// Renders and publishes `user`'s home tab.
	///
	/// A failing list call is rendered into the tab instead of being returned.
	pub async fn publish_home(&self, user: &SlackUserId) -> Result<(), SlackError> {
		let state = self.home_state(user);
		let listing = self.load_rows(state).await;
		let view = match &listing {
			Ok(page) => views::home_view(state.kind, Ok(page)),
			Err(err) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(kind = %state.kind, error = %err, "home tab list failed");

				views::home_view(state.kind, Err(&err.to_string()))
			},
		};

		self.slack.publish_view(user, &view).await
	}

	/// Logs in again whenever the session reports lost authentication.
	///
	/// Runs until the session's event channel closes.
	pub async fn watch_session(&self) {
		let mut events = self.client.session().subscribe();

		loop {
			match events.recv().await {
				Ok(SessionEvent::AuthenticationLost { reason }) => {
					#[cfg(feature = "tracing")]
					tracing::warn!(%reason, "bot session lost; logging in again");
					#[cfg(not(feature = "tracing"))]
					let _ = reason;

					if let Err(err) = self.ensure_session().await {
						#[cfg(feature = "tracing")]
						tracing::error!(error = %err, "bot login failed");
						#[cfg(not(feature = "tracing"))]
						let _ = err;
					}
				},
				Ok(_) => {},
				Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {},
				Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
			}
		}
	}

	async fn handle_actions(&self, actions: BlockActions) -> Result<(), SlackError> {
		let user = actions.user.id;

		for event in actions.actions {
			let Some(action) = Action::parse(&event.action_id, event.value.as_deref()) else {
				#[cfg(feature = "tracing")]
				tracing::debug!(action_id = %event.action_id, "ignoring unknown action");

				continue;
			};

			#[cfg(feature = "tracing")]
			tracing::debug!(user = %user, ?action, "handling action");

			match action {
				Action::Navigate(kind) => {
					self.set_home(&user, HomeState { kind, page: 1 });
					self.publish_home(&user).await?;
				},
				Action::Page(kind, page) => {
					self.set_home(&user, HomeState { kind, page });
					self.publish_home(&user).await?;
				},
				Action::Add(kind) => {
					let metadata = FormMetadata { kind, id: None, page: self.home_state(&user).page };

					self.open_form(&actions.trigger_id, metadata, Default::default()).await?;
				},
				Action::Edit(kind, id) => {
					let values = self
						.call(|| async move {
							with_resource!(kind, |R| {
								self.client.get::<R>(id).await.map(|record| record.draft().to_values())
							})
						})
						.await?;
					let metadata = FormMetadata { kind, id: Some(id), page: self.home_state(&user).page };

					self.open_form(&actions.trigger_id, metadata, values).await?;
				},
				Action::Delete(kind, id) => {
					let deleted = self.call(|| self.client.delete_kind(kind, id)).await;

					if let Err(err) = deleted {
						if !matches!(err, Error::NotFound { .. }) {
							return Err(err.into());
						}

						#[cfg(feature = "tracing")]
						tracing::debug!(%kind, id, "record was already deleted");
					}

					self.publish_home(&user).await?;
				},
			}
		}

		Ok(())
	}

	async fn handle_submission(
		&self,
		submission: ViewSubmission,
	) -> Result<InteractionReply, SlackError> {
		if submission.view.callback_id != FORM_CALLBACK_ID {
			return Ok(InteractionReply::Ack);
		}

		let metadata = FormMetadata::decode(&submission.view.private_metadata)?;
		let values = submission.view.state.field_values();
		let outcome = with_resource!(metadata.kind, |R| {
			self.save::<R>(metadata.id, &values).await
		});

		match outcome {
			Ok(()) => {},
			Err(Error::Form(FormError { errors })) =>
				return Ok(InteractionReply::Errors { errors }),
			Err(err) if err.is_auth_failure() => return Err(err.into()),
			Err(err) => {
				let field = with_resource!(metadata.kind, |R| {
					<<R as Resource>::Draft as Form>::FIELDS.first().map(|field| field.key)
				});
				let errors = BTreeMap::from([(
					field.unwrap_or_default().to_owned(),
					format!("Could not save: {err}"),
				)]);

				return Ok(InteractionReply::Errors { errors });
			},
		}

		let user = submission.user.id;

		self.set_home(&user, HomeState { kind: metadata.kind, page: metadata.page.max(1) });
		self.publish_home(&user).await?;

		Ok(InteractionReply::Ack)
	}

	async fn save<R>(&self, id: Option<EntityId>, values: &FieldValues) -> Result<()>
	where
		R: Resource,
	{
		let draft = R::Draft::from_values(values)?;
		let draft = &draft;

		self.call(|| async move {
			match id {
				Some(id) => self.client.update::<R>(id, draft).await.map(|_| ()),
				None => self.client.create::<R>(draft).await.map(|_| ()),
			}
		})
		.await
	}

	async fn open_form(
		&self,
		trigger_id: &str,
		metadata: FormMetadata,
		values: FieldValues,
	) -> Result<(), SlackError> {
		let fields = with_resource!(metadata.kind, |R| <<R as Resource>::Draft as Form>::FIELDS);
		let mut options = ReferenceOptions::new();

		for field in fields {
			let FieldKind::Reference(kind) = field.kind else {
				continue;
			};

			if !options.contains_key(&kind) {
				let choices = self.call(|| self.client.options(kind)).await?;

				options.insert(kind, choices);
			}
		}

		let view = views::form_view(&metadata, fields, &values, &options)?;

		self.slack.open_view(trigger_id, &view).await
	}

	async fn load_rows(&self, state: HomeState) -> Result<Page<Row>> {
		let query = ListQuery::default().with_page(state.page).with_per_page(self.per_page);
		let query = &query;

		self.call(|| async move {
			with_resource!(state.kind, |R| {
				self.client.list::<R>(query).await.map(|page| {
					page.map(|record| Row { id: record.id(), label: record.label() })
				})
			})
		})
		.await
	}

	/// Runs `op` with a live session, logging in again and retrying once if it was lost.
	async fn call<F, Fut, R>(&self, op: F) -> Result<R>
	where
		F: Fn() -> Fut,
		Fut: Future<Output = Result<R>>,
	{
		self.ensure_session().await?;

		match op().await {
			Err(err) if err.is_auth_failure() && self.credentials.is_some() => {
				#[cfg(feature = "tracing")]
				tracing::info!(error = %err, "API session rejected; logging in again");

				self.ensure_session().await?;

				op().await
			},
			result => result,
		}
	}

	async fn ensure_session(&self) -> Result<()> {
		match &self.credentials {
			Some(credentials) => self.client.ensure_login(credentials).await,
			None => Ok(()),
		}
	}

	fn set_home(&self, user: &SlackUserId, state: HomeState) {
		self.homes.lock().insert(user.clone(), state);
	}
}
impl<T, S> Debug for SlackBot<T, S>
where
	T: ?Sized + HttpTransport,
	S: ?Sized + SlackApi,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SlackBot")
			.field("client", &self.client)
			.field("has_credentials", &self.credentials.is_some())
			.field("users", &self.homes.lock().len())
			.finish()
	}
}
