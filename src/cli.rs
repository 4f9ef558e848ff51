//! `grocery-admin` command-line front end.
//!
//! Every command prints one JSON document, on stdout when it succeeds and on stderr when it
//! fails. The session lives in the configured store file so `login` carries over to later
//! invocations, and refreshed tokens are written back to it.

// std
use std::{path::PathBuf, process::ExitCode};
// crates.io
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	api::{
		ApiClient, EntityId, FieldValues, Form, FormError, ListQuery, Resource, ResourceKind,
		with_resource,
	},
	auth::{Credentials, SessionManager, Username},
	config::Config,
	error::ConfigError,
	http::HttpTransport,
	obs,
	store::{FileStore, SessionStore},
};

/// Parsed command line.
#[derive(Debug, Parser)]
#[command(
	name = "grocery-admin",
	version,
	about = "Manage grocery expense tracking records from the terminal",
	after_help = "Examples:\n  grocery-admin login --username admin\n  grocery-admin list products --search milk\n  grocery-admin create store --field name=Corner --field address=Main St"
)]
pub struct Cli {
	/// TOML configuration file.
	#[arg(long, global = true, env = "GROCERY_CONFIG")]
	pub config: Option<PathBuf>,
	/// Command to run.
	#[command(subcommand)]
	pub command: Command,
}
impl Cli {
	/// Runs the parsed command and maps the outcome to a process exit code.
	pub async fn run(self) -> ExitCode {
		match self.execute().await {
			Ok(output) => {
				println!("{output:#}");

				ExitCode::SUCCESS
			},
			Err(err) => {
				#[cfg(feature = "tracing")]
				tracing::debug!(error = ?err, "command failed");

				let output = json!({ "error": err.to_string() });

				eprintln!("{output:#}");

				ExitCode::FAILURE
			},
		}
	}

	async fn execute(self) -> Result<Value, CliError> {
		let config = Config::load(self.config.as_deref())?;

		obs::init_logging(&config.logging);

		let session = match &config.session.store_path {
			Some(path) => {
				let store: Arc<dyn SessionStore> = Arc::new(FileStore::open(path)?);

				SessionManager::with_store(store)
			},
			None => SessionManager::new(),
		};
		let session = Arc::new(session);

		session.restore().await?;

		let client = ApiClient::new(config.api, session)?;

		execute(&client, self.command).await
	}
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
	/// Log in and store the session.
	Login {
		/// Account name.
		#[arg(long)]
		username: Username,
		/// Account password.
		#[arg(long, env = "GROCERY_API_PASSWORD", hide_env_values = true)]
		password: Option<String>,
	},
	/// Log out and forget the stored session.
	Logout,
	/// Show the logged-in user.
	Whoami,
	/// List one page of records.
	List {
		/// Resource to list.
		resource: ResourceKind,
		/// Case-insensitive label filter.
		#[arg(long)]
		search: Option<String>,
		/// 1-based page number.
		#[arg(long, default_value_t = 1)]
		page: usize,
		/// Records per page.
		#[arg(long, default_value_t = ListQuery::DEFAULT_PER_PAGE)]
		per_page: usize,
	},
	/// Show one record.
	Get {
		/// Resource of the record.
		resource: ResourceKind,
		/// Record identifier.
		id: EntityId,
	},
	/// Create a record.
	Create {
		/// Resource to create.
		resource: ResourceKind,
		/// Field values.
		#[command(flatten)]
		fields: FieldArgs,
	},
	/// Update a record; fields not given keep their current value.
	Update {
		/// Resource of the record.
		resource: ResourceKind,
		/// Record identifier.
		id: EntityId,
		/// Field values to change.
		#[command(flatten)]
		fields: FieldArgs,
	},
	/// Delete a record.
	Delete {
		/// Resource of the record.
		resource: ResourceKind,
		/// Record identifier.
		id: EntityId,
	},
}

/// Repeated `--field key=value` input.
#[derive(Debug, Default, Args)]
pub struct FieldArgs {
	/// Field value as `key=value`; repeat for every field.
	#[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
	pub fields: Vec<(String, String)>,
}
impl FieldArgs {
	fn into_values(self, kind: ResourceKind) -> Result<FieldValues, CliError> {
		let known = with_resource!(kind, |R| <<R as Resource>::Draft as Form>::FIELDS);
		let mut values = FieldValues::new();

		for (key, value) in self.fields {
			if !known.iter().any(|field| field.key == key) {
				let expected = known.iter().map(|field| field.key).collect::<Vec<_>>().join(", ");

				return Err(CliError::Usage(format!(
					"{kind} has no field `{key}`; expected one of: {expected}"
				)));
			}

			values.insert(key, value);
		}

		Ok(values)
	}
}

/// Failures reported by the command-line front end.
#[derive(Debug, ThisError)]
pub enum CliError {
	/// The API call or session handling failed.
	#[error(transparent)]
	Client(#[from] Error),
	/// The configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The session store could not be opened.
	#[error(transparent)]
	Store(#[from] crate::store::StoreError),
	/// The command line is inconsistent.
	#[error("{0}.")]
	Usage(String),
}

/// Runs `command` against `client` and returns the JSON document to print.
pub async fn execute<T>(client: &ApiClient<T>, command: Command) -> Result<Value, CliError>
where
	T: ?Sized + HttpTransport,
{
	let output = match command {
		Command::Login { username, password } => {
			let password = password.ok_or_else(|| {
				CliError::Usage("--password or GROCERY_API_PASSWORD is required".into())
			})?;
			let user = client.login(&Credentials::new(username, password)).await?;

			to_json(&user)?
		},
		Command::Logout => {
			client.logout().await?;

			json!({ "logged_out": true })
		},
		Command::Whoami => to_json(&client.current_user().await?)?,
		Command::List { resource, search, page, per_page } => {
			let mut query = ListQuery::default().with_page(page).with_per_page(per_page);

			if let Some(search) = search {
				query = query.with_search(search);
			}

			with_resource!(resource, |R| to_json(&client.list::<R>(&query).await?)?)
		},
		Command::Get { resource, id } =>
			with_resource!(resource, |R| to_json(&client.get::<R>(id).await?)?),
		Command::Create { resource, fields } => {
			let values = fields.into_values(resource)?;

			with_resource!(resource, |R| {
				let draft = <R as Resource>::Draft::from_values(&values)?;

				to_json(&client.create::<R>(&draft).await?)?
			})
		},
		Command::Update { resource, id, fields } => {
			let changes = fields.into_values(resource)?;

			with_resource!(resource, |R| {
				let mut values = client.get::<R>(id).await?.draft().to_values();

				values.extend(changes);

				let draft = <R as Resource>::Draft::from_values(&values)?;

				to_json(&client.update::<R>(id, &draft).await?)?
			})
		},
		Command::Delete { resource, id } => {
			client.delete_kind(resource, id).await?;

			json!({ "deleted": { "resource": resource.as_str(), "id": id } })
		},
	};

	Ok(output)
}

fn to_json(value: &impl Serialize) -> Result<Value, CliError> {
	serde_json::to_value(value).map_err(|e| CliError::from(ConfigError::Serialize(e)))
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
	let (key, value) =
		raw.split_once('=').ok_or_else(|| format!("`{raw}` is not in KEY=VALUE form"))?;
	let key = key.trim();

	if key.is_empty() {
		return Err(format!("`{raw}` has an empty key"));
	}

	Ok((key.to_owned(), value.to_owned()))
}

impl From<FormError> for CliError {
	fn from(err: FormError) -> Self {
		Self::Client(Error::Form(err))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn commands_parse_with_fields_and_aliases() {
		let cli = Cli::try_parse_from([
			"grocery-admin",
			"update",
			"products",
			"12",
			"--field",
			"name=Oat milk",
			"--field",
			"origin_id=",
		])
		.expect("Update command should parse.");

		match cli.command {
			Command::Update { resource, id, fields } => {
				assert_eq!(resource, ResourceKind::Product);
				assert_eq!(id, 12);
				assert_eq!(
					fields.fields,
					vec![("name".into(), "Oat milk".into()), ("origin_id".into(), String::new())]
				);
			},
			other => panic!("Unexpected command: {other:?}"),
		}
	}

	#[test]
	fn malformed_input_is_rejected() {
		assert!(Cli::try_parse_from(["grocery-admin", "list", "pets"]).is_err());
		assert!(
			Cli::try_parse_from(["grocery-admin", "create", "unit", "--field", "name"]).is_err()
		);

		let err = FieldArgs { fields: vec![("colour".into(), "red".into())] }
			.into_values(ResourceKind::Unit)
			.expect_err("Unknown keys must be rejected.");

		assert_eq!(err.to_string(), "unit has no field `colour`; expected one of: name.");
	}
}
