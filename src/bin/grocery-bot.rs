//! Slack bot serving the grocery admin home tab and modals.
//!
//! Configuration comes from the file named by `GROCERY_CONFIG` (optional) and the environment.

// std
use std::{error::Error as StdError, path::PathBuf, process::ExitCode, sync::Arc};
// self
use grocery_admin::{
	api::ApiClient,
	auth::SessionManager,
	config::Config,
	error::ConfigError,
	http::ReqwestTransport,
	obs,
	slack::{ReqwestSlackApi, SlackBot, server, signature::SignatureVerifier},
};

#[tokio::main]
async fn main() -> ExitCode {
	let path = std::env::var_os("GROCERY_CONFIG").map(PathBuf::from);
	let config = match Config::load(path.as_deref()) {
		Ok(config) => config,
		Err(err) => {
			eprintln!("grocery-bot: {err}");

			return ExitCode::FAILURE;
		},
	};

	obs::init_logging(&config.logging);

	match run(config).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			tracing::error!(error = %err, "grocery-bot stopped");

			ExitCode::FAILURE
		},
	}
}

async fn run(config: Config) -> Result<(), Box<dyn StdError>> {
	let credentials = config.bot.credentials()?;
	let verifier = SignatureVerifier::new(config.slack.require_signing_secret()?);
	let http = reqwest::Client::builder()
		.timeout(config.api.timeout)
		.build()
		.map_err(ConfigError::from)?;
	let slack = ReqwestSlackApi::new(
		http,
		config.slack.api_base_url.clone(),
		config.slack.require_bot_token()?,
	);
	let client = ApiClient::new(config.api, Arc::new(SessionManager::new()))?;

	if let Err(err) = client.ensure_login(&credentials).await {
		tracing::warn!(error = %err, "initial API login failed; retrying on first interaction");
	}

	let bot: Arc<SlackBot<ReqwestTransport, ReqwestSlackApi>> =
		Arc::new(SlackBot::new(client, slack).with_credentials(credentials));
	let watcher = bot.clone();

	tokio::spawn(async move { watcher.watch_session().await });

	server::serve(&config.bot.bind_address, bot, verifier).await?;

	Ok(())
}
