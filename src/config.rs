//! Layered configuration: defaults, then an optional TOML file, then environment variables.

// std
use std::path::{Path, PathBuf};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenSecret, Username},
	error::ConfigError,
};

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";
const DEFAULT_SLACK_API_BASE_URL: &str = "https://slack.com/api/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOKEN_SKEW_SECS: i64 = 30;
const MAX_TOKEN_SKEW_SECS: i64 = 86_400;
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";

/// Effective configuration shared by the command-line front end and the Slack bot.
#[derive(Clone, Debug)]
pub struct Config {
	/// REST API client settings.
	pub api: ApiConfig,
	/// Session persistence settings.
	pub session: SessionConfig,
	/// Slack bot runtime settings.
	pub bot: BotConfig,
	/// Slack platform credentials.
	pub slack: SlackConfig,
	/// Log output settings.
	pub logging: LoggingConfig,
}
impl Config {
	/// Loads the configuration from `path` (when given) and the process environment.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let contents = match path {
			Some(path) => Some(std::fs::read_to_string(path).map_err(|source| {
				ConfigError::Read { path: path.display().to_string(), source }
			})?),
			None => None,
		};

		Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
	}

	/// Builds the configuration from raw TOML text and an environment lookup.
	///
	/// Environment values override file values; blank environment values are ignored.
	pub fn from_sources(
		toml_text: Option<&str>,
		env: impl Fn(&str) -> Option<String>,
	) -> Result<Self, ConfigError> {
		let file: FileConfig = match toml_text {
			Some(text) => toml::from_str(text)?,
			None => FileConfig::default(),
		};
		let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());
		let base_url = env("GROCERY_API_BASE_URL")
			.or(file.api.base_url)
			.unwrap_or_else(|| DEFAULT_API_BASE_URL.into());
		let mut api = ApiConfig::new(parse_url(&base_url)?);

		if let Some(secs) = file.api.timeout_secs {
			if secs == 0 {
				return Err(ConfigError::InvalidValue {
					key: "api.timeout_secs",
					reason: "must be positive".into(),
				});
			}

			api.timeout = std::time::Duration::from_secs(secs);
		}
		if let Some(secs) = file.api.token_skew_secs {
			api.token_skew = Duration::seconds(secs.clamp(0, MAX_TOKEN_SKEW_SECS));
		}

		api.endpoints = AuthEndpoints {
			login: file.api.login_path.unwrap_or(api.endpoints.login),
			refresh: file.api.refresh_path.unwrap_or(api.endpoints.refresh),
			logout: file.api.logout_path.unwrap_or(api.endpoints.logout),
			me: file.api.me_path.unwrap_or(api.endpoints.me),
		};

		let session = SessionConfig {
			store_path: env("GROCERY_SESSION_PATH")
				.map(PathBuf::from)
				.or(file.session.store_path)
				.or_else(default_store_path),
		};
		let username = env("GROCERY_API_USERNAME")
			.or(file.bot.username)
			.map(|raw| {
				Username::new(&raw).map_err(|e| ConfigError::InvalidValue {
					key: "bot.username",
					reason: e.to_string(),
				})
			})
			.transpose()?;
		let bot = BotConfig {
			username,
			password: env("GROCERY_API_PASSWORD").or(file.bot.password).map(TokenSecret::new),
			bind_address: env("GROCERY_BIND_ADDRESS")
				.or(file.bot.bind_address)
				.unwrap_or_else(|| DEFAULT_BIND_ADDRESS.into()),
		};
		let slack = SlackConfig {
			bot_token: env("SLACK_BOT_TOKEN").or(file.slack.bot_token).map(TokenSecret::new),
			signing_secret: env("SLACK_SIGNING_SECRET")
				.or(file.slack.signing_secret)
				.map(TokenSecret::new),
			api_base_url: parse_url(
				file.slack.api_base_url.as_deref().unwrap_or(DEFAULT_SLACK_API_BASE_URL),
			)?,
		};
		let format = match env("GROCERY_LOG_FORMAT").or(file.logging.format) {
			Some(raw) => raw.parse().map_err(|reason| ConfigError::InvalidValue {
				key: "logging.format",
				reason,
			})?,
			None => LogFormat::Compact,
		};
		let logging = LoggingConfig {
			level: env("GROCERY_LOG_LEVEL").or(file.logging.level).unwrap_or_else(|| "info".into()),
			format,
		};

		Ok(Self { api, session, bot, slack, logging })
	}
}

/// REST API client settings.
#[derive(Clone, Debug)]
pub struct ApiConfig {
	/// Base URL every resource path is joined onto; always ends with `/`.
	pub base_url: Url,
	/// Per-request timeout applied by the default transport.
	pub timeout: std::time::Duration,
	/// Access tokens expiring within this window are refreshed before use.
	pub token_skew: Duration,
	/// Authentication endpoint paths relative to `base_url`.
	pub endpoints: AuthEndpoints,
}
impl ApiConfig {
	/// Creates settings with default timeouts and endpoint paths.
	pub fn new(mut base_url: Url) -> Self {
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		Self {
			base_url,
			timeout: std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS),
			token_skew: Duration::seconds(DEFAULT_TOKEN_SKEW_SECS),
			endpoints: AuthEndpoints::default(),
		}
	}

	/// Resolves `path` against the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url.join(path.trim_start_matches('/')).map_err(|source| ConfigError::InvalidUrl {
			value: path.to_owned(),
			source,
		})
	}
}

/// Authentication endpoint paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthEndpoints {
	/// Username/password exchange.
	pub login: String,
	/// Refresh token exchange.
	pub refresh: String,
	/// Server-side logout.
	pub logout: String,
	/// Current user profile.
	pub me: String,
}
impl Default for AuthEndpoints {
	fn default() -> Self {
		Self {
			login: "auth/login".into(),
			refresh: "auth/refresh".into(),
			logout: "auth/logout".into(),
			me: "auth/me".into(),
		}
	}
}

/// Session persistence settings.
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
	/// JSON file holding the command-line session; `None` keeps it in memory.
	pub store_path: Option<PathBuf>,
}

/// Slack bot runtime settings.
#[derive(Clone, Debug)]
pub struct BotConfig {
	/// Service account used by the bot against the REST API.
	pub username: Option<Username>,
	/// Password of the service account.
	pub password: Option<TokenSecret>,
	/// Socket address the Slack endpoints listen on.
	pub bind_address: String,
}
impl BotConfig {
	/// Returns the service credentials or names the missing key.
	pub fn credentials(&self) -> Result<Credentials, ConfigError> {
		let username = self.username.clone().ok_or(ConfigError::Missing { key: "bot.username" })?;
		let password = self.password.as_ref().ok_or(ConfigError::Missing { key: "bot.password" })?;

		Ok(Credentials::new(username, password.expose()))
	}
}

/// Slack platform credentials.
#[derive(Clone, Debug)]
pub struct SlackConfig {
	/// Bot user OAuth token (`xoxb-…`).
	pub bot_token: Option<TokenSecret>,
	/// Signing secret used to verify inbound requests.
	pub signing_secret: Option<TokenSecret>,
	/// Slack Web API base URL.
	pub api_base_url: Url,
}
impl SlackConfig {
	/// Returns the bot token or a missing-value error.
	pub fn require_bot_token(&self) -> Result<TokenSecret, ConfigError> {
		self.bot_token.clone().ok_or(ConfigError::Missing { key: "slack.bot_token" })
	}

	/// Returns the signing secret or a missing-value error.
	pub fn require_signing_secret(&self) -> Result<TokenSecret, ConfigError> {
		self.signing_secret.clone().ok_or(ConfigError::Missing { key: "slack.signing_secret" })
	}
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
	/// Default level filter; `RUST_LOG` takes precedence.
	pub level: String,
	/// Output format.
	pub format: LogFormat,
}

/// Log line formats supported by the binaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
	/// Single-line human-readable output.
	Compact,
	/// Multi-line human-readable output.
	Pretty,
	/// Newline-delimited JSON.
	Json,
}
impl FromStr for LogFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"compact" => Ok(Self::Compact),
			"pretty" => Ok(Self::Pretty),
			"json" => Ok(Self::Json),
			other => Err(format!("unknown log format `{other}`")),
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
	api: FileApi,
	session: FileSession,
	bot: FileBot,
	slack: FileSlack,
	logging: FileLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileApi {
	base_url: Option<String>,
	timeout_secs: Option<u64>,
	token_skew_secs: Option<i64>,
	login_path: Option<String>,
	refresh_path: Option<String>,
	logout_path: Option<String>,
	me_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSession {
	store_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileBot {
	username: Option<String>,
	password: Option<String>,
	bind_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSlack {
	bot_token: Option<String>,
	signing_secret: Option<String>,
	api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileLogging {
	level: Option<String>,
	format: Option<String>,
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { value: raw.to_owned(), source })
}

fn default_store_path() -> Option<PathBuf> {
	dirs::home_dir().map(|home| home.join(".grocery-admin").join("session.json"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn no_env(_: &str) -> Option<String> {
		None
	}

	#[test]
	fn defaults_apply_without_sources() {
		let config = Config::from_sources(None, no_env).expect("Defaults should be valid.");

		assert_eq!(config.api.base_url.as_str(), DEFAULT_API_BASE_URL);
		assert_eq!(config.api.token_skew, Duration::seconds(30));
		assert_eq!(config.api.endpoints, AuthEndpoints::default());
		assert_eq!(config.bot.bind_address, DEFAULT_BIND_ADDRESS);
		assert_eq!(config.logging.format, LogFormat::Compact);
		assert!(config.slack.require_bot_token().is_err());
	}

	#[test]
	fn environment_overrides_file_values() {
		let toml = r#"
			[api]
			base_url = "https://file.example.com/api"
			refresh_path = "token/refresh/"

			[bot]
			username = "file-bot"
			password = "file-password"

			[logging]
			format = "pretty"
		"#;
		let config = Config::from_sources(Some(toml), |key| match key {
			"GROCERY_API_USERNAME" => Some("env-bot".into()),
			"GROCERY_LOG_FORMAT" => Some("json".into()),
			"SLACK_BOT_TOKEN" => Some("   ".into()),
			_ => None,
		})
		.expect("Layered configuration should be valid.");

		assert_eq!(config.api.base_url.as_str(), "https://file.example.com/api/");
		assert_eq!(config.api.endpoints.refresh, "token/refresh/");
		assert_eq!(config.logging.format, LogFormat::Json);
		assert!(config.slack.bot_token.is_none(), "Blank environment values must be ignored.");

		let credentials = config.bot.credentials().expect("Bot credentials should be complete.");

		assert_eq!(credentials.username.as_ref(), "env-bot");
		assert_eq!(credentials.password.expose(), "file-password");
	}

	#[test]
	fn token_skew_is_clamped() {
		let config =
			Config::from_sources(Some("[api]\ntoken_skew_secs = 9223372036854775807\n"), no_env)
				.expect("Oversized skew should be clamped, not rejected.");

		assert_eq!(config.api.token_skew, Duration::seconds(MAX_TOKEN_SKEW_SECS));

		let config = Config::from_sources(Some("[api]\ntoken_skew_secs = -5\n"), no_env)
			.expect("Negative skew should be clamped.");

		assert_eq!(config.api.token_skew, Duration::ZERO);
	}

	#[test]
	fn default_session_file_lives_in_the_home_directory() {
		let config = Config::from_sources(None, no_env).expect("Defaults should be valid.");

		assert_eq!(
			config.session.store_path,
			dirs::home_dir().map(|home| home.join(".grocery-admin").join("session.json"))
		);
	}

	#[test]
	fn endpoints_join_onto_base_path() {
		let api = ApiConfig::new(Url::parse("https://example.com/v1").expect("URL should parse."));

		assert_eq!(
			api.endpoint("/products").expect("Endpoint should resolve.").as_str(),
			"https://example.com/v1/products"
		);
	}

	#[test]
	fn invalid_values_are_reported_by_key() {
		let err = Config::from_sources(Some("[api]\ntimeout_secs = 0\n"), no_env)
			.expect_err("Zero timeout must be rejected.");

		assert!(matches!(err, ConfigError::InvalidValue { key: "api.timeout_secs", .. }));

		let err = Config::from_sources(Some("[logging]\nformat = \"xml\"\n"), no_env)
			.expect_err("Unknown log formats must be rejected.");

		assert!(matches!(err, ConfigError::InvalidValue { key: "logging.format", .. }));
		assert!(matches!(
			Config::from_sources(Some("[unknown]\n"), no_env),
			Err(ConfigError::Parse(_))
		));
		assert!(matches!(
			Config::from_sources(None, |_| None).map(|c| c.bot.credentials()),
			Ok(Err(ConfigError::Missing { key: "bot.username" }))
		));
	}
}
