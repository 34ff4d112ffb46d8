use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use secrecy::SecretString;

/// Fully parsed daemon configuration. Secrets are held behind
/// [`SecretString`] so neither `Debug` nor the startup summary can leak them.
#[derive(Clone)]
pub struct Config {
	pub auth: AuthConfig,
	pub login: LoginConfig,
	pub download_url: String,
	pub database_dsn: SecretString,
	pub interval: Duration,
	pub http_timeout: Duration,
	pub run_on_startup: bool,
}

/// OpenID Connect password-grant credentials (token step 1).
#[derive(Clone)]
pub struct AuthConfig {
	pub url: String,
	pub client_id: String,
	pub client_secret: SecretString,
	pub username: String,
	pub password: SecretString,
}

/// Service-login parameters (token step 2). The three ids are fixed per
/// deployment by the upstream service.
#[derive(Clone)]
pub struct LoginConfig {
	pub url: String,
	pub border_post_id: i64,
	pub box_id: i64,
	pub passenger_control_type: i64,
}

impl fmt::Display for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"auth_url={} login_url={} download_url={} interval={}h timeout={}s run_on_startup={}",
			self.auth.url,
			self.login.url,
			self.download_url,
			self.interval.as_secs() / 3600,
			self.http_timeout.as_secs(),
			self.run_on_startup,
		)
	}
}

/// Read the whole configuration from the environment. Any missing or invalid
/// value is a startup failure; the caller exits non-zero.
pub fn parse_config() -> anyhow::Result<Config> {
	let auth = AuthConfig {
		url: validate_url(require("AUTH_URL")?)?,
		client_id: require("AUTH_CLIENT_ID")?,
		client_secret: require_secret("AUTH_CLIENT_SECRET")?,
		username: require("AUTH_USERNAME")?,
		password: require_secret("AUTH_PASSWORD")?,
	};
	let login = LoginConfig {
		url: validate_url(require("LOGIN_URL")?)?,
		border_post_id: parse("LOGIN_BORDER_POST_ID")?.context("LOGIN_BORDER_POST_ID is required")?,
		box_id: parse("LOGIN_BOX_ID")?.context("LOGIN_BOX_ID is required")?,
		passenger_control_type: parse("LOGIN_PASSENGER_CONTROL_TYPE")?
			.context("LOGIN_PASSENGER_CONTROL_TYPE is required")?,
	};
	let interval_hours: u64 = parse_default("SCHEDULER_INTERVAL_HOURS", 6)?;
	if interval_hours == 0 {
		anyhow::bail!("SCHEDULER_INTERVAL_HOURS must be at least 1");
	}
	Ok(Config {
		auth,
		login,
		download_url: validate_url(require("DOWNLOAD_URL")?)?,
		database_dsn: require_secret("DATABASE_DSN")?,
		interval: Duration::from_secs(interval_hours * 3600),
		http_timeout: Duration::from_secs(parse_default("HTTP_TIMEOUT_SECONDS", 60)?),
		run_on_startup: parse_default("RUN_ON_STARTUP", true)?,
	})
}

fn parse<T: FromStr>(env: &str) -> anyhow::Result<Option<T>>
where
	<T as FromStr>::Err: fmt::Display,
{
	match env::var(env) {
		Ok(val) if val.is_empty() => Ok(None),
		Ok(val) => val
			.parse()
			.map(Some)
			.map_err(|e: <T as FromStr>::Err| anyhow::anyhow!("invalid env var {env}={val} ({e})")),
		Err(_) => Ok(None),
	}
}

fn parse_default<T: FromStr>(env: &str, default: T) -> anyhow::Result<T>
where
	<T as FromStr>::Err: fmt::Display,
{
	parse(env).map(|v| v.unwrap_or(default))
}

fn require(env: &str) -> anyhow::Result<String> {
	parse::<String>(env)?.with_context(|| format!("{env} is required"))
}

fn require_secret(env: &str) -> anyhow::Result<SecretString> {
	require(env).map(SecretString::from)
}

// Parse the URL up front so a bad endpoint fails at startup, not on the
// first scheduled run.
fn validate_url(url: String) -> anyhow::Result<String> {
	reqwest::Url::parse(&url).with_context(|| format!("invalid URL {url}"))?;
	Ok(url)
}
