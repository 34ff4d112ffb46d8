//! The two token steps: an OpenID Connect password grant, then the service
//! login that turns the access token into an SFC token. Both tokens travel
//! together on the bundle download.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::{AuthConfig, LoginConfig};
use crate::errors::{ErrorCode, PipelineError, PipelineResult};
use crate::pipeline::{AccessTokenProvider, ServiceTokenProvider};
use crate::retry::{with_retries, TransientError};

#[derive(Debug, thiserror::Error)]
enum TokenError {
	#[error("transport: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("unexpected status {status}: {body}")]
	Status { status: StatusCode, body: String },
	#[error("token response is not valid JSON: {0}")]
	Json(#[from] serde_json::Error),
	#[error("token response has no access_token field")]
	MissingAccessToken,
}

impl TransientError for TokenError {
	fn is_transient(&self) -> bool {
		match self {
			// A reset mid-transfer shows up as a body error.
			TokenError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_body(),
			_ => false,
		}
	}
}

fn check_status(status: StatusCode, body: &str) -> Result<(), TokenError> {
	if status.is_success() {
		return Ok(());
	}
	Err(TokenError::Status {
		status,
		body: body.chars().take(200).collect(),
	})
}

/// Token step 1: password-grant POST against the identity provider.
pub struct OidcTokenClient {
	config: AuthConfig,
	timeout: Duration,
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: Option<String>,
}

impl OidcTokenClient {
	pub fn new(config: AuthConfig, timeout: Duration) -> Self {
		OidcTokenClient { config, timeout }
	}

	async fn request_token(&self) -> Result<String, TokenError> {
		// Runs are hours apart; a fresh client per call keeps no idle state.
		let client = reqwest::Client::builder().timeout(self.timeout).build()?;
		let form = [
			("grant_type", "password"),
			("client_id", self.config.client_id.as_str()),
			("client_secret", self.config.client_secret.expose_secret()),
			("username", self.config.username.as_str()),
			("password", self.config.password.expose_secret()),
		];
		let response = client.post(&self.config.url).form(&form).send().await?;
		let status = response.status();
		let body = response.text().await?;
		check_status(status, &body)?;
		let token: TokenResponse = serde_json::from_str(&body)?;
		token.access_token.ok_or(TokenError::MissingAccessToken)
	}
}

#[async_trait]
impl AccessTokenProvider for OidcTokenClient {
	async fn acquire_token(&self) -> PipelineResult<String> {
		with_retries(|| self.request_token()).await.map_err(PipelineError::wrap(
			ErrorCode::Authentication,
			"access token acquisition failed",
		))
	}
}

/// Token step 2: bearer-authenticated service login; the response body is the
/// SFC token verbatim (it is not JSON).
pub struct ServiceLoginClient {
	config: LoginConfig,
	timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
	border_post_id: i64,
	box_id: i64,
	passenger_control_type: i64,
}

impl ServiceLoginClient {
	pub fn new(config: LoginConfig, timeout: Duration) -> Self {
		ServiceLoginClient { config, timeout }
	}

	async fn request_token(&self, access_token: &str) -> Result<String, TokenError> {
		let client = reqwest::Client::builder().timeout(self.timeout).build()?;
		let body = serde_json::to_string(&LoginRequest {
			border_post_id: self.config.border_post_id,
			box_id: self.config.box_id,
			passenger_control_type: self.config.passenger_control_type,
		})?;
		let response = client
			.post(&self.config.url)
			.bearer_auth(access_token)
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.body(body)
			.send()
			.await?;
		let status = response.status();
		let body = response.text().await?;
		check_status(status, &body)?;
		Ok(body)
	}
}

#[async_trait]
impl ServiceTokenProvider for ServiceLoginClient {
	async fn acquire_token(&self, access_token: &str) -> PipelineResult<String> {
		with_retries(|| self.request_token(access_token))
			.await
			.map_err(PipelineError::wrap(ErrorCode::Authentication, "service login failed"))
	}
}
