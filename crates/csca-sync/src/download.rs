//! Authenticated download of the Master List bundle. Both tokens ride on the
//! same request: the OIDC access token as the standard bearer header, the SFC
//! token under `x-sfc-authorization`. The body is returned as raw bytes; the
//! parser owns all judgement about what they contain.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

use crate::errors::{ErrorCode, PipelineError, PipelineResult};
use crate::model::AuthCredentials;
use crate::pipeline::BundleDownloader;
use crate::retry::{with_retries, TransientError};

const SFC_AUTHORIZATION: &str = "x-sfc-authorization";

#[derive(Debug, thiserror::Error)]
enum DownloadError {
	#[error("transport: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("unexpected status {status}: {body}")]
	Status { status: StatusCode, body: String },
}

impl TransientError for DownloadError {
	fn is_transient(&self) -> bool {
		match self {
			DownloadError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_body(),
			DownloadError::Status { .. } => false,
		}
	}
}

pub struct Downloader {
	url: String,
	timeout: Duration,
}

impl Downloader {
	pub fn new(url: String, timeout: Duration) -> Self {
		Downloader { url, timeout }
	}

	async fn fetch(&self, credentials: &AuthCredentials) -> Result<Bytes, DownloadError> {
		let client = reqwest::Client::builder().timeout(self.timeout).build()?;
		let response = client
			.get(&self.url)
			.bearer_auth(&credentials.access_token)
			.header(SFC_AUTHORIZATION, format!("Bearer {}", credentials.sfc_token))
			.send()
			.await?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(DownloadError::Status {
				status,
				body: body.chars().take(200).collect(),
			});
		}
		Ok(response.bytes().await?)
	}
}

#[async_trait]
impl BundleDownloader for Downloader {
	async fn download(&self, credentials: &AuthCredentials) -> PipelineResult<Bytes> {
		with_retries(|| self.fetch(credentials)).await.map_err(PipelineError::wrap(
			ErrorCode::ExternalService,
			"master list download failed",
		))
	}
}
