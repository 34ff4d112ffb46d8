//! The stage chain. `run_pipeline` is the only place the stages meet: it
//! threads each success value into the next stage and lets the first failure
//! short-circuit everything behind it. It performs no I/O of its own; the
//! five injected collaborators do.

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::PipelineResult;
use crate::model::{AuthCredentials, MasterListPayload};

/// Stage 1: OIDC password-grant token.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
	async fn acquire_token(&self) -> PipelineResult<String>;
}

/// Stage 2: service login, bearer of the stage-1 token.
#[async_trait]
pub trait ServiceTokenProvider: Send + Sync {
	async fn acquire_token(&self, access_token: &str) -> PipelineResult<String>;
}

/// Stage 3: authenticated bundle download under both tokens.
#[async_trait]
pub trait BundleDownloader: Send + Sync {
	async fn download(&self, credentials: &AuthCredentials) -> PipelineResult<Bytes>;
}

/// Stage 4: CMS envelope decode.
pub trait BundleParser: Send + Sync {
	fn parse(&self, raw: &[u8]) -> PipelineResult<MasterListPayload>;
}

/// Stage 5: transactional replace of the certificate store. Returns rows
/// inserted.
#[async_trait]
pub trait CertificateStore: Send + Sync {
	async fn store(&self, payload: &MasterListPayload) -> PipelineResult<u64>;
}

/// Run one ingestion pass. A `Failure` from any stage is returned as-is and
/// no later stage is invoked.
pub async fn run_pipeline(
	access_tokens: &dyn AccessTokenProvider,
	service_tokens: &dyn ServiceTokenProvider,
	downloader: &dyn BundleDownloader,
	parser: &dyn BundleParser,
	store: &dyn CertificateStore,
) -> PipelineResult<u64> {
	let access_token = access_tokens.acquire_token().await?;
	let sfc_token = service_tokens.acquire_token(&access_token).await?;
	let credentials = AuthCredentials {
		access_token,
		sfc_token,
	};
	let raw = downloader.download(&credentials).await?;
	let payload = parser.parse(&raw)?;
	store.store(&payload).await
}
