//! Composition root: builds the concrete stage adapters from configuration
//! and hands the assembled pipeline to the scheduler.

use tracing::info;

use crate::auth::{OidcTokenClient, ServiceLoginClient};
use crate::download::Downloader;
use crate::errors::PipelineResult;
use crate::parse::MasterListParser;
use crate::pipeline;
use crate::scheduler::Scheduler;
use crate::signal::Shutdown;
use crate::store::PgCertificateStore;
use crate::Config;

/// The five wired stages of one deployment.
pub struct IngestionPipeline {
	access_tokens: OidcTokenClient,
	service_tokens: ServiceLoginClient,
	downloader: Downloader,
	parser: MasterListParser,
	store: PgCertificateStore,
}

impl IngestionPipeline {
	pub fn new(config: &Config) -> Self {
		IngestionPipeline {
			access_tokens: OidcTokenClient::new(config.auth.clone(), config.http_timeout),
			service_tokens: ServiceLoginClient::new(config.login.clone(), config.http_timeout),
			downloader: Downloader::new(config.download_url.clone(), config.http_timeout),
			parser: MasterListParser::new(),
			store: PgCertificateStore::new(config.database_dsn.clone()),
		}
	}

	pub async fn run(&self) -> PipelineResult<u64> {
		pipeline::run_pipeline(
			&self.access_tokens,
			&self.service_tokens,
			&self.downloader,
			&self.parser,
			&self.store,
		)
		.await
	}
}

/// Run the daemon until SIGINT/SIGTERM.
pub async fn run(config: Config) -> anyhow::Result<()> {
	info!(%config, "starting csca-sync");
	let pipeline = IngestionPipeline::new(&config);
	let shutdown = Shutdown::new();
	let scheduler = Scheduler::new(config.interval, config.run_on_startup);
	scheduler.run(shutdown.subscribe(), || pipeline.run()).await;
	Ok(())
}

/// Run a single ingestion pass and return its row count.
pub async fn run_once(config: Config) -> anyhow::Result<u64> {
	info!(%config, "starting csca-sync for a single pass");
	let pipeline = IngestionPipeline::new(&config);
	Ok(pipeline.run().await?)
}
