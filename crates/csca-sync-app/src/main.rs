use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "csca-sync", about = "ICAO CSCA Master List ingestion daemon", long_about = None)]
struct Args {
	/// Run one ingestion pass and exit.
	#[arg(long)]
	once: bool,

	/// Parse the configuration, report, and exit.
	#[arg(long)]
	validate_only: bool,
}

fn main() -> anyhow::Result<()> {
	csca_sync::telemetry::setup_logging();
	let args = Args::parse();

	tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.expect("tokio runtime")
		.block_on(async move {
			// a missing or invalid variable aborts here with a non-zero exit
			let config = csca_sync::config::parse_config()?;
			if args.validate_only {
				println!("configuration is valid: {config}");
				return Ok(());
			}
			if args.once {
				let rows = csca_sync::app::run_once(config).await?;
				info!(rows, "single ingestion pass complete");
				return Ok(());
			}
			csca_sync::app::run(config).await
		})
}
