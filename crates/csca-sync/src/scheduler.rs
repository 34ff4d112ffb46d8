//! Periodic driver for the pipeline. One run at a time: if a run overruns
//! the interval the next one is deferred, never skipped and never started in
//! parallel. A failed run is logged and the cadence continues; only a
//! shutdown signal stops the loop, and only between runs.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::errors::PipelineResult;
use crate::signal::ShutdownSignal;

pub struct Scheduler {
	interval: Duration,
	run_on_startup: bool,
}

impl Scheduler {
	pub fn new(interval: Duration, run_on_startup: bool) -> Self {
		Scheduler {
			interval,
			run_on_startup,
		}
	}

	pub async fn run<F, Fut>(&self, mut shutdown: ShutdownSignal, mut run_pipeline: F)
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = PipelineResult<u64>>,
	{
		let mut ticker = tokio::time::interval(self.interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		if !self.run_on_startup {
			// swallow the immediate first tick
			ticker.tick().await;
		}
		loop {
			tokio::select! {
				_ = ticker.tick() => {},
				_ = shutdown.signaled() => break,
			}
			let started = Instant::now();
			info!("master list ingestion starting");
			match run_pipeline().await {
				Ok(rows) => {
					info!(rows, elapsed_ms = started.elapsed().as_millis() as u64, "master list ingestion complete")
				},
				Err(err) => {
					error!(code = err.code.as_str(), error = %err, "master list ingestion failed")
				},
			}
			if shutdown.is_signaled() {
				break;
			}
		}
		info!("scheduler stopped");
	}
}
