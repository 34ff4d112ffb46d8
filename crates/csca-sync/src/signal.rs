use tokio::sync::watch;

/// Owns the process shutdown state: the first SIGINT or SIGTERM (ctrl-c off
/// unix) flips a watch flag that every subscriber can select on. In-flight
/// pipeline runs are never aborted; the scheduler checks the flag between
/// runs.
pub struct Shutdown {
	tx: watch::Sender<bool>,
}

impl Shutdown {
	pub fn new() -> Self {
		let (tx, _) = watch::channel(false);
		tokio::spawn(imp::watch_signals(tx.clone()));
		Shutdown { tx }
	}

	/// Flip the flag without a signal. Used by tests and one-shot runs.
	pub fn trigger(&self) {
		let _ = self.tx.send(true);
	}

	pub fn subscribe(&self) -> ShutdownSignal {
		ShutdownSignal {
			rx: self.tx.subscribe(),
		}
	}
}

impl Default for Shutdown {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Clone)]
pub struct ShutdownSignal {
	rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
	/// Completes once shutdown has been requested.
	pub async fn signaled(&mut self) {
		// wait_for also covers the flag already being set; a dropped sender
		// counts as shutdown.
		let _ = self.rx.wait_for(|stopping| *stopping).await;
	}

	pub fn is_signaled(&self) -> bool {
		*self.rx.borrow()
	}
}

#[cfg(unix)]
mod imp {
	use tokio::signal::unix::{signal, SignalKind};
	use tokio::sync::watch;
	use tracing::info;

	pub(super) async fn watch_signals(tx: watch::Sender<bool>) {
		let mut interrupt = match signal(SignalKind::interrupt()) {
			Ok(s) => s,
			Err(e) => {
				tracing::error!(error = %e, "failed to register SIGINT handler");
				return;
			},
		};
		let mut terminate = match signal(SignalKind::terminate()) {
			Ok(s) => s,
			Err(e) => {
				tracing::error!(error = %e, "failed to register SIGTERM handler");
				return;
			},
		};
		tokio::select! {
			_ = interrupt.recv() => info!("received SIGINT, starting shutdown"),
			_ = terminate.recv() => info!("received SIGTERM, starting shutdown"),
		}
		let _ = tx.send(true);
	}
}

#[cfg(not(unix))]
mod imp {
	use tokio::sync::watch;
	use tracing::info;

	pub(super) async fn watch_signals(tx: watch::Sender<bool>) {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!("received ctrl-c, starting shutdown");
		}
		let _ = tx.send(true);
	}
}
