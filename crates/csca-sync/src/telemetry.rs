use std::env;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber. Level directives come from
/// `LOG_LEVEL` (default `info`); `LOG_FORMAT=json` switches to one JSON
/// object per event for log aggregation.
pub fn setup_logging() {
	let filter = env_filter();
	let json = env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
	let registry = tracing_subscriber::registry().with(filter);
	if json {
		registry.with(fmt::layer().json().flatten_event(true)).init();
	} else {
		registry.with(fmt::layer()).init();
	}
}

fn env_filter() -> EnvFilter {
	EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"))
}

pub mod testing {
	use tracing_subscriber::prelude::*;

	/// Best-effort subscriber for tests; repeated calls are a no-op.
	pub fn setup_test_logging() {
		let _ = tracing_subscriber::registry()
			.with(super::env_filter())
			.with(tracing_subscriber::fmt::layer().with_test_writer())
			.try_init();
	}
}
