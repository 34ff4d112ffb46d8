use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

/// Attempts per call, counting the first one.
pub(crate) const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Splits an attempt failure into retryable and final. Only transport-level
/// faults (timeout, refused/reset connection, DNS) are transient; an HTTP
/// status, however unhappy, is an answer and is surfaced on first sight.
pub(crate) trait TransientError {
	fn is_transient(&self) -> bool;
}

/// Run `op` with the ingestion retry policy: up to [`MAX_ATTEMPTS`] tries,
/// 100 ms between them (multiplier 1, capped at 30 s). This sits below the
/// typed-result boundary on purpose: it only ever sees the raw fallible
/// call, never a converted `PipelineError`.
pub(crate) async fn with_retries<T, E, F, Fut>(mut op: F) -> Result<T, E>
where
	E: TransientError,
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	let attempts = AtomicU32::new(0);
	backoff::future::retry(policy(), || {
		let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
		let fut = op();
		async move {
			match fut.await {
				Ok(value) => Ok(value),
				Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
					Err(backoff::Error::transient(err))
				},
				Err(err) => Err(backoff::Error::permanent(err)),
			}
		}
	})
	.await
}

fn policy() -> ExponentialBackoff {
	ExponentialBackoffBuilder::new()
		.with_initial_interval(INITIAL_BACKOFF)
		.with_multiplier(1.0)
		.with_randomization_factor(0.0)
		.with_max_interval(MAX_BACKOFF)
		.with_max_elapsed_time(None)
		.build()
}
