use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use tracing::warn;

/// Pause between attempts in production.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Runs `op` until it succeeds or `budget` of wall-clock time has passed,
/// sleeping a constant `interval` between attempts. Returns the last error
/// once the budget is spent.
pub async fn retry_within<T, E, F, Fut>(
    what: &str,
    budget: Duration,
    interval: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(interval)
        .with_max_interval(interval)
        .with_multiplier(1.0)
        .with_randomization_factor(0.0)
        .with_max_elapsed_time(Some(budget))
        .build();

    backoff::future::retry_notify(
        policy,
        || {
            let attempt = op();
            async move { attempt.await.map_err(backoff::Error::transient) }
        },
        |err: E, wait: Duration| {
            warn!("{} failed: {} (retrying in {:.1}s)", what, err, wait.as_secs_f64());
        },
    )
    .await
}
