//! Back-off policy for collaborator calls.

use std::future::Future;
use std::time::Duration;

use crate::error::CollaboratorError;

const CEILING: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Backoff {
    /// Extra attempts after the first call.
    pub(crate) retries: u32,
    pub(crate) base: Duration,
}

impl Backoff {
    /// Nominal wait before retry `n` (1-based): `base` doubled per earlier
    /// retry, never above one minute, then scaled by `jitter`.
    fn delay(self, n: u32, jitter: f64) -> Duration {
        let doublings = n.saturating_sub(1).min(10);
        self.base
            .saturating_mul(1 << doublings)
            .min(CEILING)
            .mul_f64(jitter)
    }

    /// Calls `attempt` until it succeeds, fails permanently, or the retry
    /// allowance runs out. Waits carry ±25 % jitter.
    pub(crate) async fn run<T, F, Fut>(self, mut attempt: F) -> Result<T, CollaboratorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollaboratorError>>,
    {
        let mut n = 0;
        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if n >= self.retries || !err.is_transient() {
                return Err(err);
            }
            n += 1;
            let wait = self.delay(n, rand::random_range(0.75..1.25));
            tracing::warn!(retry = n, of = self.retries, wait = ?wait, error = %err, "collaborator call failed; backing off");
            tokio::time::sleep(wait).await;
        }
    }
}
