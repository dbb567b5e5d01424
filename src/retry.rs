use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Attempts actually made; zero is treated as one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after the failed attempt at zero-based `attempt_index`.
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are used up.
///
/// Attempts never overlap: the next one starts only after the previous failure
/// and its backoff sleep have completed. The last error is returned unchanged.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt = attempt + 1, error = %err, "attempt failed");
                if attempt + 1 >= attempts {
                    return Err(err);
                }
                let delay = policy.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    backoff_ms = delay.as_millis() as u64,
                    "retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[derive(Debug, PartialEq, Eq)]
    struct Failure(u32);

    fn assert_waited(started: Instant, expected: Duration) {
        let waited = started.elapsed();
        assert!(
            waited >= expected && waited < expected + Duration::from_millis(5),
            "waited {waited:?}, expected {expected:?}"
        );
    }

    impl Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "failure #{}", self.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_operation_runs_max_attempts_and_returns_last_error() {
        let calls = Cell::new(0u32);
        let started = Instant::now();
        let result: Result<(), Failure> = retry(RetryPolicy::default(), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Err(Failure(n)) }
        })
        .await;

        assert_eq!(calls.get(), 3);
        assert_eq!(result, Err(Failure(3)));
        // 1000 * (2^0 + 2^1)
        assert_waited(started, Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn cumulative_wait_doubles_each_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let started = Instant::now();
        let result: Result<(), Failure> = retry(policy, || async { Err(Failure(0)) }).await;
        assert!(result.is_err());
        assert_waited(started, Duration::from_millis(100 + 200 + 400 + 800));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_waiting_after_the_last_failure() {
        let calls = Cell::new(0u32);
        let started = Instant::now();
        let result = retry(RetryPolicy::default(), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(Failure(n))
                } else {
                    Ok("sent")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("sent"));
        assert_eq!(calls.get(), 3);
        assert_waited(started, Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::new(0, Duration::from_millis(50));
        let started = Instant::now();
        let result: Result<(), Failure> = retry(policy, || {
            calls.set(calls.get() + 1);
            async { Err(Failure(1)) }
        })
        .await;
        assert_eq!(result, Err(Failure(1)));
        assert_eq!(calls.get(), 1);
        assert_waited(started, Duration::ZERO);
    }

    #[test]
    fn backoff_is_zero_based() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(2), Duration::from_millis(4000));
    }
}
