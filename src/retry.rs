use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fixed-bound, fixed-delay retry policy. The delay is constant across
/// attempts: no backoff growth, no jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Signal that an operation failed on every permitted attempt. Distinct from
/// a single-attempt failure so callers can tell exhaustion apart and decide
/// whether it aborts the enclosing unit of work (foundational mode) or only
/// degrades it (supplementary mode).
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: fmt::Display + fmt::Debug> std::error::Error for RetryExhausted<E> {}

/// Run `op` up to `policy.max_attempts` times, sleeping `policy.delay`
/// between attempts. Returns the first success, or `RetryExhausted` carrying
/// the final error once the bound is hit.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(
                    "{label}: attempt {attempt}/{} failed: {err}",
                    policy.max_attempts
                );
                if attempt >= policy.max_attempts {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
