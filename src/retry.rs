//! Bounded retry with fixed backoff.
//!
//! A `RetryPolicy` runs an async operation up to `max_attempts` times. Each
//! attempt can be capped by `attempt_timeout`; a call that outlives it counts
//! as a failed attempt. Failed attempts are followed by `delay` plus a random
//! `0..=jitter`, except after the last one.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    // ---
    pub max_attempts: u32,
    pub delay: Duration,
    pub jitter: Duration,
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(3),
            jitter: Duration::ZERO,
            attempt_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Why a single attempt failed.
#[derive(Debug)]
pub enum AttemptError<E> {
    Failed(E),
    TimedOut(Duration),
}

impl<E: fmt::Display> fmt::Display for AttemptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Failed(e) => write!(f, "{e}"),
            AttemptError::TimedOut(after) => write!(f, "timed out after {after:?}"),
        }
    }
}

#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Every attempt failed.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: AttemptError<E>,
}

impl RetryPolicy {
    // ---
    fn backoff(&self) -> Duration {
        // ---
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = self.jitter.as_millis() as u64;
        self.delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// `op` is called once per attempt. The sleep between attempts yields to
    /// the runtime.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<Attempted<T>, Exhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        // ---
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = match self.attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, op(attempt)).await {
                    Ok(inner) => inner.map_err(AttemptError::Failed),
                    Err(_) => Err(AttemptError::TimedOut(limit)),
                },
                None => op(attempt).await.map_err(AttemptError::Failed),
            };

            let err = match result {
                Ok(value) => {
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    })
                }
                Err(err) => err,
            };

            warn!(attempt, max_attempts, error = %err, "Attempt failed");

            if attempt >= max_attempts {
                return Err(Exhausted {
                    attempts: attempt,
                    last_error: err,
                });
            }

            tokio::time::sleep(self.backoff()).await;
            attempt += 1;
        }
    }
}
