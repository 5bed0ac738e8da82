use spool_oracle::ChainError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry with exponential backoff. Only transient errors are
/// retried; decode failures and missing data surface immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, fail fast. Used for every API-facing call.
    pub const fn once() -> Self {
        Self {
            attempts: 1,
            initial_delay: Duration::ZERO,
        }
    }

    /// Default driver-facing policy: three tries, 2s doubling backoff.
    pub const fn driver() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_secs(2),
        }
    }

    /// Runs `operation` under this policy.
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T, ChainError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    warn!(%err, attempt, label, "retrying chain call");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            attempts: 3,
            initial_delay: Duration::from_millis(1),
        };

        let result = policy
            .run("test", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(ChainError::Transport("down".into()))
                    } else {
                        Ok(42u64)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_decode_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::driver();

        let result: Result<(), _> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ChainError::Decode("bad json".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fail_fast_policy_tries_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::once()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ChainError::Transport("down".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
