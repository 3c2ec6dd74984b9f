// munch-core/src/retry.rs

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use crate::config::RetryConfig;
use crate::Error;

impl RetryConfig {
    /// Exponential backoff with jitter, bounded by `max_attempts`.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
            .with_jitter()
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// attempts run out. Exhausted transient faults become `LedgerUnavailable`.
///
/// `op` must be safe to repeat: every storage write it performs has to be
/// idempotent (fixed reference / fixed id).
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    op.retry(config.backoff())
        .when(|e: &Error| e.is_transient())
        .notify(|err: &Error, dur: Duration| {
            warn!(operation = %operation, error = %err, delay = ?dur, "Transient storage fault, retrying");
        })
        .await
        .map_err(|e| {
            if e.is_transient() {
                Error::LedgerUnavailable(format!("{operation}: {e}"))
            } else {
                e
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let res: Result<(), Error> = with_retry(&RetryConfig::fast(3), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Transient("flaky".into()))
        })
        .await;

        assert!(matches!(res, Err(Error::LedgerUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let res: Result<(), Error> = with_retry(&RetryConfig::fast(5), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::InsufficientPoints { required: 10, available: 0 })
        })
        .await;

        assert!(matches!(res, Err(Error::InsufficientPoints { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_from_single_fault() {
        let calls = AtomicUsize::new(0);
        let res = with_retry(&RetryConfig::fast(3), "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::Transient("blip".into()))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(res.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
