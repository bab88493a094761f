use std::{future::Future, time::Duration};

use rand::Rng;

use crate::error::{AppError, AppResult};

/// Bounded retry with jittered exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(25),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`: `base * 2^(attempt-1)` plus up to
    /// 50% jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(6));
        let max_jitter = (exp.as_millis() as u64) / 2;
        let jitter = if max_jitter == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=max_jitter)
        };
        exp + Duration::from_millis(jitter)
    }

    /// Runs `op` until it succeeds, fails with an error `retryable` rejects,
    /// or the attempt budget is spent. Exhaustion surfaces as
    /// [`AppError::TemporarilyUnavailable`].
    pub async fn run<T, F, Fut, P>(
        &self,
        operation: &'static str,
        retryable: P,
        mut op: F,
    ) -> AppResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AppResult<T>>,
        P: Fn(&AppError) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if retryable(&err) => {
                    if attempt >= self.max_attempts {
                        tracing::warn!(operation, attempt, error = %err, "retries exhausted");
                        return Err(AppError::TemporarilyUnavailable);
                    }
                    let delay = self.backoff(attempt);
                    tracing::debug!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after storage contention"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn is_bad_request(err: &AppError) -> bool {
        matches!(err, AppError::BadRequest(_))
    }

    #[test]
    fn backoff_grows_and_stays_within_jitter() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(20),
        };
        for _ in 0..50 {
            let first = policy.backoff(1);
            let third = policy.backoff(3);
            assert!(first >= Duration::from_millis(20) && first <= Duration::from_millis(30));
            assert!(third >= Duration::from_millis(80) && third <= Duration::from_millis(120));
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .run("test", is_bad_request, |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(AppError::BadRequest("contention".into()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_temporarily_unavailable() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = fast()
            .run("test", is_bad_request, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::BadRequest("contention".into())) }
            })
            .await;
        assert!(matches!(result, Err(AppError::TemporarilyUnavailable)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_return_immediately() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = fast()
            .run("test", is_bad_request, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::CapacityExceeded(uuid::Uuid::nil())) }
            })
            .await;
        assert!(matches!(result, Err(AppError::CapacityExceeded(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
