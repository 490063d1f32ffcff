//! Bounded-retry submission wrapper.
//!
//! Wraps a submission future factory with a per-attempt timeout,
//! exponential backoff, an error-classification hook, and an on-retry
//! observation hook. Terminal classifications abort immediately; exhausting
//! the retry budget on transient errors is itself a transient outcome; the
//! caller leaves the request eligible for a later pass.

use std::future::Future;

use tokio::time::timeout;
use tracing::trace;

use crate::config::RetryPolicy;
use crate::ledger::{ErrorClass, LedgerError};
use crate::types::Signature;

/// Why a submission pass gave up.
#[derive(Debug, Clone)]
pub enum SubmitFailure {
    /// The program rejected the submission; retrying cannot help.
    Terminal(LedgerError),
    /// Every attempt failed transiently (or the attempt budget was zero,
    /// in which case no error was ever observed).
    RetriesExhausted(Option<LedgerError>),
}

/// Runs `op` under the retry policy.
///
/// * `classify` decides whether an error is worth another attempt.
/// * `on_retry` observes each transient failure that will be retried,
///   receiving the attempt number that failed.
pub async fn submit_with_retry<Op, Fut, Classify, OnRetry>(
    policy: &RetryPolicy,
    mut op: Op,
    classify: Classify,
    mut on_retry: OnRetry,
) -> Result<Signature, SubmitFailure>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<Signature, LedgerError>>,
    Classify: Fn(&LedgerError) -> ErrorClass,
    OnRetry: FnMut(u32, &LedgerError),
{
    let mut last_err = None;

    for attempt in 1..=policy.max_attempts {
        let outcome = match timeout(policy.attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout(policy.attempt_timeout)),
        };

        match outcome {
            Ok(signature) => return Ok(signature),
            Err(err) => {
                if classify(&err) == ErrorClass::Terminal {
                    return Err(SubmitFailure::Terminal(err));
                }
                if attempt < policy.max_attempts {
                    on_retry(attempt, &err);
                    let backoff = policy.initial_backoff * (1u32 << (attempt - 1).min(16));
                    trace!(attempt, backoff_ms = backoff.as_millis() as u64, "backoff before retry");
                    tokio::time::sleep(backoff).await;
                }
                last_err = Some(err);
            }
        }
    }

    Err(SubmitFailure::RetriesExhausted(last_err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::ledger::RejectionCode;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            attempt_timeout: Duration::from_millis(100),
            initial_backoff: Duration::from_millis(1),
        }
    }

    fn signature() -> Signature {
        Signature::from_byte(1)
    }

    #[tokio::test]
    async fn first_attempt_success_skips_hooks() {
        let retries = AtomicU32::new(0);
        let result = submit_with_retry(
            &fast_policy(3),
            || async { Ok(signature()) },
            |e| e.class(),
            |_, _| {
                retries.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(retries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transient_errors_are_retried_to_success() {
        let attempts = AtomicU32::new(0);
        let retries = AtomicU32::new(0);
        let result = submit_with_retry(
            &fast_policy(3),
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(LedgerError::Network("connection reset".into()))
                    } else {
                        Ok(signature())
                    }
                }
            },
            |e| e.class(),
            |_, _| {
                retries.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(retries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn terminal_error_aborts_without_retry() {
        let attempts = AtomicU32::new(0);
        let result = submit_with_retry(
            &fast_policy(3),
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(LedgerError::Rejected(RejectionCode::AlreadyFinalized)) }
            },
            |e| e.class(),
            |_, _| {},
        )
        .await;
        assert!(matches!(result, Err(SubmitFailure::Terminal(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_report_last_transient_error() {
        let result = submit_with_retry(
            &fast_policy(2),
            || async { Err(LedgerError::StaleBlockReference) },
            |e| e.class(),
            |_, _| {},
        )
        .await;
        match result {
            Err(SubmitFailure::RetriesExhausted(Some(LedgerError::StaleBlockReference))) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn zero_attempt_budget_reports_no_error() {
        let result = submit_with_retry(
            &fast_policy(0),
            || async { Ok(signature()) },
            |e| e.class(),
            |_, _| {},
        )
        .await;
        assert!(matches!(
            result,
            Err(SubmitFailure::RetriesExhausted(None))
        ));
    }

    #[tokio::test]
    async fn attempt_timeout_classifies_transient() {
        let policy = RetryPolicy {
            max_attempts: 2,
            attempt_timeout: Duration::from_millis(10),
            initial_backoff: Duration::from_millis(1),
        };
        let retried_with_timeout = AtomicU32::new(0);
        let result = submit_with_retry(
            &policy,
            || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(signature())
            },
            |e| e.class(),
            |_, err| {
                if matches!(err, LedgerError::Timeout(_)) {
                    retried_with_timeout.fetch_add(1, Ordering::SeqCst);
                }
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(SubmitFailure::RetriesExhausted(Some(LedgerError::Timeout(_))))
        ));
        assert_eq!(retried_with_timeout.load(Ordering::SeqCst), 1);
    }
}
