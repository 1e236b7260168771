//! Retrying-call wrapper
//!
//! Every node call goes through [`with_retry`]. The caller supplies a
//! classification function that sorts failures into rate-limited, transient,
//! and fatal, and the policy picks a delay for each retryable class.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use lendscope_core::{FetchConfig, NodeError, RetryClass};
use tracing::warn;

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * 2^(attempt - 1)`
    Exponential { base: Duration },
    /// `step * attempt`
    Linear { step: Duration },
}

impl Backoff {
    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Exponential { base } => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
            Self::Linear { step } => step.saturating_mul(attempt),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Schedule after a rate-limit response
    pub rate_limit: Backoff,
    /// Schedule after a transport failure
    pub transient: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            rate_limit: Backoff::Exponential {
                base: Duration::from_millis(config.rate_limit_base_delay_ms),
            },
            transient: Backoff::Linear {
                step: Duration::from_millis(config.transient_delay_ms),
            },
        }
    }
}

/// Run `op` until it succeeds, fails fatally, or runs out of attempts.
///
/// `op` receives the 1-based attempt number. On exhaustion the last error is
/// returned unchanged.
pub async fn with_retry<T, E, Op, Fut, C>(
    policy: &RetryPolicy,
    label: &str,
    classify: C,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryClass,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let backoff = match classify(&err) {
            RetryClass::Fatal => return Err(err),
            RetryClass::RateLimited => policy.rate_limit,
            RetryClass::Transient => policy.transient,
        };

        if attempt >= max_attempts {
            warn!(label, attempts = attempt, error = %err, "Giving up after retries");
            return Err(err);
        }

        let delay = backoff.delay(attempt);
        warn!(
            label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Node call failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// [`with_retry`] for node calls, classified by [`NodeError::retry_class`].
///
/// An exhausted rate limit reports how many attempts were made.
pub async fn retry_node<T, Op, Fut>(policy: &RetryPolicy, label: &str, op: Op) -> Result<T, NodeError>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, NodeError>>,
{
    with_retry(policy, label, NodeError::retry_class, op)
        .await
        .map_err(|e| match e {
            NodeError::RateLimited { .. } => NodeError::RateLimited {
                attempts: policy.max_attempts.max(1),
            },
            other => other,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Fails with `err` for the first `k` attempts, then succeeds
    async fn flaky(
        calls: &AtomicU32,
        k: u32,
        err: fn() -> NodeError,
    ) -> Result<&'static str, NodeError> {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= k {
            Err(err())
        } else {
            Ok("ok")
        }
    }

    fn rate_limited() -> NodeError {
        NodeError::RateLimited { attempts: 1 }
    }

    fn unreachable() -> NodeError {
        NodeError::RemoteUnavailable {
            url: "http://127.0.0.1:1".into(),
            reason: "connection refused".into(),
        }
    }

    #[test]
    fn test_backoff_schedules() {
        let exp = Backoff::Exponential {
            base: Duration::from_secs(2),
        };
        assert_eq!(exp.delay(1), Duration::from_secs(2));
        assert_eq!(exp.delay(2), Duration::from_secs(4));
        assert_eq!(exp.delay(3), Duration::from_secs(8));

        let lin = Backoff::Linear {
            step: Duration::from_secs(1),
        };
        assert_eq!(lin.delay(1), Duration::from_secs(1));
        assert_eq!(lin.delay(2), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_then_success() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = retry_node(&policy(), "test", |_| flaky(&calls, 2, rate_limited)).await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s then 4s
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhausted() {
        let calls = AtomicU32::new(0);

        let result = retry_node(&policy(), "test", |_| flaky(&calls, 3, rate_limited)).await;

        assert!(matches!(result, Err(NodeError::RateLimited { attempts: 3 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_uses_linear_backoff() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = retry_node(&policy(), "test", |_| flaky(&calls, 2, unreachable)).await;

        assert!(result.is_ok());
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_is_not_retried() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = retry_node(&policy(), "test", |_| {
            flaky(&calls, 5, || NodeError::HttpStatus {
                status: 500,
                body: "boom".into(),
            })
        })
        .await;

        assert!(matches!(result, Err(NodeError::HttpStatus { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_numbers_passed_to_op() {
        let seen = std::sync::Mutex::new(Vec::new());

        let _ = with_retry(
            &policy(),
            "test",
            |_: &String| RetryClass::Transient,
            |attempt| {
                seen.lock().unwrap().push(attempt);
                async move { Err::<(), String>(format!("fail {}", attempt)) }
            },
        )
        .await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }
}
