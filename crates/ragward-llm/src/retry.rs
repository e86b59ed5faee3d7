use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;
use crate::provider::EmbeddingProvider;

/// Timeout and retry bounds applied to every embedding request.
#[derive(Debug, Clone, Copy)]
pub struct EmbedPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for EmbedPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl EmbedPolicy {
    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1 << attempt.min(16))
    }
}

/// Run `f` under the policy timeout, retrying transient failures with exponential backoff.
///
/// # Errors
///
/// Returns the last error once all attempts are exhausted, or the first non-transient error.
pub(crate) async fn with_retry<T, F, Fut>(
    provider_name: &str,
    policy: &EmbedPolicy,
    mut f: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(policy.timeout, f()).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(policy.timeout)),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    provider = provider_name,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    "embedding failed, retrying in {}ms: {e}",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wraps a provider so that each call is bounded by an [`EmbedPolicy`].
#[derive(Debug, Clone)]
pub struct Resilient<P> {
    inner: P,
    policy: EmbedPolicy,
}

impl<P: EmbeddingProvider> Resilient<P> {
    #[must_use]
    pub fn new(inner: P, policy: EmbedPolicy) -> Self {
        Self { inner, policy }
    }

    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: EmbeddingProvider> EmbeddingProvider for Resilient<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        with_retry(self.inner.name(), &self.policy, || self.inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        with_retry(self.inner.name(), &self.policy, || {
            self.inner.embed_batch(texts)
        })
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy(max_retries: u32) -> EmbedPolicy {
        EmbedPolicy {
            timeout: Duration::from_millis(200),
            max_retries,
            base_backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_doubles() {
        let policy = EmbedPolicy {
            base_backoff: Duration::from_millis(100),
            ..EmbedPolicy::default()
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", &fast_policy(2), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(LlmError::Request("connection refused".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("test", &fast_policy(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Request("down".into())) }
        })
        .await;
        assert!(matches!(result, Err(LlmError::Request(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry("test", &fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(LlmError::BatchMismatch {
                    expected: 2,
                    actual: 1,
                })
            }
        })
        .await;
        assert!(matches!(result, Err(LlmError::BatchMismatch { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let result: Result<(), _> = with_retry("test", &fast_policy(0), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(d) if d == Duration::from_millis(200)));
        assert_eq!(err.to_string(), "embedding request timed out after 200ms");
    }
}
