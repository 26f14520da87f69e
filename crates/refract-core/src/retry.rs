//! Fixed-attempt retry for transient collaborator failures.
//!
//! Retries a call a fixed number of times with a constant delay between
//! attempts. No exponential backoff, no jitter.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{TaskError, TaskResult};

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub attempts: u32,
    pub delay: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

/// Determine whether a task error is worth retrying.
///
/// Retryable: rate limits (429), server errors (5xx), and transport
/// timeouts or connect failures. Everything else fails immediately.
pub fn is_retryable(error: &TaskError) -> bool {
    match error {
        TaskError::Collaborator {
            status_code,
            message,
            ..
        } => {
            if let Some(code) = status_code {
                return *code == 429 || (500..=599).contains(code);
            }
            message.contains("timed out") || message.contains("connect")
        }
        _ => false,
    }
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. The last error is returned unchanged.
pub async fn with_retries<T, F, Fut>(policy: RetryPolicy, what: &str, mut call: F) -> TaskResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = TaskResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.attempts && is_retryable(&e) => {
                attempt += 1;
                tracing::debug!(
                    "Retry {attempt}/{} for {what} after {:?}: {e}",
                    policy.attempts,
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn http(code: u16, message: &str) -> TaskError {
        TaskError::Collaborator {
            service: "generate".to_string(),
            message: message.to_string(),
            status_code: Some(code),
        }
    }

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_rate_limit_is_retryable() {
        assert!(is_retryable(&http(429, "HTTP 429: slow down")));
    }

    #[test]
    fn test_server_error_is_retryable() {
        assert!(is_retryable(&http(503, "HTTP 503: unavailable")));
    }

    #[test]
    fn test_auth_error_not_retryable() {
        assert!(!is_retryable(&http(401, "HTTP 401: unauthorized")));
    }

    #[test]
    fn test_transport_errors_retryable_without_status() {
        assert!(is_retryable(&TaskError::collaborator(
            "upload",
            "request timed out: deadline elapsed"
        )));
        assert!(is_retryable(&TaskError::collaborator(
            "upload",
            "connect failed: connection refused"
        )));
        assert!(!is_retryable(&TaskError::collaborator(
            "describe",
            "Processed 500 tokens"
        )));
    }

    #[test]
    fn test_local_faults_not_retryable() {
        assert!(!is_retryable(&TaskError::EmptyInput(PathBuf::from("a.txt"))));
        assert!(!is_retryable(&TaskError::unreadable("a.png", "bad header")));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retries(fast(2), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(http(500, "boom"))
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausts_fixed_budget() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: TaskResult<()> = with_retries(fast(2), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(http(429, "rate limited"))
        })
        .await;
        assert!(result.unwrap_err().to_string().contains("rate limited"));
        // 1 initial + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_permanent_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: TaskResult<()> = with_retries(fast(3), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(http(400, "bad request"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
