//! Per-request deadline carried explicitly through every workflow call.

use crate::error::AppError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Deadline applied when the caller does not supply one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    deadline: Instant,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }
}

impl RequestContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { deadline: Instant::now() + timeout }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Drives `work` until it finishes or the deadline passes. On expiry the
    /// future is dropped, which releases any transaction it holds uncommitted.
    pub async fn run<T, F>(&self, work: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match tokio::time::timeout_at(self.deadline, work).await {
            Ok(result) => result,
            Err(_) => Err(AppError::DeadlineExceeded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes_before_deadline() {
        let ctx = RequestContext::with_timeout(Duration::from_secs(1));
        let value = ctx.run(async { Ok::<_, AppError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_fails_after_deadline() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(20));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, AppError>(())
            })
            .await;
        assert!(matches!(result, Err(AppError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_default_deadline_is_short() {
        let ctx = RequestContext::default();
        assert!(ctx.remaining() <= DEFAULT_TIMEOUT);
        assert!(ctx.remaining() > Duration::from_secs(1));
    }
}
