//! 带重试与超时的后端包装器
//!
//! 重试与超时只住在适配层：单次调用套 tokio 超时（超时视为 Unavailable），
//! 瞬态错误按递增退避重试到 max_attempts 为止；Refused 立即返回不重试。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{BackendError, CompletionRequest, CompletionResponse, ReasoningBackend};

/// 重试策略：总尝试次数上限（含首次）、单次超时、退避基数
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 总尝试次数（硬上限，最小为 1）
    pub max_attempts: u32,
    /// 单次调用超时
    pub call_timeout: Duration,
    /// 第 n 次重试前等待 backoff_base * n
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            call_timeout: Duration::from_secs(60),
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, call_timeout_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            call_timeout: Duration::from_millis(call_timeout_ms),
            ..Self::default()
        }
    }
}

/// 包装任意后端，提供有界重试与超时；对外仍是 ReasoningBackend
pub struct RetryingBackend {
    inner: Arc<dyn ReasoningBackend>,
    policy: RetryPolicy,
}

impl RetryingBackend {
    pub fn new(inner: Arc<dyn ReasoningBackend>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn attempt(&self, req: &CompletionRequest) -> Result<CompletionResponse, BackendError> {
        match tokio::time::timeout(self.policy.call_timeout, self.inner.complete(req)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Unavailable(format!(
                "call timed out after {}ms",
                self.policy.call_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl ReasoningBackend for RetryingBackend {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, BackendError> {
        let mut last_err = BackendError::Unavailable("no attempt made".to_string());

        for attempt in 1..=self.policy.max_attempts {
            match self.attempt(req).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    let wait = self.policy.backoff_base * attempt;
                    tracing::warn!(
                        attempt,
                        max = self.policy.max_attempts,
                        "Backend unavailable ({}), retrying in {:?}",
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            call_timeout: Duration::from_secs(5),
            backoff_base: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let mock = Arc::new(MockBackend::with_script(vec![
            Err(BackendError::Unavailable("1".to_string())),
            Err(BackendError::Unavailable("2".to_string())),
            Ok("insights".to_string()),
        ]));
        let backend = RetryingBackend::new(mock.clone(), fast_policy(3));

        let resp = backend
            .complete(&CompletionRequest::new("analyze", "ctx"))
            .await
            .unwrap();
        assert_eq!(resp.text, "insights");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mock = Arc::new(MockBackend::with_script(vec![
            Err(BackendError::Unavailable("1".to_string())),
            Err(BackendError::Unavailable("2".to_string())),
            Err(BackendError::Unavailable("3".to_string())),
        ]));
        let backend = RetryingBackend::new(mock.clone(), fast_policy(3));

        let err = backend
            .complete(&CompletionRequest::new("analyze", "ctx"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_refused_not_retried() {
        let mock = Arc::new(MockBackend::with_script(vec![Err(BackendError::Refused(
            "too large".to_string(),
        ))]));
        let backend = RetryingBackend::new(mock.clone(), fast_policy(3));

        let err = backend
            .complete(&CompletionRequest::new("analyze", "ctx"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Refused(_)));
        assert_eq!(mock.call_count(), 1);
    }
}
