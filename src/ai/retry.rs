use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::infrastructure::error::ReviewError;

/// 抖动上限（毫秒）
///
/// 抖动用于避免相关故障下的重试风暴，必须有界，
/// 使延迟曲线始终由指数项主导。
pub const JITTER_CEILING_MS: u64 = 100;

/// 重试策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数，总尝试次数为 max_retries + 1
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// 计算第 attempt 次重试的退避延迟（attempt 从 0 开始）
///
/// delay = min(base × 2^attempt + jitter, max)
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..JITTER_CEILING_MS);
    backoff_delay_with_jitter(policy, attempt, jitter)
}

fn backoff_delay_with_jitter(policy: &RetryPolicy, attempt: u32, jitter_ms: u64) -> Duration {
    let base_ms = policy.base_delay.as_millis() as u64;
    let exponential = base_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
    let delayed = exponential.saturating_add(jitter_ms);
    Duration::from_millis(delayed.min(policy.max_delay.as_millis() as u64))
}

/// 带指数退避的重试执行器
///
/// 成功立即返回；失败时只有 `is_retryable` 的错误会被重试。
/// 最后一次尝试的错误原样上抛，不做包装。
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, ReviewError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ReviewError>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !error.is_retryable() || attempt >= policy.max_retries {
                    return Err(error);
                }

                let delay = backoff_delay(policy, attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Retrying after error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
