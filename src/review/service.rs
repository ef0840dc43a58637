use std::sync::Arc;
use std::time::Instant;

use crate::ai::openrouter::OpenRouterClient;
use crate::ai::prompt::build_messages;
use crate::ai::retry::{retry_with_backoff, RetryPolicy};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::ReviewError;
use crate::infrastructure::metrics::{AtomicMetrics, MetricsSink};
use crate::review::input::ReviewRequest;
use crate::review::output::{validate_model_output, ReviewMeta, ReviewOutput};

/// 审查服务
///
/// 把校验、提示构建、带重试的模型调用和输出校验串成一条管道。
/// 每次调用相互独立，不保留跨请求状态。
pub struct ReviewService {
    config: AppConfig,
    client: OpenRouterClient,
    policy: RetryPolicy,
}

impl ReviewService {
    pub fn new(config: AppConfig) -> Result<Self, ReviewError> {
        Self::with_metrics(config, Arc::new(AtomicMetrics::new()))
    }

    /// 注入遥测接收器（测试或外部指标后端）
    pub fn with_metrics(
        config: AppConfig,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self, ReviewError> {
        let client = OpenRouterClient::new(&config, metrics)?;
        let policy = RetryPolicy::default().with_max_retries(config.max_retries);

        Ok(Self {
            config,
            client,
            policy,
        })
    }

    /// 覆盖重试策略（测试缩短退避延迟用）
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 执行一次完整的审查
    ///
    /// 任一阶段失败立即短路，后续阶段不再执行。
    pub async fn review(&self, request: ReviewRequest) -> Result<ReviewOutput, ReviewError> {
        let (credentials, input) = request.validate(self.config.max_content_size)?;

        tracing::info!(
            model = %credentials.model,
            ruleset = input.ruleset.as_str(),
            has_diff = input.diff.is_some(),
            has_code = input.code.is_some(),
            has_pr = input.pr.is_some(),
            "Processing review request"
        );

        let messages = build_messages(&input);

        // 延迟覆盖整个重试序列，与 meta.latency_ms 口径一致
        let start = Instant::now();
        let completion =
            retry_with_backoff(&self.policy, || self.client.chat(&messages, &credentials)).await?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let meta = ReviewMeta {
            model: credentials.model.clone(),
            latency_ms,
            prompt_tokens: completion.prompt_tokens,
            completion_tokens: completion.completion_tokens,
        };

        let output = validate_model_output(&completion.content, meta)?;

        tracing::info!(
            risk_score = output.risk_score,
            issue_count = output.issues.len(),
            latency_ms,
            "Review completed"
        );

        Ok(output)
    }
}
