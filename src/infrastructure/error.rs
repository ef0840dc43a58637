use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 审查管道错误类型
///
/// 每个变体对应管道中一种明确的失败方式，`is_retryable` 决定
/// 重试层是否重新尝试该操作。
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ReviewError {
    #[error("Invalid input: {}", .violations.join("; "))]
    Validation { violations: Vec<String> },

    #[error("OpenRouter {status}: {message}")]
    RetryableTransport { status: u16, message: String },

    #[error("OpenRouter error {status}: {body}")]
    FatalTransport { status: u16, body: String },

    #[error("Empty response from OpenRouter")]
    EmptyResponse,

    #[error("LLM returned invalid JSON")]
    MalformedOutput,

    #[error("LLM response does not match expected schema: {}", .violations.join("; "))]
    SchemaViolation { violations: Vec<String> },

    #[error("Network error: {message}")]
    Network { message: String },
}

impl ReviewError {
    /// 检查错误是否可重试
    ///
    /// 429/5xx 和网络层错误可重试，其余一律立即失败。
    /// 模型输出的格式错误不重试：相同提示大概率复现相同形状。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReviewError::RetryableTransport { .. } | ReviewError::Network { .. }
        )
    }

    /// 映射为等价的 HTTP 状态码，供外部调用方使用
    pub fn status_code(&self) -> u16 {
        match self {
            ReviewError::Validation { .. } => 400,
            ReviewError::RetryableTransport { .. } => 502,
            ReviewError::FatalTransport { .. } => 500,
            ReviewError::EmptyResponse => 500,
            ReviewError::MalformedOutput => 502,
            ReviewError::SchemaViolation { .. } => 502,
            ReviewError::Network { .. } => 502,
        }
    }

    /// 创建校验错误
    pub fn validation(violations: Vec<String>) -> Self {
        ReviewError::Validation { violations }
    }

    /// 创建网络错误
    pub fn network(message: impl Into<String>) -> Self {
        ReviewError::Network {
            message: message.into(),
        }
    }

    /// 创建 schema 校验错误
    pub fn schema(violations: Vec<String>) -> Self {
        ReviewError::SchemaViolation { violations }
    }

    /// 结构化错误体，返回给外部调用方前先经过脱敏
    pub fn to_error_body(&self) -> serde_json::Value {
        match self {
            ReviewError::Validation { violations } => serde_json::json!({
                "error": "Invalid input",
                "details": violations,
            }),
            ReviewError::SchemaViolation { violations } => serde_json::json!({
                "error": "LLM response does not match expected schema",
                "details": violations,
            }),
            other => serde_json::json!({
                "error": other.to_string(),
            }),
        }
    }
}

impl From<reqwest::Error> for ReviewError {
    fn from(error: reqwest::Error) -> Self {
        ReviewError::Network {
            message: error.to_string(),
        }
    }
}
