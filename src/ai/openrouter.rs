use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::ai::prompt::ChatMessage;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::ReviewError;
use crate::infrastructure::metrics::{CallOutcome, MetricsSink};
use crate::review::input::Credentials;

/// 生成参数固定：低温度偏向确定性的结构化输出
const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 4096;

/// OpenRouter API 请求结构
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    response_format: ResponseFormat,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

/// OpenRouter API 响应结构
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

/// 一次成功调用提取出的原始模型文本和用量
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// OpenRouter 客户端
///
/// 只负责单次 HTTP 调用和失败分类，自身不重试；
/// 重试由 `retry_with_backoff` 在外层驱动。
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    metrics: Arc<dyn MetricsSink>,
}

impl OpenRouterClient {
    pub fn new(config: &AppConfig, metrics: Arc<dyn MetricsSink>) -> Result<Self, ReviewError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10).min(config.timeout))
            .user_agent(format!("ai-code-review/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReviewError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            metrics,
        })
    }

    /// 执行一次 chat-completions 调用
    ///
    /// 无论成败，每次调用都会记录一次计数和耗时。
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        credentials: &Credentials,
    ) -> Result<ChatCompletion, ReviewError> {
        let start = Instant::now();
        let result = self.send(messages, credentials).await;

        self.metrics
            .observe_latency(start.elapsed().as_millis() as u64);
        self.metrics.record_call(if result.is_ok() {
            CallOutcome::Success
        } else {
            CallOutcome::Error
        });

        result
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        credentials: &Credentials,
    ) -> Result<ChatCompletion, ReviewError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &credentials.model,
            messages,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&credentials.api_key)
            .header("Content-Type", "application/json")
            .header("X-Title", "AI Code Review")
            .header("HTTP-Referer", "http://localhost")
            .json(&request)
            .send()
            .await?;

        let status = response.status();

        // 限流和服务端错误可重试
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(ReviewError::RetryableTransport {
                status: status.as_u16(),
                message: format!("OpenRouter {}", status.as_u16()),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::FatalTransport {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: ChatResponse = response.json().await.map_err(|e| {
            ReviewError::FatalTransport {
                status: status.as_u16(),
                body: format!("unparseable response body: {}", e),
            }
        })?;

        let content = api_response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone());

        match content {
            Some(content) if !content.is_empty() => Ok(ChatCompletion {
                content,
                prompt_tokens: api_response.usage.as_ref().and_then(|u| u.prompt_tokens),
                completion_tokens: api_response
                    .usage
                    .as_ref()
                    .and_then(|u| u.completion_tokens),
            }),
            _ => Err(ReviewError::EmptyResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::metrics::AtomicMetrics;

    fn test_client() -> OpenRouterClient {
        let config = AppConfig::default().with_base_url("http://127.0.0.1:1/");
        OpenRouterClient::new(&config, Arc::new(AtomicMetrics::new())).unwrap()
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = test_client();
        assert_eq!(client.base_url, "http://127.0.0.1:1");
    }

    #[test]
    fn test_chat_request_serialization() {
        let messages = vec![ChatMessage::user("Review this")];
        let request = ChatRequest {
            model: "anthropic/claude-3.5-sonnet",
            messages: &messages,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "anthropic/claude-3.5-sonnet");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"risk_score\": 10}"
                }
            }],
            "usage": {
                "prompt_tokens": 120,
                "completion_tokens": 48
            }
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("{\"risk_score\": 10}")
        );
        assert_eq!(response.usage.as_ref().unwrap().prompt_tokens, Some(120));
    }

    #[test]
    fn test_chat_response_without_usage() {
        let json = r#"{"choices": [{"message": {"content": "{}"}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_chat_response_empty_choices() {
        let json = r#"{"choices": []}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(response.choices.is_empty());
    }
}
