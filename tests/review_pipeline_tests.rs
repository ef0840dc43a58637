use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ai_code_review::ai::retry::RetryPolicy;
use ai_code_review::infrastructure::config::AppConfig;
use ai_code_review::infrastructure::error::ReviewError;
use ai_code_review::infrastructure::metrics::AtomicMetrics;
use ai_code_review::review::input::ReviewRequest;
use ai_code_review::review::service::ReviewService;

/// 创建测试用的审查请求
fn code_request() -> ReviewRequest {
    serde_json::from_value(json!({
        "apiKey": "k",
        "model": "m",
        "code": "function f(){return x}",
        "languageHint": "javascript",
        "ruleset": "correctness"
    }))
    .unwrap()
}

/// 模型返回的合法审查 JSON（含一个未定义变量问题）
fn review_body() -> serde_json::Value {
    json!({
        "risk_score": 40,
        "summary": "The function references an undefined variable.",
        "issues": [{
            "type": "undefined-variable",
            "severity": "high",
            "file": "index.js",
            "lines": [1],
            "explanation": "x is not defined in the function scope",
            "suggested_fix": "Declare x or accept it as a parameter",
            "confidence": 0.92
        }],
        "missing_tests": [{
            "area": "return value of f",
            "cases": ["f() when x is undefined"]
        }],
        "questions_for_human": ["Is x expected to be a global?"]
    })
}

/// OpenRouter 响应包装
fn provider_response(content: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": { "role": "assistant", "content": content }
        }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 60 }
    })
}

/// 指向 mock server 的服务，退避延迟缩短到毫秒级
fn test_service(uri: &str, metrics: Arc<AtomicMetrics>, max_retries: u32) -> ReviewService {
    let config = AppConfig::default().with_base_url(uri);
    ReviewService::with_metrics(config, metrics)
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
        })
}

#[tokio::test]
async fn test_review_success_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer k"))
        .and(body_partial_json(json!({
            "model": "m",
            "response_format": { "type": "json_object" }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(provider_response(&review_body().to_string())),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(AtomicMetrics::new());
    let service = test_service(&mock_server.uri(), Arc::clone(&metrics), 3);

    let output = service.review(code_request()).await.unwrap();

    assert_eq!(output.meta.model, "m");
    assert!(!output.issues.is_empty());
    assert_eq!(output.issues[0].issue_type, "undefined-variable");
    assert_eq!(output.risk_score, 40);
    assert_eq!(output.meta.prompt_tokens, Some(120));
    assert_eq!(output.meta.completion_tokens, Some(60));
    assert_eq!(metrics.total_calls(), 1);
    assert_eq!(metrics.success_calls(), 1);
}

#[tokio::test]
async fn test_rate_limited_twice_then_succeeds() {
    let mock_server = MockServer::start().await;

    // 前两次 429，之后 200
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(provider_response(&review_body().to_string())),
        )
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(AtomicMetrics::new());
    let service = test_service(&mock_server.uri(), Arc::clone(&metrics), 3);

    let output = service.review(code_request()).await.unwrap();

    assert_eq!(output.meta.model, "m");
    // 调用计数记录全部 3 次尝试
    assert_eq!(metrics.total_calls(), 3);
    assert_eq!(metrics.error_calls(), 2);
    assert_eq!(metrics.success_calls(), 1);
}

#[tokio::test]
async fn test_malformed_model_json_fails_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(provider_response("not json")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(AtomicMetrics::new());
    let service = test_service(&mock_server.uri(), Arc::clone(&metrics), 3);

    let error = service.review(code_request()).await.unwrap_err();

    assert!(matches!(error, ReviewError::MalformedOutput));
    // 传输层只被调用一次，HTTP 调用本身算成功
    assert_eq!(metrics.total_calls(), 1);
    assert_eq!(metrics.success_calls(), 1);
}

#[tokio::test]
async fn test_fatal_status_fails_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid model id"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(AtomicMetrics::new());
    let service = test_service(&mock_server.uri(), Arc::clone(&metrics), 3);

    let error = service.review(code_request()).await.unwrap_err();

    match error {
        ReviewError::FatalTransport { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid model id"));
        }
        other => panic!("expected FatalTransport, got {:?}", other),
    }
    assert_eq!(metrics.total_calls(), 1);
}

#[tokio::test]
async fn test_empty_choices_is_empty_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(AtomicMetrics::new());
    let service = test_service(&mock_server.uri(), Arc::clone(&metrics), 3);

    let error = service.review(code_request()).await.unwrap_err();
    assert!(matches!(error, ReviewError::EmptyResponse));
    assert_eq!(metrics.total_calls(), 1);
}

#[tokio::test]
async fn test_retry_exhaustion_surfaces_last_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(AtomicMetrics::new());
    let service = test_service(&mock_server.uri(), Arc::clone(&metrics), 2);

    let error = service.review(code_request()).await.unwrap_err();

    match error {
        ReviewError::RetryableTransport { status, .. } => assert_eq!(status, 503),
        other => panic!("expected RetryableTransport, got {:?}", other),
    }
    assert_eq!(metrics.total_calls(), 3);
    assert_eq!(metrics.error_calls(), 3);
}

#[tokio::test]
async fn test_schema_violation_from_model_output() {
    let mock_server = MockServer::start().await;

    // 合法 JSON 但 risk_score 超出范围
    let mut body = review_body();
    body["risk_score"] = json!(150);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(provider_response(&body.to_string())),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(AtomicMetrics::new());
    let service = test_service(&mock_server.uri(), Arc::clone(&metrics), 3);

    let error = service.review(code_request()).await.unwrap_err();
    match error {
        ReviewError::SchemaViolation { violations } => {
            assert!(violations.iter().any(|v| v.contains("between 0 and 100")));
        }
        other => panic!("expected SchemaViolation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_validation_error_never_reaches_transport() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let metrics = Arc::new(AtomicMetrics::new());
    let service = test_service(&mock_server.uri(), Arc::clone(&metrics), 3);

    // 缺少全部内容字段
    let request: ReviewRequest =
        serde_json::from_value(json!({ "apiKey": "k", "model": "m" })).unwrap();

    let error = service.review(request).await.unwrap_err();
    assert!(matches!(error, ReviewError::Validation { .. }));
    assert_eq!(metrics.total_calls(), 0);
}
