use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::infrastructure::error::ReviewError;

/// 问题严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// 模型识别出的单个问题
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: Severity,
    pub file: String,
    pub lines: Vec<u64>,
    pub explanation: String,
    pub suggested_fix: String,
    pub confidence: f64,
}

/// 缺失的测试覆盖区域
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingTestArea {
    pub area: String,
    pub cases: Vec<String>,
}

/// 审查元信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewMeta {
    pub model: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
}

/// 完整的审查结果
///
/// 不变量：要么完整有效，要么不存在。构造后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutput {
    pub risk_score: u8,
    pub summary: String,
    pub issues: Vec<ReviewIssue>,
    pub missing_tests: Vec<MissingTestArea>,
    pub questions_for_human: Vec<String>,
    pub meta: ReviewMeta,
}

/// 校验模型原始输出并合并元信息
///
/// 解析失败返回 `MalformedOutput`（不重试）；结构违规全部收集后
/// 以 `SchemaViolation` 返回。只有完全合法的对象才会交还调用方。
pub fn validate_model_output(raw: &str, meta: ReviewMeta) -> Result<ReviewOutput, ReviewError> {
    let parsed: Value = serde_json::from_str(raw).map_err(|_| ReviewError::MalformedOutput)?;

    let mut object = match parsed {
        Value::Object(map) => map,
        _ => {
            return Err(ReviewError::schema(vec![
                "response is not a JSON object".to_string()
            ]))
        }
    };

    // 元信息由本地计算，覆盖模型可能自行编造的 meta 字段
    object.insert(
        "meta".to_string(),
        serde_json::json!({
            "model": meta.model,
            "latency_ms": meta.latency_ms,
            "prompt_tokens": meta.prompt_tokens,
            "completion_tokens": meta.completion_tokens,
        }),
    );

    let violations = collect_violations(&object);
    if !violations.is_empty() {
        return Err(ReviewError::schema(violations));
    }

    serde_json::from_value(Value::Object(object))
        .map_err(|e| ReviewError::schema(vec![e.to_string()]))
}

fn collect_violations(object: &serde_json::Map<String, Value>) -> Vec<String> {
    let mut violations = Vec::new();

    match object.get("risk_score") {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(score) if score <= 100 => {}
            _ => violations.push("risk_score must be an integer between 0 and 100".to_string()),
        },
        Some(_) => violations.push("risk_score must be an integer between 0 and 100".to_string()),
        None => violations.push("risk_score is required".to_string()),
    }

    match object.get("summary") {
        Some(Value::String(_)) => {}
        Some(_) => violations.push("summary must be a string".to_string()),
        None => violations.push("summary is required".to_string()),
    }

    match object.get("issues") {
        Some(Value::Array(issues)) => {
            for (index, issue) in issues.iter().enumerate() {
                check_issue(index, issue, &mut violations);
            }
        }
        Some(_) => violations.push("issues must be an array".to_string()),
        None => violations.push("issues is required".to_string()),
    }

    match object.get("missing_tests") {
        Some(Value::Array(areas)) => {
            for (index, area) in areas.iter().enumerate() {
                check_missing_test(index, area, &mut violations);
            }
        }
        Some(_) => violations.push("missing_tests must be an array".to_string()),
        None => violations.push("missing_tests is required".to_string()),
    }

    match object.get("questions_for_human") {
        Some(Value::Array(questions)) => {
            if !questions.iter().all(Value::is_string) {
                violations.push("questions_for_human must contain only strings".to_string());
            }
        }
        Some(_) => violations.push("questions_for_human must be an array".to_string()),
        None => violations.push("questions_for_human is required".to_string()),
    }

    violations
}

fn check_issue(index: usize, value: &Value, violations: &mut Vec<String>) {
    let issue = match value.as_object() {
        Some(issue) => issue,
        None => {
            violations.push(format!("issues[{}] must be an object", index));
            return;
        }
    };

    for field in ["type", "file", "explanation", "suggested_fix"] {
        if !matches!(issue.get(field), Some(Value::String(_))) {
            violations.push(format!("issues[{}].{} must be a string", index, field));
        }
    }

    match issue.get("severity").and_then(Value::as_str) {
        Some("low" | "medium" | "high" | "critical") => {}
        _ => violations.push(format!(
            "issues[{}].severity must be one of: low, medium, high, critical",
            index
        )),
    }

    match issue.get("lines") {
        Some(Value::Array(lines)) => {
            if !lines.iter().all(|l| l.as_u64().is_some()) {
                violations.push(format!(
                    "issues[{}].lines must contain non-negative integers",
                    index
                ));
            }
        }
        _ => violations.push(format!("issues[{}].lines must be an array", index)),
    }

    match issue.get("confidence").and_then(Value::as_f64) {
        Some(confidence) if (0.0..=1.0).contains(&confidence) => {}
        _ => violations.push(format!(
            "issues[{}].confidence must be a number between 0 and 1",
            index
        )),
    }
}

fn check_missing_test(index: usize, value: &Value, violations: &mut Vec<String>) {
    let area = match value.as_object() {
        Some(area) => area,
        None => {
            violations.push(format!("missing_tests[{}] must be an object", index));
            return;
        }
    };

    if !matches!(area.get("area"), Some(Value::String(_))) {
        violations.push(format!("missing_tests[{}].area must be a string", index));
    }

    match area.get("cases") {
        Some(Value::Array(cases)) if cases.iter().all(Value::is_string) => {}
        _ => violations.push(format!(
            "missing_tests[{}].cases must be an array of strings",
            index
        )),
    }
}
