use serde::{Deserialize, Serialize};

use crate::review::input::ReviewInput;

/// 代码审查系统提示
///
/// 固定文本，不受用户输入影响。要求模型只输出 JSON、不宣称代码
/// "通过"测试、按严重程度分类，不确定时提问而不是猜测。
pub const SYSTEM_PROMPT: &str = r#"You are a senior code reviewer AI. You analyze code and identify potential issues.

CRITICAL RULES:
1. Respond with valid JSON only. No markdown, no explanations outside JSON.
2. You are NOT a test runner. Never claim code "passes" or "fails".
3. Identify RISKS, CONCERNS, and SUGGESTIONS based on static analysis.
4. If context is insufficient, add questions to "questions_for_human".
5. Be specific: reference files and line numbers when available.
6. Confidence (0.0-1.0) should reflect your certainty.

OUTPUT SCHEMA:
{
  "risk_score": <0-100, 0=low risk, 100=critical>,
  "summary": "<one paragraph summary>",
  "issues": [
    {
      "type": "<category: null-check, type-error, security, etc>",
      "severity": "<low|medium|high|critical>",
      "file": "<filename>",
      "lines": [<line numbers>],
      "explanation": "<why this is a concern>",
      "suggested_fix": "<actionable fix>",
      "confidence": <0.0-1.0>
    }
  ],
  "missing_tests": [
    { "area": "<what needs testing>", "cases": ["<test case>"] }
  ],
  "questions_for_human": ["<clarifying questions>"]
}

SEVERITY:
- critical: Security vulnerabilities, data loss, crashes
- high: Bugs causing runtime errors or incorrect behavior
- medium: Code smells, edge cases, maintainability
- low: Style issues, minor improvements"#;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 聊天消息，构造后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// 构建用户提示
///
/// 纯函数：相同输入产生逐字节相同的输出。行顺序固定为
/// ruleset 行、可选上下文行、空行、内容块、空行、JSON 提醒。
/// 内容块按 pr > diff > code 的优先级选择。
pub fn build_user_prompt(input: &ReviewInput) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!("Analyze this code for {} concerns.", input.ruleset.as_str()));

    if let Some(repo_name) = &input.repo_name {
        parts.push(format!("Repository: {}", repo_name));
    }
    if let Some(language_hint) = &input.language_hint {
        parts.push(format!("Language: {}", language_hint));
    }
    if let Some(file_name) = &input.file_name {
        parts.push(format!("File: {}", file_name));
    }

    parts.push(String::new());

    if let Some(pr) = &input.pr {
        parts.push(format!("PR Title: {}", pr.title));
        if let Some(description) = &pr.description {
            parts.push(format!("PR Description: {}", description));
        }
        parts.push(String::new());
        parts.push("```diff".to_string());
        parts.push(pr.diff.clone());
        parts.push("```".to_string());
    } else if let Some(diff) = &input.diff {
        parts.push("```diff".to_string());
        parts.push(diff.clone());
        parts.push("```".to_string());
    } else if let Some(code) = &input.code {
        let lang = input.language_hint.as_deref().unwrap_or("");
        parts.push(format!("```{}", lang));
        parts.push(code.clone());
        parts.push("```".to_string());
    }

    parts.push(String::new());
    parts.push("Respond with JSON only.".to_string());

    parts.join("\n")
}

/// 组装一次审查调用的完整消息列表
pub fn build_messages(input: &ReviewInput) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_user_prompt(input)),
    ]
}
