use serde::{Deserialize, Serialize};

use crate::infrastructure::error::ReviewError;

/// 审查关注点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ruleset {
    #[default]
    Correctness,
    Security,
    Performance,
}

impl Ruleset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ruleset::Correctness => "correctness",
            Ruleset::Security => "security",
            Ruleset::Performance => "performance",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "correctness" => Some(Ruleset::Correctness),
            "security" => Some(Ruleset::Security),
            "performance" => Some(Ruleset::Performance),
            _ => None,
        }
    }
}

/// OpenRouter 调用凭证
///
/// 由调用方按次注入，核心不持久化也不查找。
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub model: String,
}

/// PR 内容（已校验）
#[derive(Debug, Clone, PartialEq)]
pub struct PrInput {
    pub title: String,
    pub description: Option<String>,
    pub diff: String,
}

/// 已校验的审查输入
///
/// 不变量：diff / code / pr 至少一项存在，且各内容均不超过大小上限。
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewInput {
    pub diff: Option<String>,
    pub code: Option<String>,
    pub pr: Option<PrInput>,
    pub repo_name: Option<String>,
    pub language_hint: Option<String>,
    pub file_name: Option<String>,
    pub ruleset: Ruleset,
}

/// 未校验的线上请求
///
/// 所有字段可选，校验阶段一次性列举全部违规项。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub diff: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub pr: Option<PrRequest>,
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub language_hint: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub ruleset: Option<String>,
}

/// 未校验的 PR 字段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub diff: Option<String>,
}

impl ReviewRequest {
    /// 校验请求，返回凭证和审查输入
    ///
    /// 失败时返回 `Validation`，包含全部违规项而不是第一条。
    /// 不做任何网络或磁盘 I/O。
    pub fn validate(
        self,
        max_content_size: usize,
    ) -> Result<(Credentials, ReviewInput), ReviewError> {
        let mut violations = Vec::new();
        let size_label = format!("{}KB", max_content_size / 1024);

        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Some(key.to_string()),
            _ => {
                violations.push("API key is required".to_string());
                None
            }
        };

        let model = match self.model.as_deref() {
            Some(model) if !model.is_empty() => Some(model.to_string()),
            _ => {
                violations.push("Model is required".to_string());
                None
            }
        };

        // 空字符串视为未提供内容
        let diff = self.diff.filter(|d| !d.is_empty());
        let code = self.code.filter(|c| !c.is_empty());

        if let Some(diff) = &diff {
            if diff.len() > max_content_size {
                violations.push(format!("Diff exceeds {}", size_label));
            }
        }
        if let Some(code) = &code {
            if code.len() > max_content_size {
                violations.push(format!("Code exceeds {}", size_label));
            }
        }

        let pr = match &self.pr {
            Some(pr) => {
                let title = match pr.title.as_deref() {
                    Some(title) if !title.is_empty() => Some(title.to_string()),
                    _ => {
                        violations.push("PR title is required".to_string());
                        None
                    }
                };
                let diff = match pr.diff.as_deref() {
                    Some(diff) if diff.len() > max_content_size => {
                        violations.push(format!("PR diff exceeds {}", size_label));
                        None
                    }
                    Some(diff) if !diff.is_empty() => Some(diff.to_string()),
                    _ => {
                        violations.push("PR diff is required".to_string());
                        None
                    }
                };
                match (title, diff) {
                    (Some(title), Some(diff)) => Some(PrInput {
                        title,
                        description: pr.description.clone(),
                        diff,
                    }),
                    _ => None,
                }
            }
            None => None,
        };

        // 缺少全部内容是校验失败，不是致命错误
        if diff.is_none() && code.is_none() && self.pr.is_none() {
            violations.push("Provide at least one of: diff, code, or pr".to_string());
        }

        // 仅字段缺失时取默认值，空字符串按未知值处理
        let ruleset = match self.ruleset.as_deref() {
            None => Ruleset::default(),
            Some(value) => match Ruleset::parse(value) {
                Some(ruleset) => ruleset,
                None => {
                    violations.push(format!(
                        "Unknown ruleset '{}', expected one of: correctness, security, performance",
                        value
                    ));
                    Ruleset::default()
                }
            },
        };

        if !violations.is_empty() {
            return Err(ReviewError::validation(violations));
        }

        let credentials = Credentials {
            // 上面的违规检查保证两者都存在
            api_key: api_key.unwrap_or_default(),
            model: model.unwrap_or_default(),
        };

        let input = ReviewInput {
            diff,
            code,
            pr,
            repo_name: self.repo_name,
            language_hint: self.language_hint,
            file_name: self.file_name,
            ruleset,
        };

        Ok((credentials, input))
    }
}
