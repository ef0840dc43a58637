use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "ai-code-review",
    version,
    about = "AI 代码审查 - 将 diff、代码片段或 PR 提交给 LLM，返回结构化风险评估",
    long_about = "读取一个审查请求 JSON（文件或 stdin），经过输入校验、提示构建、带重试的 OpenRouter 调用和输出 schema 校验后，在 stdout 输出 ReviewOutput JSON。凭证按次传入，不做任何持久化。"
)]
pub struct Args {
    /// 请求 JSON 文件路径（缺省从 stdin 读取）
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// OpenRouter API key（覆盖请求中的 apiKey）
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// 使用的模型，如 anthropic/claude-3.5-sonnet（覆盖请求中的 model）
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// 审查关注点：correctness、security 或 performance
    #[arg(short, long, value_name = "RULESET")]
    pub ruleset: Option<String>,
}
