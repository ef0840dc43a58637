use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// 设置日志系统
///
/// `RUST_LOG` 优先，否则使用传入的默认级别。
/// 输出到 stderr，避免污染 stdout 上的审查结果 JSON。
pub fn setup_logging(default_level: Level) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("ai_code_review={}", default_level))
    });

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;

    Ok(())
}
