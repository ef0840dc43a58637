use std::env;
use std::time::Duration;

/// OpenRouter chat-completions 端点
pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";

/// 默认单次请求超时（毫秒）
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// 默认最大重试次数
const DEFAULT_MAX_RETRIES: u32 = 3;
/// 默认内容大小上限（200KB）
const DEFAULT_MAX_CONTENT_SIZE: usize = 204_800;

/// 应用程序配置
///
/// 全部来自环境变量，管道内部只读。
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 单次 OpenRouter 请求的超时时间（每次重试独立计时）
    pub timeout: Duration,
    /// OpenRouter 调用的最大重试次数
    pub max_retries: u32,
    /// diff/code/pr.diff 各自的大小上限（字节）
    pub max_content_size: usize,
    /// OpenRouter API 基础地址（测试时指向 mock server）
    pub base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
            base_url: OPENROUTER_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置，缺省使用默认值
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            timeout: Duration::from_millis(parse_env(
                "OPENROUTER_TIMEOUT_MS",
                DEFAULT_TIMEOUT_MS,
            )),
            max_retries: parse_env("OPENROUTER_MAX_RETRIES", DEFAULT_MAX_RETRIES),
            max_content_size: parse_env("MAX_CONTENT_SIZE", DEFAULT_MAX_CONTENT_SIZE),
            base_url: env::var("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url),
        }
    }

    /// 指定基础地址（wiremock 测试用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
