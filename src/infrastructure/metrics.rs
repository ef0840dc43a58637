use std::sync::atomic::{AtomicU64, Ordering};

/// 单次 OpenRouter 调用的结果标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Error,
}

/// 遥测接收器
///
/// 客户端每次调用（无论成败）都会记录一次结果和耗时。
/// 以注入接口的形式存在，核心逻辑不依赖具体的指标后端。
pub trait MetricsSink: Send + Sync {
    fn record_call(&self, outcome: CallOutcome);
    fn observe_latency(&self, latency_ms: u64);
}

/// 延迟直方图桶边界（毫秒）
const LATENCY_BUCKETS_MS: [u64; 8] = [100, 250, 500, 1000, 2500, 5000, 10000, 30000];

/// 进程内原子计数器实现
///
/// 并发递增安全，无锁。
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    success_calls: AtomicU64,
    error_calls: AtomicU64,
    // 各桶独立计数，样本只落入一个桶（最后一个为上溢桶）
    latency_buckets: [AtomicU64; 9],
    latency_sum_ms: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计调用次数（成功 + 失败）
    pub fn total_calls(&self) -> u64 {
        self.success_calls.load(Ordering::Relaxed) + self.error_calls.load(Ordering::Relaxed)
    }

    pub fn success_calls(&self) -> u64 {
        self.success_calls.load(Ordering::Relaxed)
    }

    pub fn error_calls(&self) -> u64 {
        self.error_calls.load(Ordering::Relaxed)
    }

    /// 观测到的延迟样本总数
    pub fn latency_count(&self) -> u64 {
        self.latency_buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .sum()
    }

    pub fn latency_sum_ms(&self) -> u64 {
        self.latency_sum_ms.load(Ordering::Relaxed)
    }
}

impl MetricsSink for AtomicMetrics {
    fn record_call(&self, outcome: CallOutcome) {
        match outcome {
            CallOutcome::Success => self.success_calls.fetch_add(1, Ordering::Relaxed),
            CallOutcome::Error => self.error_calls.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn observe_latency(&self, latency_ms: u64) {
        let index = LATENCY_BUCKETS_MS
            .iter()
            .position(|&upper| latency_ms <= upper)
            .unwrap_or(LATENCY_BUCKETS_MS.len());
        self.latency_buckets[index].fetch_add(1, Ordering::Relaxed);
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }
}
