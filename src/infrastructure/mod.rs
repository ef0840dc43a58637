pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod redact;

pub use config::AppConfig;
pub use error::ReviewError;
pub use metrics::{AtomicMetrics, CallOutcome, MetricsSink};
