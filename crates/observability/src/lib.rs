//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式, 支持 RUST_LOG)
//! - Prometheus 导出：HTTP 端点，或进程内 handle (按需 render)
//! - 流水线 stage / channel 指标
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{MetricsExporter, ObservabilityConfig};
//!
//! let obs = observability::init_with_config(ObservabilityConfig {
//!     metrics: MetricsExporter::InMemory,
//!     ..Default::default()
//! })?;
//!
//! observability::metrics::record_stage_message("double", "unary");
//! println!("{}", obs.render().unwrap_or_default());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_call_latency_ms, record_channel_depth, record_channel_drained, record_merge_skip,
    record_stage_error, record_stage_message, RunningStats,
};

/// Histogram buckets for `pipeline_call_latency_ms`
pub const CALL_LATENCY_BUCKETS_MS: &[f64] = &[
    0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0,
];

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 指标导出方式
    pub metrics: MetricsExporter,
    /// 默认日志级别 (RUST_LOG 优先)
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics: MetricsExporter::Disabled,
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// Prometheus recorder installation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetricsExporter {
    /// No recorder; metric helpers are no-ops
    #[default]
    Disabled,
    /// Scrape endpoint on `0.0.0.0:<port>`
    Http { port: u16 },
    /// Recorder only, rendered through [`Observability::render`]
    InMemory,
}

/// Handle returned by [`init_with_config`]
#[derive(Clone, Default)]
pub struct Observability {
    prometheus: Option<PrometheusHandle>,
}

impl Observability {
    /// Current metrics in Prometheus text format (in-memory exporter only)
    pub fn render(&self) -> Option<String> {
        self.prometheus.as_ref().map(PrometheusHandle::render)
    }
}

/// 初始化 tracing subscriber 与 Prometheus recorder
///
/// 进程内只能调用一次；重复调用返回错误。
pub fn init_with_config(config: ObservabilityConfig) -> Result<Observability> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    let prometheus = install_metrics(config.metrics)?;

    tracing::info!(
        log_format = ?config.log_format,
        metrics = ?config.metrics,
        "Observability initialized"
    );
    Ok(Observability { prometheus })
}

fn prometheus_builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("pipeline_call_latency_ms".to_string()),
            CALL_LATENCY_BUCKETS_MS,
        )
        .context("Invalid latency buckets")
}

fn install_metrics(exporter: MetricsExporter) -> Result<Option<PrometheusHandle>> {
    match exporter {
        MetricsExporter::Disabled => Ok(None),
        MetricsExporter::Http { port } => {
            prometheus_builder()?
                .with_http_listener(([0, 0, 0, 0], port))
                .install()
                .context("Failed to install Prometheus recorder")?;
            tracing::info!(port, "Prometheus metrics endpoint initialized");
            Ok(None)
        }
        MetricsExporter::InMemory => {
            let handle = prometheus_builder()?
                .install_recorder()
                .context("Failed to install Prometheus recorder")?;
            Ok(Some(handle))
        }
    }
}
