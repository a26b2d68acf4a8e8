//! Pipeline 指标收集模块
//!
//! Stage 吞吐、错误、调用延迟，以及 channel 深度与 drain 统计。
//! 未安装 recorder 时所有函数均为空操作。

use metrics::{counter, gauge, histogram};

/// 记录 stage 处理的一条消息
pub fn record_stage_message(stage: &str, kind: &'static str) {
    counter!(
        "pipeline_stage_messages_total",
        "stage" => stage.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// 记录 stage 运行失败
pub fn record_stage_error(stage: &str) {
    counter!("pipeline_stage_errors_total", "stage" => stage.to_string()).increment(1);
}

/// 记录一次远程调用耗时
pub fn record_call_latency_ms(stage: &str, latency_ms: f64) {
    histogram!("pipeline_call_latency_ms", "stage" => stage.to_string()).record(latency_ms);
}

/// 记录 drainer 丢弃的消息数
pub fn record_channel_drained(link: &str, count: usize) {
    counter!("pipeline_channel_drains_total", "link" => link.to_string()).increment(1);
    counter!("pipeline_channel_drained_messages_total", "link" => link.to_string())
        .increment(count as u64);
}

/// 记录 online merge 游标跳跃 (from -> to)
///
/// 跳过的 id 数量即丢弃的对齐轮次。
pub fn record_merge_skip(stage: &str, from: u64, to: u64) {
    counter!("pipeline_merge_skipped_ids_total", "stage" => stage.to_string())
        .increment(to.saturating_sub(from));
}

/// 记录 channel 当前深度
pub fn record_channel_depth(link: &str, depth: usize) {
    gauge!("pipeline_channel_depth", "link" => link.to_string()).set(depth as f64);
}

/// 在线统计计算器 (Welford's algorithm)
///
/// 用于汇总 stage 调用延迟等。
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl std::fmt::Display for RunningStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min,
                self.max,
                self.mean(),
                self.std_dev(),
                self.count
            )
        }
    }
}
