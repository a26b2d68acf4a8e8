//! Channel Drainer
//!
//! 在线环形流水线的防死锁阀门：周期性扫描所有 channel，
//! 填充率达到阈值的 channel 会被整体清空（丢弃缓冲的消息）。
//! 仅用于 online 模式；online merge 可以容忍丢失的 id。

use std::time::Duration;

use observability::metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::port::ChannelInfo;

/// Default fill ratio at which a channel is drained
pub const DEFAULT_DRAIN_THRESHOLD: f64 = 0.7;

pub struct Drainer {
    channels: Vec<ChannelInfo>,
    interval: Duration,
    threshold: f64,
}

impl Drainer {
    pub fn new(channels: Vec<ChannelInfo>, interval: Duration, threshold: f64) -> Self {
        Self {
            channels,
            interval,
            threshold,
        }
    }

    /// Scan every channel once; returns the number of envelopes discarded
    pub fn drain_once(&self) -> usize {
        let mut total = 0;
        for channel in &self.channels {
            let len = channel.len();
            metrics::record_channel_depth(channel.link(), len);
            if (len as f64) < self.threshold * channel.capacity() as f64 {
                continue;
            }

            // bounded to one channel's worth
            let mut drained = 0;
            while drained < channel.capacity() && channel.try_pop().is_some() {
                drained += 1;
            }
            if drained > 0 {
                debug!(link = %channel.link(), len, drained, "channel drained");
                metrics::record_channel_drained(channel.link(), drained);
            }
            total += drained;
        }
        total
    }

    /// Drain every `interval` until cancelled
    #[instrument(name = "drainer_run", skip_all, fields(channels = self.channels.len()))]
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut total = 0usize;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => total += self.drain_once(),
            }
        }
        info!(drained = total, "Drainer stopped");
    }
}
