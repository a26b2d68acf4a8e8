//! Execution Controller
//!
//! Owns the runnable stages, the allocated channels and the drainer.
//! `start` spawns one task per stage (plus the drainer, online) under one
//! cancellation token; `stop` cancels and joins; `wait` joins without
//! cancelling, but the first stage error cancels everything else.

use std::collections::HashMap;

use compiler::StageKind;
use contracts::{Mode, PipelineName, StageName};
use observability::metrics;
use tokio::task::{Id, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::drainer::Drainer;
use crate::error::{ExecutorError, Result};
use crate::port::ChannelInfo;
use crate::stages::StageRuntime;

/// Shape of one runtime stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub name: StageName,
    pub kind: StageKind,
    /// Resolved input channels
    pub inputs: usize,
    /// Resolved output channels
    pub outputs: usize,
}

/// Runnable pipeline
pub struct Execution {
    name: PipelineName,
    mode: Mode,
    runtimes: Vec<StageRuntime>,
    summaries: Vec<StageSummary>,
    channels: Vec<ChannelInfo>,
    drainer: Option<Drainer>,
    cancel: CancellationToken,
    tasks: JoinSet<Result<()>>,
    task_names: HashMap<Id, StageName>,
    drainer_task: Option<JoinHandle<()>>,
    started: bool,
}

impl Execution {
    pub(crate) fn new(
        name: PipelineName,
        mode: Mode,
        runtimes: Vec<StageRuntime>,
        summaries: Vec<StageSummary>,
        channels: Vec<ChannelInfo>,
        drainer: Option<Drainer>,
    ) -> Self {
        Self {
            name,
            mode,
            runtimes,
            summaries,
            channels,
            drainer,
            cancel: CancellationToken::new(),
            tasks: JoinSet::new(),
            task_names: HashMap::new(),
            drainer_task: None,
            started: false,
        }
    }

    pub fn name(&self) -> &PipelineName {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// One entry per runtime stage, in stage-name order
    pub fn stage_summaries(&self) -> &[StageSummary] {
        &self.summaries
    }

    /// Every allocated link channel, in link-name order
    pub fn channels(&self) -> &[ChannelInfo] {
        &self.channels
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether a drainer guards the channels (online only)
    pub fn has_drainer(&self) -> bool {
        self.drainer.is_some() || self.drainer_task.is_some()
    }

    /// Spawn every stage task, plus the drainer in online mode
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(ExecutorError::AlreadyStarted);
        }
        self.started = true;

        info!(
            pipeline = %self.name,
            mode = ?self.mode,
            stages = self.runtimes.len(),
            "Execution starting"
        );

        for runtime in self.runtimes.drain(..) {
            let name = runtime.name().clone();
            let span = info_span!(
                "stage",
                pipeline = %self.name,
                stage = %name,
                kind = %runtime.kind()
            );
            let handle = self
                .tasks
                .spawn(runtime.run(self.cancel.clone()).instrument(span));
            self.task_names.insert(handle.id(), name);
        }

        if let Some(drainer) = self.drainer.take() {
            let span = info_span!("drainer", pipeline = %self.name);
            self.drainer_task = Some(tokio::spawn(
                drainer.run(self.cancel.clone()).instrument(span),
            ));
        }
        Ok(())
    }

    /// Cancel every task, wait for all of them and return the first error
    pub async fn stop(&mut self) -> Result<()> {
        info!(pipeline = %self.name, "Execution stopping");
        self.cancel.cancel();
        for runtime in self.runtimes.drain(..) {
            runtime.discard().await;
        }
        self.join_all().await
    }

    /// Wait for natural termination
    ///
    /// The first stage error cancels the remaining stages; it is returned
    /// once every task has finished.
    pub async fn wait(&mut self) -> Result<()> {
        if !self.started {
            warn!(pipeline = %self.name, "wait called before start");
        }
        self.join_all().await
    }

    async fn join_all(&mut self) -> Result<()> {
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next_with_id().await {
            let (stage, result) = match joined {
                Ok((id, result)) => (self.task_names.remove(&id), result),
                Err(e) => {
                    let stage = self.task_names.remove(&e.id());
                    let message = e.to_string();
                    let name = stage.as_ref().map(|s| s.to_string()).unwrap_or_default();
                    (stage, Err(ExecutorError::TaskFailed { stage: name, message }))
                }
            };
            let stage = stage.map(|s| s.to_string()).unwrap_or_default();

            match result {
                Ok(()) => info!(stage = %stage, "stage finished"),
                Err(e) => {
                    error!(stage = %stage, error = %e, "stage failed, cancelling pipeline");
                    metrics::record_stage_error(&stage);
                    self.cancel.cancel();
                    first_error.get_or_insert(e);
                }
            }
        }

        // stages are done; stop the drainer
        self.cancel.cancel();
        if let Some(task) = self.drainer_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "drainer task failed");
            }
        }

        info!(pipeline = %self.name, failed = first_error.is_some(), "Execution finished");
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Execution {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ExecutionBuilder;
    use crate::test_support::{collector, config, counter, failing, num, scale, Registry};
    use contracts::{ExecutionConfig, LinkConfig};
    use std::time::Duration;

    const GEN: &str = "local/demo.Gen/Next";
    const DOUBLE: &str = "local/demo.Math/Double";
    const COLLECT: &str = "local/demo.Collect/Push";
    const BAD: &str = "local/demo.Math/Bad";

    fn linear(mode: Mode) -> contracts::PipelineConfig {
        config(
            mode,
            &[("gen", GEN), ("double", DOUBLE), ("collect", COLLECT)],
            vec![
                LinkConfig::new("gen-double", "gen", "double"),
                LinkConfig::new("double-collect", "double", "collect"),
            ],
        )
    }

    async fn build(pipeline: &compiler::Pipeline, exec: ExecutionConfig) -> Execution {
        ExecutionBuilder::new(exec).build(pipeline).await.unwrap()
    }

    #[tokio::test]
    async fn test_bounded_offline_run_terminates() {
        let (collect, seen) = collector(num());
        let pipeline = Registry::default()
            .with(GEN, counter())
            .with(DOUBLE, scale(2))
            .with(COLLECT, collect)
            .compile(&linear(Mode::Offline))
            .await;
        let mut execution = build(
            &pipeline,
            ExecutionConfig {
                channel_capacity: 2,
                source_limit: Some(5),
                ..Default::default()
            },
        )
        .await;

        execution.start().unwrap();
        tokio::time::timeout(Duration::from_secs(5), execution.wait())
            .await
            .unwrap()
            .unwrap();

        let vals: Vec<i64> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|v| v["val"].as_i64().unwrap())
            .collect();
        assert_eq!(vals, vec![2, 4, 6, 8, 10]);
        assert!(execution.channels().iter().all(|c| c.is_closed()));
    }

    #[tokio::test]
    async fn test_drainer_only_in_online_mode() {
        for (mode, expected) in [(Mode::Offline, false), (Mode::Online, true)] {
            let (collect, _seen) = collector(num());
            let pipeline = Registry::default()
                .with(GEN, counter())
                .with(DOUBLE, scale(2))
                .with(COLLECT, collect)
                .compile(&linear(mode))
                .await;
            let mut execution = build(&pipeline, ExecutionConfig::default()).await;

            assert_eq!(execution.has_drainer(), expected, "{mode:?}");
            execution.start().unwrap();
            assert_eq!(execution.has_drainer(), expected, "{mode:?}");
            execution.stop().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_offline_backpressure_loses_nothing() {
        const N: usize = 30;
        let (collect, seen) = collector(num());
        let pipeline = Registry::default()
            .with(GEN, counter())
            .with(DOUBLE, scale(2))
            .with(COLLECT, collect.with_latency(Duration::from_millis(5)))
            .compile(&linear(Mode::Offline))
            .await;
        let mut execution = build(
            &pipeline,
            ExecutionConfig {
                channel_capacity: 3,
                drain_interval_ms: 1,
                source_limit: Some(N as u64),
                ..Default::default()
            },
        )
        .await;

        execution.start().unwrap();
        tokio::time::timeout(Duration::from_secs(10), execution.wait())
            .await
            .unwrap()
            .unwrap();

        let vals: Vec<i64> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|v| v["val"].as_i64().unwrap())
            .collect();
        assert_eq!(vals.len(), N);
        assert_eq!(vals, (1..=N as i64).map(|i| 2 * i).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let (collect, _seen) = collector(num());
        let pipeline = Registry::default()
            .with(GEN, counter())
            .with(DOUBLE, scale(2))
            .with(COLLECT, collect)
            .compile(&linear(Mode::Online))
            .await;
        let mut execution = build(&pipeline, ExecutionConfig::default()).await;

        execution.start().unwrap();
        assert!(matches!(execution.start(), Err(ExecutorError::AlreadyStarted)));
        execution.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_call_error_cancels_pipeline() {
        let cfg = config(
            Mode::Online,
            &[("gen", GEN), ("bad", BAD)],
            vec![LinkConfig::new("gen-bad", "gen", "bad")],
        );
        let pipeline = Registry::default()
            .with(GEN, counter())
            .with(BAD, failing())
            .compile(&cfg)
            .await;
        let mut execution = build(&pipeline, ExecutionConfig::default()).await;

        execution.start().unwrap();
        let err = tokio::time::timeout(Duration::from_secs(5), execution.wait())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Call { stage, .. } if stage == "bad"));
        assert!(execution.channels().iter().all(|c| c.is_closed()));
    }

    #[tokio::test]
    async fn test_stop_unblocks_stalled_stages() {
        let (collect, _seen) = collector(num());
        let pipeline = Registry::default()
            .with(GEN, counter())
            .with(DOUBLE, scale(2).with_latency(Duration::from_secs(60)))
            .with(COLLECT, collect)
            .compile(&linear(Mode::Offline))
            .await;
        let mut execution = build(
            &pipeline,
            ExecutionConfig {
                channel_capacity: 1,
                ..Default::default()
            },
        )
        .await;

        execution.start().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(2), execution.stop())
            .await
            .unwrap()
            .unwrap();
        assert!(execution.channels().iter().all(|c| c.is_closed()));
    }

    #[tokio::test]
    async fn test_stop_before_start_closes_connections() {
        let double = scale(2);
        let stats = double.stats();
        let (collect, _seen) = collector(num());
        let pipeline = Registry::default()
            .with(GEN, counter())
            .with(DOUBLE, double)
            .with(COLLECT, collect)
            .compile(&linear(Mode::Offline))
            .await;
        let mut execution = build(&pipeline, ExecutionConfig::default()).await;

        execution.stop().await.unwrap();
        assert_eq!(stats.dialed(), 1);
        assert_eq!(stats.closed(), 1);
    }
}
