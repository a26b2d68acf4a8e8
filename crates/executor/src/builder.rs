//! Execution Builder - wires a compiled `Pipeline` into runnable stages
//!
//! Every link gets one bounded channel. Schemas are checked again on the
//! compiled graph and every stage's channel shape must match its kind.
//! Either the whole Execution is returned or nothing is: connections dialled
//! before a failure are closed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender};
use compiler::{Link, Pipeline, Stage, StageKind};
use contracts::{ExecutionConfig, LinkName, MessageDesc, MethodDesc, Mode, StageName};
use tracing::{debug, info, instrument};

use crate::drainer::Drainer;
use crate::envelope::Envelope;
use crate::error::{ExecutorError, Result};
use crate::execution::{Execution, StageSummary};
use crate::loader::{LinkLoader, StageLoader};
use crate::port::{channel, ChannelInfo, Input, Output};
use crate::stages::{MergeStage, SinkStage, SourceStage, SplitStage, StageRuntime, UnaryStage};

/// Builder for creating an Execution
pub struct ExecutionBuilder {
    config: ExecutionConfig,
}

impl ExecutionBuilder {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Build an execution for a compiled pipeline
    #[instrument(name = "execution_builder_build", skip(self, pipeline), fields(pipeline = %pipeline.name()))]
    pub async fn build(&self, pipeline: &Pipeline) -> Result<Execution> {
        self.build_from(pipeline, pipeline).await
    }

    /// Build from arbitrary stage / link loaders
    pub async fn build_from<S, L>(&self, stage_loader: &S, link_loader: &L) -> Result<Execution>
    where
        S: StageLoader + Sync,
        L: LinkLoader + Sync,
    {
        let mode = stage_loader.mode();
        let stages = stage_loader
            .stage_names()
            .iter()
            .map(|name| stage_loader.load_stage(name))
            .collect::<Result<Vec<_>>>()?;
        let index: HashMap<&str, &Stage> = stages.iter().map(|s| (s.name.as_str(), s)).collect();

        let links = load_links(&stages, &index, link_loader)?;
        for stage in &stages {
            check_shape(stage)?;
        }

        let mut wiring = Wiring::allocate(&links, self.config.channel_capacity);
        let plans = stages
            .iter()
            .map(|stage| self.plan(stage, mode, &links, &mut wiring))
            .collect::<Result<Vec<_>>>()?;

        let summaries = stages
            .iter()
            .map(|s| StageSummary {
                name: s.name.clone(),
                kind: s.kind,
                inputs: s.inputs.len(),
                outputs: s.outputs.len(),
            })
            .collect();

        let runtimes = dial_all(plans, self.config.call_timeout()).await?;

        let drainer = (mode == Mode::Online).then(|| {
            Drainer::new(
                wiring.channels.clone(),
                self.config.drain_interval(),
                self.config.drain_threshold,
            )
        });

        info!(
            stages = runtimes.len(),
            channels = wiring.channels.len(),
            capacity = self.config.channel_capacity,
            "Execution built"
        );
        Ok(Execution::new(
            stage_loader.pipeline_name().clone(),
            mode,
            runtimes,
            summaries,
            wiring.channels,
            drainer,
        ))
    }

    fn plan(
        &self,
        stage: &Stage,
        mode: Mode,
        links: &BTreeMap<LinkName, Link>,
        wiring: &mut Wiring,
    ) -> Result<Plan> {
        let name = stage.name.clone();
        let mut inputs = stage
            .inputs
            .iter()
            .map(|l| wiring.input(l, &links[l]))
            .collect::<Result<Vec<_>>>()?;
        let mut outputs = stage
            .outputs
            .iter()
            .map(|l| wiring.output(l, &links[l]))
            .collect::<Result<Vec<_>>>()?;

        // shapes were checked, so the pops below cannot fail
        let request = || stage.kind.emitted(stage.method()).empty_gen();
        let plan = match (stage.kind, inputs.pop(), outputs.pop()) {
            (StageKind::Source, None, Some(output)) => Plan::Ready(StageRuntime::Source(SourceStage {
                name,
                output,
                request: request(),
                limit: self.config.source_limit,
            })),
            (StageKind::Sink, Some(input), None) => {
                Plan::Ready(StageRuntime::Sink(SinkStage { name, input }))
            }
            (StageKind::Unary, Some(input), Some(output)) => Plan::Unary {
                name,
                input,
                output,
                method: Arc::clone(&stage.invocation.method),
            },
            (StageKind::Merge, Some(last), Some(output)) => {
                inputs.push(last);
                Plan::Ready(StageRuntime::Merge(MergeStage {
                    name,
                    mode,
                    inputs,
                    output,
                    request: request(),
                }))
            }
            (StageKind::Split, Some(input), Some(last)) => {
                outputs.push(last);
                Plan::Ready(StageRuntime::Split(SplitStage {
                    name,
                    input,
                    outputs,
                }))
            }
            _ => return Err(shape_error(stage)),
        };
        Ok(plan)
    }
}

/// Stage waiting for its connection
enum Plan {
    Ready(StageRuntime),
    Unary {
        name: StageName,
        input: Input,
        output: Output,
        method: Arc<dyn MethodDesc>,
    },
}

/// Per-link channel ends, each handed out once
struct Wiring {
    senders: HashMap<LinkName, Sender<Envelope>>,
    receivers: HashMap<LinkName, Receiver<Envelope>>,
    channels: Vec<ChannelInfo>,
}

impl Wiring {
    fn allocate(links: &BTreeMap<LinkName, Link>, capacity: usize) -> Self {
        let mut wiring = Self {
            senders: HashMap::with_capacity(links.len()),
            receivers: HashMap::with_capacity(links.len()),
            channels: Vec::with_capacity(links.len()),
        };
        for name in links.keys() {
            let (tx, rx) = channel(capacity);
            wiring
                .channels
                .push(ChannelInfo::new(name.clone(), capacity, rx.clone()));
            wiring.senders.insert(name.clone(), tx);
            wiring.receivers.insert(name.clone(), rx);
            debug!(link = %name, capacity, "channel allocated");
        }
        wiring
    }

    fn input(&mut self, name: &LinkName, link: &Link) -> Result<Input> {
        let rx = self
            .receivers
            .remove(name)
            .ok_or_else(|| ExecutorError::missing_link(name.as_str()))?;
        Ok(Input::new(name.clone(), link.target.field.clone(), rx))
    }

    fn output(&mut self, name: &LinkName, link: &Link) -> Result<Output> {
        let tx = self
            .senders
            .remove(name)
            .ok_or_else(|| ExecutorError::missing_link(name.as_str()))?;
        Ok(Output::new(name.clone(), link.source.field.clone(), tx))
    }
}

/// Load every referenced link and check both of its endpoint schemas
fn load_links<L: LinkLoader>(
    stages: &[Stage],
    index: &HashMap<&str, &Stage>,
    loader: &L,
) -> Result<BTreeMap<LinkName, Link>> {
    let mut links = BTreeMap::new();
    for stage in stages {
        for name in stage.inputs.iter().chain(&stage.outputs) {
            if links.contains_key(name) {
                continue;
            }
            let link = loader.load_link(name)?;
            let source = index
                .get(link.source.stage.as_str())
                .ok_or_else(|| ExecutorError::missing_stage(link.source.stage.as_str()))?;
            let target = index
                .get(link.target.stage.as_str())
                .ok_or_else(|| ExecutorError::missing_stage(link.target.stage.as_str()))?;
            check_link_schema(&link, source, target)?;
            links.insert(name.clone(), link);
        }
    }
    Ok(links)
}

fn check_link_schema(link: &Link, source: &Stage, target: &Stage) -> Result<()> {
    let schema_err = |source| ExecutorError::Schema {
        link: link.name.to_string(),
        source,
    };
    let emitted = source.emits(&link.source.field).map_err(schema_err)?;
    let accepted = target.accepts(&link.target.field).map_err(schema_err)?;
    if !emitted.compatible(accepted.as_ref()) {
        return Err(ExecutorError::IncompatibleSchema {
            link: link.name.to_string(),
            source_type: emitted.name().to_string(),
            target_type: accepted.name().to_string(),
        });
    }
    Ok(())
}

fn check_shape(stage: &Stage) -> Result<()> {
    let (inputs, outputs) = (stage.inputs.len(), stage.outputs.len());
    let ok = match stage.kind {
        StageKind::Source => inputs == 0 && outputs == 1,
        StageKind::Sink => inputs == 1 && outputs == 0,
        StageKind::Unary => inputs == 1 && outputs == 1,
        StageKind::Merge => inputs >= 1 && outputs == 1,
        StageKind::Split => inputs == 1 && outputs >= 1,
    };
    if ok {
        Ok(())
    } else {
        Err(shape_error(stage))
    }
}

fn shape_error(stage: &Stage) -> ExecutorError {
    ExecutorError::Cardinality {
        stage: stage.name.to_string(),
        kind: stage.kind.to_string(),
        inputs: stage.inputs.len(),
        outputs: stage.outputs.len(),
    }
}

/// Dial one connection per Unary stage; on failure close what was opened
async fn dial_all(plans: Vec<Plan>, call_timeout: Duration) -> Result<Vec<StageRuntime>> {
    let mut runtimes = Vec::with_capacity(plans.len());
    for plan in plans {
        match plan {
            Plan::Ready(runtime) => runtimes.push(runtime),
            Plan::Unary {
                name,
                input,
                output,
                method,
            } => match method.dial().await {
                Ok(conn) => {
                    debug!(stage = %name, "connection dialled");
                    runtimes.push(StageRuntime::Unary(UnaryStage {
                        name,
                        input,
                        output,
                        conn,
                        call_timeout,
                    }))
                }
                Err(source) => {
                    for runtime in runtimes {
                        runtime.discard().await;
                    }
                    return Err(ExecutorError::Dial {
                        stage: name.to_string(),
                        source,
                    });
                }
            },
        }
    }
    Ok(runtimes)
}
