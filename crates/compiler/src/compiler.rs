//! Compiler - turns a `PipelineConfig` into a `Pipeline`
//!
//! Two passes over an index-based arena:
//! 1. condense: validate names, resolve methods, build and check links
//! 2. augment: give every user stage exactly one whole-message input and
//!    output by synthesizing Source/Sink/Merge/Split adapters
//!
//! The arena is frozen into name-ordered maps at the end.

use std::collections::{BTreeMap, HashMap, HashSet};

use contracts::{
    LinkConfig, LinkName, MessageDesc, MessageField, MethodId, MethodLoader, Mode,
    PipelineConfig, PipelineName, StageConfig, StageName,
};
use tracing::{debug, info, instrument};

use crate::error::{CompileError, Result};
use crate::graph::{Endpoint, Invocation, Link, Pipeline, Stage, StageKind};

/// Graph compiler
pub struct Compiler<L> {
    loader: L,
}

impl<L: MethodLoader + Sync> Compiler<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Compile a pipeline config
    ///
    /// Stages and links are checked in declaration order; the first error
    /// wins.
    #[instrument(name = "compiler_compile", skip(self, config), fields(pipeline = %config.name))]
    pub async fn compile(&self, config: &PipelineConfig) -> Result<Pipeline> {
        let name = PipelineName::parse(&config.name)
            .map_err(|e| CompileError::name("pipeline", e))?;

        let mut arena = Arena::default();
        for stage in &config.stages {
            self.add_stage(&mut arena, stage).await?;
        }
        for link in &config.links {
            arena.add_user_link(link)?;
        }

        arena.augment();

        let pipeline = arena.freeze(name, config.mode);
        info!(
            stages = pipeline.stage_count(),
            links = pipeline.link_count(),
            adapters = pipeline.adapters().count(),
            "pipeline compiled"
        );
        Ok(pipeline)
    }

    async fn add_stage(&self, arena: &mut Arena, config: &StageConfig) -> Result<()> {
        let name = StageName::parse(&config.name)
            .map_err(|e| CompileError::name(format!("stage '{}'", config.name), e))?;
        if arena.stage_index.contains_key(&name) {
            return Err(CompileError::DuplicateStage {
                stage: name.to_string(),
            });
        }

        let method_id = MethodId::new(&config.method);
        let method = self
            .loader
            .load(&method_id)
            .await
            .map_err(|source| CompileError::MethodLoad {
                stage: name.to_string(),
                method: config.method.clone(),
                source,
            })?;

        debug!(stage = %name, method = %method_id, "stage resolved");
        arena.push_stage(name, StageKind::Unary, Invocation { method_id, method });
        Ok(())
    }
}

struct StageNode {
    name: StageName,
    kind: StageKind,
    invocation: Invocation,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
}

struct LinkNode {
    name: LinkName,
    source: usize,
    source_field: MessageField,
    target: usize,
    target_field: MessageField,
}

/// Internal link between a user stage and its adapter, e.g. `"gen:aux-source-link"`
fn adapter_link_name(stage: &StageName, kind: StageKind) -> LinkName {
    LinkName::synthesized(stage.as_str(), &format!("{}-link", kind.adapter_suffix()))
}

#[derive(Default)]
struct Arena {
    stages: Vec<StageNode>,
    links: Vec<LinkNode>,
    stage_index: HashMap<StageName, usize>,
    link_names: HashSet<LinkName>,
}

impl Arena {
    fn push_stage(&mut self, name: StageName, kind: StageKind, invocation: Invocation) -> usize {
        let idx = self.stages.len();
        self.stage_index.insert(name.clone(), idx);
        self.stages.push(StageNode {
            name,
            kind,
            invocation,
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
        idx
    }

    fn push_link(
        &mut self,
        name: LinkName,
        (source, source_field): (usize, MessageField),
        (target, target_field): (usize, MessageField),
    ) -> usize {
        let idx = self.links.len();
        self.link_names.insert(name.clone());
        self.links.push(LinkNode {
            name,
            source,
            source_field,
            target,
            target_field,
        });
        self.stages[source].outputs.push(idx);
        self.stages[target].inputs.push(idx);
        idx
    }

    fn resolve_stage(&self, link: &LinkName, stage: &str) -> Result<usize> {
        self.stage_index
            .get(stage)
            .copied()
            .ok_or_else(|| CompileError::unknown_stage(link.as_str(), stage))
    }

    fn add_user_link(&mut self, config: &LinkConfig) -> Result<()> {
        let name = LinkName::parse(&config.name)
            .map_err(|e| CompileError::name(format!("link '{}'", config.name), e))?;
        if self.link_names.contains(&name) {
            return Err(CompileError::DuplicateLink {
                link: name.to_string(),
            });
        }
        let scope = || format!("link '{name}'");
        let source_field =
            MessageField::parse(&config.source_field).map_err(|e| CompileError::name(scope(), e))?;
        let target_field =
            MessageField::parse(&config.target_field).map_err(|e| CompileError::name(scope(), e))?;

        if config.source_stage.is_empty() {
            return Err(CompileError::EmptyEndpoint {
                link: name.to_string(),
                side: "source",
            });
        }
        if config.target_stage.is_empty() {
            return Err(CompileError::EmptyEndpoint {
                link: name.to_string(),
                side: "target",
            });
        }
        if config.source_stage == config.target_stage {
            return Err(CompileError::SelfLink {
                link: name.to_string(),
                stage: config.source_stage.clone(),
            });
        }

        let source = self.resolve_stage(&name, &config.source_stage)?;
        let target = self.resolve_stage(&name, &config.target_stage)?;

        self.check_schemas(&name, (source, &source_field), (target, &target_field))?;
        self.check_target_exclusivity(&name, target, &target_field)?;

        debug!(link = %name, source = %config.source_stage, target = %config.target_stage, "link added");
        self.push_link(name, (source, source_field), (target, target_field));
        Ok(())
    }

    fn check_schemas(
        &self,
        link: &LinkName,
        (source, source_field): (usize, &MessageField),
        (target, target_field): (usize, &MessageField),
    ) -> Result<()> {
        let project = |idx: usize, field: &MessageField, emitted: bool| {
            let node = &self.stages[idx];
            let method = node.invocation.method.as_ref();
            let desc = if emitted {
                node.kind.emitted(method)
            } else {
                node.kind.accepted(method)
            };
            desc.field(field).map_err(|source| CompileError::FieldProjection {
                link: link.to_string(),
                stage: node.name.to_string(),
                field: field.to_string(),
                source,
            })
        };

        let emitted = project(source, source_field, true)?;
        let accepted = project(target, target_field, false)?;
        if !emitted.compatible(accepted.as_ref()) {
            return Err(CompileError::IncompatibleSchema {
                link: link.to_string(),
                source_type: emitted.name().to_string(),
                target_type: accepted.name().to_string(),
            });
        }
        Ok(())
    }

    /// 整消息输入独占: a whole-message link excludes every other input
    fn check_target_exclusivity(
        &self,
        link: &LinkName,
        target: usize,
        field: &MessageField,
    ) -> Result<()> {
        let node = &self.stages[target];
        for &existing in &node.inputs {
            let existing = &self.links[existing];
            let conflict = if field.is_whole() {
                Some(CompileError::WholeMessageConflict {
                    stage: node.name.to_string(),
                    link: link.to_string(),
                    existing: existing.name.to_string(),
                })
            } else if existing.target_field.is_whole() {
                Some(CompileError::FieldAfterWholeMessage {
                    stage: node.name.to_string(),
                    link: link.to_string(),
                    field: field.to_string(),
                    existing: existing.name.to_string(),
                })
            } else if existing.target_field == *field {
                Some(CompileError::DuplicateTargetField {
                    stage: node.name.to_string(),
                    link: link.to_string(),
                    field: field.to_string(),
                    existing: existing.name.to_string(),
                })
            } else {
                None
            };
            if let Some(err) = conflict {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Synthesize adapters so every user stage has one whole-message input
    /// and one whole-message output
    fn augment(&mut self) {
        let user_stages = self.stages.len();
        for idx in 0..user_stages {
            self.augment_inputs(idx);
            self.augment_outputs(idx);
        }
    }

    fn augment_inputs(&mut self, idx: usize) {
        let inputs = self.stages[idx].inputs.clone();
        let kind = match inputs.as_slice() {
            [] => StageKind::Source,
            [only] if self.links[*only].target_field.is_whole() => return,
            _ => StageKind::Merge,
        };

        let adapter = self.push_adapter(idx, kind);
        for &link in &inputs {
            self.links[link].target = adapter;
        }
        self.stages[adapter].inputs = inputs;
        self.stages[idx].inputs.clear();

        let name = adapter_link_name(&self.stages[idx].name, kind);
        self.push_link(
            name,
            (adapter, MessageField::whole()),
            (idx, MessageField::whole()),
        );
    }

    fn augment_outputs(&mut self, idx: usize) {
        let outputs = self.stages[idx].outputs.clone();
        let kind = match outputs.as_slice() {
            [] => StageKind::Sink,
            [only] if self.links[*only].source_field.is_whole() => return,
            _ => StageKind::Split,
        };

        let adapter = self.push_adapter(idx, kind);
        for &link in &outputs {
            self.links[link].source = adapter;
        }
        self.stages[adapter].outputs = outputs;
        self.stages[idx].outputs.clear();

        let name = adapter_link_name(&self.stages[idx].name, kind);
        self.push_link(
            name,
            (idx, MessageField::whole()),
            (adapter, MessageField::whole()),
        );
    }

    fn push_adapter(&mut self, base: usize, kind: StageKind) -> usize {
        let node = &self.stages[base];
        let name = StageName::synthesized(node.name.as_str(), kind.adapter_suffix());
        let invocation = node.invocation.clone();
        debug!(stage = %node.name, adapter = %name, kind = %kind, "adapter synthesized");
        self.push_stage(name, kind, invocation)
    }

    fn freeze(self, name: PipelineName, mode: Mode) -> Pipeline {
        let link_name = |idx: &usize| self.links[*idx].name.clone();

        let stages = self
            .stages
            .iter()
            .map(|node| {
                let stage = Stage {
                    name: node.name.clone(),
                    kind: node.kind,
                    invocation: node.invocation.clone(),
                    inputs: node.inputs.iter().map(link_name).collect(),
                    outputs: node.outputs.iter().map(link_name).collect(),
                };
                (node.name.clone(), stage)
            })
            .collect::<BTreeMap<_, _>>();

        let links = self
            .links
            .iter()
            .map(|node| {
                let link = Link {
                    name: node.name.clone(),
                    source: Endpoint {
                        stage: self.stages[node.source].name.clone(),
                        field: node.source_field.clone(),
                    },
                    target: Endpoint {
                        stage: self.stages[node.target].name.clone(),
                        field: node.target_field.clone(),
                    },
                };
                (node.name.clone(), link)
            })
            .collect::<BTreeMap<_, _>>();

        Pipeline::new(name, mode, stages, links)
    }
}
