//! Compiled pipeline graph - Compiler output, Execution Builder input
//!
//! Immutable once produced. Stages and links are kept in name-ordered maps so
//! compiling the same config twice yields equal graphs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use contracts::{
    ContractError, LinkName, MessageDesc, MessageField, MethodDesc, MethodId, Mode, PipelineName,
    StageName,
};

/// Stage kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    /// User stage: one remote call per message
    Unary,
    /// Adapter: feeds a stage that has no inputs
    Source,
    /// Adapter: drains a stage that has no outputs
    Sink,
    /// Adapter: builds a stage input from several (or projected) links
    Merge,
    /// Adapter: fans a stage output out to several (or projected) links
    Split,
}

impl StageKind {
    /// Whether the compiler synthesized this stage
    pub fn is_adapter(self) -> bool {
        !matches!(self, Self::Unary)
    }

    /// Suffix used in synthesized adapter names
    pub fn adapter_suffix(self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::Source => "aux-source",
            Self::Sink => "aux-sink",
            Self::Merge => "aux-merge",
            Self::Split => "aux-split",
        }
    }

    /// Schema of messages this kind emits, given its method
    ///
    /// Adapters inherit the augmented stage's method: a Source or Merge builds
    /// that stage's request, a Split forwards its response.
    pub fn emitted(self, method: &dyn MethodDesc) -> Arc<dyn MessageDesc> {
        match self {
            Self::Unary | Self::Split | Self::Sink => method.output(),
            Self::Source | Self::Merge => method.input(),
        }
    }

    /// Schema of messages this kind accepts, given its method
    pub fn accepted(self, method: &dyn MethodDesc) -> Arc<dyn MessageDesc> {
        match self {
            Self::Unary | Self::Merge | Self::Source => method.input(),
            Self::Split | Self::Sink => method.output(),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unary => "unary",
            Self::Source => "source",
            Self::Sink => "sink",
            Self::Merge => "merge",
            Self::Split => "split",
        };
        f.write_str(s)
    }
}

/// Invocation context: method id plus the resolved method
#[derive(Clone)]
pub struct Invocation {
    pub method_id: MethodId,
    pub method: Arc<dyn MethodDesc>,
}

impl PartialEq for Invocation {
    fn eq(&self, other: &Self) -> bool {
        self.method_id == other.method_id
    }
}

impl Eq for Invocation {}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("method_id", &self.method_id)
            .finish_non_exhaustive()
    }
}

/// One side of a link
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub stage: StageName,
    /// Projected field; whole message when empty
    pub field: MessageField,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_whole() {
            write!(f, "{}", self.stage)
        } else {
            write!(f, "{}.{}", self.stage, self.field)
        }
    }
}

/// Compiled link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub name: LinkName,
    pub source: Endpoint,
    pub target: Endpoint,
}

/// Compiled stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: StageName,
    pub kind: StageKind,
    pub invocation: Invocation,
    /// Incoming links, in field order
    pub inputs: Vec<LinkName>,
    /// Outgoing links, in field order
    pub outputs: Vec<LinkName>,
}

impl Stage {
    /// Resolved method
    pub fn method(&self) -> &dyn MethodDesc {
        self.invocation.method.as_ref()
    }

    /// Schema this stage emits on a link, projected by `field`
    pub fn emits(&self, field: &MessageField) -> Result<Arc<dyn MessageDesc>, ContractError> {
        self.kind.emitted(self.method()).field(field)
    }

    /// Schema this stage accepts on a link, projected by `field`
    pub fn accepts(&self, field: &MessageField) -> Result<Arc<dyn MessageDesc>, ContractError> {
        self.kind.accepted(self.method()).field(field)
    }
}

/// Compiled pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    name: PipelineName,
    mode: Mode,
    stages: BTreeMap<StageName, Stage>,
    links: BTreeMap<LinkName, Link>,
}

impl Pipeline {
    pub(crate) fn new(
        name: PipelineName,
        mode: Mode,
        stages: BTreeMap<StageName, Stage>,
        links: BTreeMap<LinkName, Link>,
    ) -> Self {
        Self {
            name,
            mode,
            stages,
            links,
        }
    }

    pub fn name(&self) -> &PipelineName {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// All stages, user stages and adapters, ordered by name
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }

    /// All links ordered by name
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.get(name)
    }

    /// Stages declared in the config
    pub fn user_stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages().filter(|s| !s.kind.is_adapter())
    }

    /// Stages synthesized by the compiler
    pub fn adapters(&self) -> impl Iterator<Item = &Stage> {
        self.stages().filter(|s| s.kind.is_adapter())
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
