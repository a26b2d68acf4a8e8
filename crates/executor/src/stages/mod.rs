//! Runtime stages
//!
//! One task per compiled stage. Each runs until its input closes or the
//! pipeline is cancelled; its ports close on exit either way.

mod merge;
mod sink;
mod source;
mod split;
mod unary;

pub(crate) use merge::MergeStage;
pub(crate) use sink::SinkStage;
pub(crate) use source::SourceStage;
pub(crate) use split::SplitStage;
pub(crate) use unary::UnaryStage;

use compiler::StageKind;
use contracts::StageName;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

pub(crate) enum StageRuntime {
    Source(SourceStage),
    Sink(SinkStage),
    Unary(UnaryStage),
    Merge(MergeStage),
    Split(SplitStage),
}

impl StageRuntime {
    pub fn name(&self) -> &StageName {
        match self {
            Self::Source(s) => &s.name,
            Self::Sink(s) => &s.name,
            Self::Unary(s) => &s.name,
            Self::Merge(s) => &s.name,
            Self::Split(s) => &s.name,
        }
    }

    pub fn kind(&self) -> StageKind {
        match self {
            Self::Source(_) => StageKind::Source,
            Self::Sink(_) => StageKind::Sink,
            Self::Unary(_) => StageKind::Unary,
            Self::Merge(_) => StageKind::Merge,
            Self::Split(_) => StageKind::Split,
        }
    }

    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        match self {
            Self::Source(s) => s.run(cancel).await,
            Self::Sink(s) => s.run(cancel).await,
            Self::Unary(s) => s.run(cancel).await,
            Self::Merge(s) => s.run(cancel).await,
            Self::Split(s) => s.run(cancel).await,
        }
    }

    /// Close the connection of a stage that never ran
    pub async fn discard(self) {
        if let Self::Unary(s) = self {
            if let Err(e) = s.conn.close().await {
                tracing::warn!(stage = %s.name, error = %e, "failed to close connection");
            }
        }
    }
}
