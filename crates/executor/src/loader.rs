//! Stage / link lookup used by the execution builder

use compiler::{Link, Pipeline, Stage};
use contracts::{LinkName, Mode, PipelineName, StageName};

use crate::error::{ExecutorError, Result};

/// Resolves compiled stage names
pub trait StageLoader {
    fn pipeline_name(&self) -> &PipelineName;

    fn mode(&self) -> Mode;

    /// Every stage name, in a stable order
    fn stage_names(&self) -> Vec<StageName>;

    fn load_stage(&self, name: &StageName) -> Result<Stage>;
}

/// Resolves compiled link names
pub trait LinkLoader {
    fn load_link(&self, name: &LinkName) -> Result<Link>;
}

impl StageLoader for Pipeline {
    fn pipeline_name(&self) -> &PipelineName {
        self.name()
    }

    fn mode(&self) -> Mode {
        Pipeline::mode(self)
    }

    fn stage_names(&self) -> Vec<StageName> {
        self.stages().map(|s| s.name.clone()).collect()
    }

    fn load_stage(&self, name: &StageName) -> Result<Stage> {
        self.stage(name)
            .cloned()
            .ok_or_else(|| ExecutorError::missing_stage(name.as_str()))
    }
}

impl LinkLoader for Pipeline {
    fn load_link(&self, name: &LinkName) -> Result<Link> {
        self.link(name)
            .cloned()
            .ok_or_else(|| ExecutorError::missing_link(name.as_str()))
    }
}
