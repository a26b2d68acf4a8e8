//! Executor error types

use contracts::ContractError;
use thiserror::Error;

/// Build or runtime failure
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Stage referenced by the graph cannot be loaded
    #[error("stage '{stage}' not found")]
    MissingStage { stage: String },

    /// Link referenced by a stage cannot be loaded
    #[error("link '{link}' not found")]
    MissingLink { link: String },

    /// Link endpoint schema cannot be projected
    #[error("link '{link}': {source}")]
    Schema {
        link: String,
        #[source]
        source: ContractError,
    },

    /// Source and target schemas differ
    #[error("link '{link}': source type '{source_type}' is not compatible with target type '{target_type}'")]
    IncompatibleSchema {
        link: String,
        source_type: String,
        target_type: String,
    },

    /// Stage does not have the channel shape its kind requires
    #[error("stage '{stage}' ({kind}): unexpected channel shape, {inputs} input(s) and {outputs} output(s)")]
    Cardinality {
        stage: String,
        kind: String,
        inputs: usize,
        outputs: usize,
    },

    /// Connection could not be established
    #[error("stage '{stage}': dial failed: {source}")]
    Dial {
        stage: String,
        #[source]
        source: ContractError,
    },

    /// Remote call failed
    #[error("stage '{stage}': call failed: {source}")]
    Call {
        stage: String,
        #[source]
        source: ContractError,
    },

    /// Remote call exceeded its timeout
    #[error("stage '{stage}': call timed out after {timeout_ms}ms")]
    CallTimeout { stage: String, timeout_ms: u64 },

    /// Split could not extract a field
    #[error("stage '{stage}': cannot extract field for link '{link}': {source}")]
    Extract {
        stage: String,
        link: String,
        #[source]
        source: ContractError,
    },

    /// Merge could not set a field
    #[error("stage '{stage}': cannot set field from link '{link}': {source}")]
    Assemble {
        stage: String,
        link: String,
        #[source]
        source: ContractError,
    },

    /// `start` called twice
    #[error("execution already started")]
    AlreadyStarted,

    /// Stage task panicked or was aborted
    #[error("stage '{stage}' task failed: {message}")]
    TaskFailed { stage: String, message: String },
}

impl ExecutorError {
    pub fn missing_stage(stage: impl Into<String>) -> Self {
        Self::MissingStage {
            stage: stage.into(),
        }
    }

    pub fn missing_link(link: impl Into<String>) -> Self {
        Self::MissingLink { link: link.into() }
    }

    pub fn call(stage: impl Into<String>, source: ContractError) -> Self {
        Self::Call {
            stage: stage.into(),
            source,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ExecutorError>;
