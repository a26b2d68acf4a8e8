//! Compiler error types
//!
//! Every structural error names the offending stage or link.

use contracts::ContractError;
use thiserror::Error;

/// Graph compilation error
#[derive(Debug, Error)]
pub enum CompileError {
    /// Name does not match the grammar
    #[error("invalid name in {scope}: {source}")]
    Name {
        scope: String,
        #[source]
        source: ContractError,
    },

    /// Two stages share a name
    #[error("duplicate stage '{stage}'")]
    DuplicateStage { stage: String },

    /// Method resolution failed
    #[error("stage '{stage}': cannot load method '{method}': {source}")]
    MethodLoad {
        stage: String,
        method: String,
        #[source]
        source: ContractError,
    },

    /// Two links share a name
    #[error("duplicate link '{link}'")]
    DuplicateLink { link: String },

    /// Link endpoint without a stage
    #[error("link '{link}': {side} stage is empty")]
    EmptyEndpoint { link: String, side: &'static str },

    /// Link from a stage to itself
    #[error("link '{link}': source and target are both stage '{stage}'")]
    SelfLink { link: String, stage: String },

    /// Link references an undeclared stage
    #[error("link '{link}': unknown stage '{stage}'")]
    UnknownStage { link: String, stage: String },

    /// Projected field missing on the endpoint schema
    #[error("link '{link}': cannot project field '{field}' of stage '{stage}': {source}")]
    FieldProjection {
        link: String,
        stage: String,
        field: String,
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

    /// A link claims the whole input while another link is already connected
    #[error("link '{link}': sets the whole input of stage '{stage}' but link '{existing}' is already connected")]
    WholeMessageConflict {
        stage: String,
        link: String,
        existing: String,
    },

    /// A link targets a field while another link claims the whole input
    #[error("link '{link}': targets field '{field}' of stage '{stage}' but link '{existing}' sets the whole input")]
    FieldAfterWholeMessage {
        stage: String,
        link: String,
        field: String,
        existing: String,
    },

    /// Two links target the same field
    #[error("link '{link}': field '{field}' of stage '{stage}' is already set by link '{existing}'")]
    DuplicateTargetField {
        stage: String,
        link: String,
        field: String,
        existing: String,
    },
}

impl CompileError {
    /// Create name error
    pub fn name(scope: impl Into<String>, source: ContractError) -> Self {
        Self::Name {
            scope: scope.into(),
            source,
        }
    }

    /// Create unknown stage error
    pub fn unknown_stage(link: impl Into<String>, stage: impl Into<String>) -> Self {
        Self::UnknownStage {
            link: link.into(),
            stage: stage.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, CompileError>;
