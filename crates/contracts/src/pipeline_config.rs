//! PipelineConfig - Config Loader output, Compiler input
//!
//! Declarative stage/link description plus execution settings.
//! Names are kept as raw strings here; the compiler validates them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Bounded, lockstep execution
    #[default]
    Offline,
    /// Continuous execution with id-correlated fan-in
    Online,
}

/// Complete pipeline description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Pipeline name
    pub name: String,

    /// Execution mode
    #[serde(default)]
    pub mode: Mode,

    /// Stage declarations, in declaration order
    #[serde(default)]
    pub stages: Vec<StageConfig>,

    /// Link declarations, in declaration order
    #[serde(default)]
    pub links: Vec<LinkConfig>,

    /// Runtime settings
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Stage declaration: one unary remote method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Unique stage name
    pub name: String,

    /// Opaque method identifier resolved by a `MethodLoader`
    pub method: String,
}

/// Link declaration: directed edge, optionally projecting fields on either side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Unique link name
    pub name: String,

    /// Producing stage
    pub source_stage: String,

    /// Field of the source output to forward (empty = whole message)
    #[serde(default)]
    pub source_field: String,

    /// Consuming stage
    pub target_stage: String,

    /// Field of the target input to set (empty = whole message)
    #[serde(default)]
    pub target_field: String,
}

impl StageConfig {
    pub fn new(name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
        }
    }
}

impl LinkConfig {
    /// Whole-message link
    pub fn new(
        name: impl Into<String>,
        source_stage: impl Into<String>,
        target_stage: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_stage: source_stage.into(),
            source_field: String::new(),
            target_stage: target_stage.into(),
            target_field: String::new(),
        }
    }

    /// Set the projected source field
    pub fn from_field(mut self, field: impl Into<String>) -> Self {
        self.source_field = field.into();
        self
    }

    /// Set the targeted input field
    pub fn to_field(mut self, field: impl Into<String>) -> Self {
        self.target_field = field.into();
        self
    }
}

/// Runtime settings shared by the execution builder and controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Capacity of every link channel
    pub channel_capacity: usize,

    /// Timeout of one remote call (milliseconds)
    pub call_timeout_ms: u64,

    /// Drainer scan interval (milliseconds)
    pub drain_interval_ms: u64,

    /// Fill ratio at which the drainer empties a channel (online only)
    pub drain_threshold: f64,

    /// Messages each source emits before closing its output (None = unbounded)
    pub source_limit: Option<u64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
            call_timeout_ms: 10_000,
            drain_interval_ms: 100,
            drain_threshold: 0.7,
            source_limit: None,
        }
    }
}

impl ExecutionConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}
