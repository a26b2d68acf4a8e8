//! # Compiler
//!
//! Graph compiler: validates a `PipelineConfig`, resolves every stage's method
//! and synthesizes adapter stages so each user stage ends up with exactly one
//! whole-message input and one whole-message output.
//!
//! ## 职责
//! - 名称与字段校验
//! - 链路 schema 兼容性检查
//! - Source / Sink / Merge / Split 适配器合成

mod compiler;
mod error;
mod graph;

pub use compiler::Compiler;
pub use error::{CompileError, Result};
pub use graph::{Endpoint, Invocation, Link, Pipeline, Stage, StageKind};
