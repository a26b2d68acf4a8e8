//! # Executor
//!
//! Execution engine: turns a compiled `Pipeline` into one task per stage,
//! connected by bounded channels.
//!
//! ## 组件
//! - `ExecutionBuilder`: 分配 channel、复核 schema、建立连接
//! - Stage runtimes: Source / Sink / Unary / Merge (offline + online) / Split
//! - `Drainer`: online 环形流水线的防死锁阀门
//! - `Execution`: start / stop / wait 控制器
//!
//! ## 使用示例
//!
//! ```ignore
//! let pipeline = compiler.compile(&config).await?;
//! let mut execution = ExecutionBuilder::new(config.execution.clone())
//!     .build(&pipeline)
//!     .await?;
//! execution.start()?;
//! execution.wait().await?;
//! ```

mod builder;
mod drainer;
mod envelope;
mod error;
mod execution;
mod loader;
mod port;
mod stages;

#[cfg(test)]
mod test_support;

pub use builder::ExecutionBuilder;
pub use drainer::{Drainer, DEFAULT_DRAIN_THRESHOLD};
pub use envelope::Envelope;
pub use error::{ExecutorError, Result};
pub use execution::{Execution, StageSummary};
pub use loader::{LinkLoader, StageLoader};
pub use port::ChannelInfo;
