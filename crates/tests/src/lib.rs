//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - Config -> Compiler -> Builder -> Execution 全链路
//! - offline lockstep 与 online id 关联语义
//! - fail-fast 与取消行为

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod e2e_tests;
