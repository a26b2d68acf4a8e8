//! 配置校验模块
//!
//! 校验规则：
//! - pipeline / stage / link 名称符合命名语法
//! - stage 名称唯一, link 名称唯一
//! - link 字段名合法
//! - execution 参数合法 (capacity > 0, timeout > 0, 0 < threshold <= 1)
//!
//! 图结构 (悬空引用, 自环, 字段冲突, schema 兼容性) 由 compiler 校验。

use std::collections::HashSet;

use contracts::{
    validate_field_name, validate_resource_name, ContractError, ExecutionConfig, PipelineConfig,
};

/// 校验 PipelineConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &PipelineConfig) -> Result<(), ContractError> {
    validate_resource_name("pipeline", &config.name)?;
    validate_stages(config)?;
    validate_links(config)?;
    validate_execution(&config.execution)?;
    Ok(())
}

/// 校验 stage 名称与唯一性
fn validate_stages(config: &PipelineConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, stage) in config.stages.iter().enumerate() {
        validate_resource_name("stage", &stage.name)?;
        if !seen.insert(stage.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("stages[{idx}].name"),
                format!("duplicate stage name '{}'", stage.name),
            ));
        }
        if stage.method.is_empty() {
            return Err(ContractError::config_validation(
                format!("stages[{idx}].method"),
                "method cannot be empty",
            ));
        }
    }
    Ok(())
}

/// 校验 link 名称与字段名
fn validate_links(config: &PipelineConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, link) in config.links.iter().enumerate() {
        validate_resource_name("link", &link.name)?;
        if !seen.insert(link.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("links[{idx}].name"),
                format!("duplicate link name '{}'", link.name),
            ));
        }
        validate_field_name(&link.source_field)?;
        validate_field_name(&link.target_field)?;
    }
    Ok(())
}

/// 校验运行参数
fn validate_execution(execution: &ExecutionConfig) -> Result<(), ContractError> {
    if execution.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "execution.channel_capacity",
            "channel_capacity must be > 0",
        ));
    }
    if execution.call_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "execution.call_timeout_ms",
            "call_timeout_ms must be > 0",
        ));
    }
    if execution.drain_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "execution.drain_interval_ms",
            "drain_interval_ms must be > 0",
        ));
    }
    if !(execution.drain_threshold > 0.0 && execution.drain_threshold <= 1.0) {
        return Err(ContractError::config_validation(
            "execution.drain_threshold",
            format!(
                "drain_threshold must be in (0, 1], got {}",
                execution.drain_threshold
            ),
        ));
    }
    Ok(())
}
