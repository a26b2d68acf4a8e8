//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, PipelineConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<PipelineConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<PipelineConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<PipelineConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Mode;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
name = "doubler"
mode = "offline"

[[stages]]
name = "source"
method = "localhost:50051/demo.Counter/Next"

[[stages]]
name = "double"
method = "localhost:50051/demo.Math/Double"

[[links]]
name = "numbers"
source_stage = "source"
target_stage = "double"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let cfg = result.unwrap();
        assert_eq!(cfg.name, "doubler");
        assert_eq!(cfg.mode, Mode::Offline);
        assert_eq!(cfg.stages.len(), 2);
        assert_eq!(cfg.links[0].source_field, "");
        assert_eq!(cfg.execution.channel_capacity, 100);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "name": "fanin",
            "mode": "online",
            "stages": [
                { "name": "a", "method": "m/s/a" },
                { "name": "b", "method": "m/s/b" }
            ],
            "links": [
                { "name": "ab", "source_stage": "a", "target_stage": "b", "target_field": "orig" }
            ],
            "execution": { "channel_capacity": 16, "source_limit": 10 }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let cfg = result.unwrap();
        assert_eq!(cfg.mode, Mode::Online);
        assert_eq!(cfg.links[0].target_field, "orig");
        assert_eq!(cfg.execution.source_limit, Some(10));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let content = r#"
name = "p"
mode = "batch"
"#;
        assert!(parse_toml(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
