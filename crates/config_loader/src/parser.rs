//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{BridgeConfig, ContractError};

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
pub fn parse_toml(content: &str) -> Result<BridgeConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<BridgeConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<BridgeConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ImageBackendMode;

    #[test]
    fn test_parse_toml_sections() {
        let content = r#"
[engine]
use_render = false
image_backend = "cpu"
camera_resolution = 1024
dual_camera = true

[camera]
width = 960
height = 604

[control]
reset_grace_sec = 2.5

[loop]
rate_hz = 20.0
ticks_per_frame = 4

[kinematic]
horizon = 500
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert!(!config.engine.use_render);
        assert_eq!(config.engine.image_backend, ImageBackendMode::Cpu);
        assert_eq!(config.engine.camera_resolution, 1024);
        assert!(config.engine.dual_camera);
        assert_eq!(config.engine.spawn_longitude, 15.0);
        assert_eq!((config.camera.width, config.camera.height), (960, 604));
        assert_eq!(config.control.reset_grace_sec, 2.5);
        assert_eq!(config.control.steer_ratio, 15.0);
        assert_eq!(config.run.rate_hz, 20.0);
        assert_eq!(config.run.ticks_per_frame, 4);
        assert_eq!(config.kinematic.horizon, Some(500));
    }

    #[test]
    fn test_parse_toml_empty_is_default() {
        let config = parse_toml("").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "engine": { "dual_camera": true, "image_backend": "gpu" },
            "kinematic": { "device_images": true }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.engine.image_backend, ImageBackendMode::Gpu);
        assert!(config.kinematic.device_images);
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
    fn test_parse_unknown_backend() {
        let content = r#"
[engine]
image_backend = "vulkan"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
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
