//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (derive 规则，见 contracts::BridgeConfig)
//! - 裁剪尺寸不超过相机渲染分辨率
//! - 抑制窗口可表示为 Duration
//! - 控制循环周期可表示且不为零

use contracts::{BridgeConfig, ContractError};
use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 BridgeConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &BridgeConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_crop(config)?;
    validate_durations(config)?;
    Ok(())
}

/// 字段范围校验
fn validate_ranges(config: &BridgeConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_error(&errors, "")
                .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

/// 按字段名排序后取第一个错误，保证报错稳定
fn first_error(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let message = match err.params.get("value") {
                        Some(value) => format!("failed '{}' check, got {value}", err.code),
                        None => format!("failed '{}' check", err.code),
                    };
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_error(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_error(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// 裁剪尺寸不能超过方形渲染分辨率
fn validate_crop(config: &BridgeConfig) -> Result<(), ContractError> {
    let size = config.engine.camera_resolution;
    let crop = &config.camera;

    if crop.width > size || crop.height > size {
        return Err(ContractError::config_validation(
            "camera.width / camera.height",
            format!(
                "crop {}x{} exceeds camera_resolution {size}",
                crop.width, crop.height
            ),
        ));
    }
    Ok(())
}

/// 范围规则放行 NaN，也不限制上界；这里按实际使用的 Duration 转换校验
fn validate_durations(config: &BridgeConfig) -> Result<(), ContractError> {
    config.control.reset_grace()?;
    config.run.period()?;
    Ok(())
}
