//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{BridgeConfig, ImageBackendMode};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    camera_resolution: u32,
    crop: [u32; 2],
    dual_camera: bool,
    image_backend: ImageBackendMode,
    rate_hz: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    camera_resolution: config.engine.camera_resolution,
                    crop: [config.camera.width, config.camera.height],
                    dual_camera: config.engine.dual_camera,
                    image_backend: config.engine.image_backend,
                    rate_hz: config.run.rate_hz,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.engine.image_backend == ImageBackendMode::Gpu && !config.kinematic.device_images {
        warnings.push(
            "engine.image_backend is gpu but kinematic.device_images is false - engine creation will fail"
                .to_string(),
        );
    }

    if config.control.reset_grace_sec == 0.0 {
        warnings.push("control.reset_grace_sec is 0 - controls are never suppressed after reset".to_string());
    }

    // 结束条件全部关闭，horizon 是内置引擎唯一的 episode 终止来源
    if config.kinematic.horizon.is_none() {
        warnings.push("kinematic.horizon is unset - episodes never end".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Camera: {0}x{0} -> {1}x{2}",
                summary.camera_resolution, summary.crop[0], summary.crop[1]
            );
            println!("  Dual camera: {}", summary.dual_camera);
            println!("  Image backend: {:?}", summary.image_backend);
            println!("  Loop rate: {} Hz", summary.rate_hz);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
