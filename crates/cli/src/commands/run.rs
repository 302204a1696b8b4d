//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::BridgeConfig;

use super::load_config;
use crate::cli::RunArgs;
use crate::session::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        camera_resolution = config.engine.camera_resolution,
        crop = format!("{}x{}", config.camera.width, config.camera.height),
        dual_camera = config.engine.dual_camera,
        image_backend = ?config.engine.image_backend,
        rate_hz = config.run.rate_hz,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let session_config = SessionConfig {
        bridge: config,
        max_frames: if args.max_frames == 0 {
            None
        } else {
            Some(args.max_frames)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        target_speed: args.target_speed,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting driving session...");
    let stats = Session::new(session_config)
        .run(shutdown_signal())
        .await
        .context("Driving session failed")?;

    info!(
        ticks = stats.ticks,
        resets = stats.resets,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Session completed"
    );
    stats.print_summary();

    info!("Sim Bridge finished");
    Ok(())
}

/// Apply CLI overrides on top of the loaded configuration
fn apply_overrides(config: &mut BridgeConfig, args: &RunArgs) {
    if let Some(rate_hz) = args.rate_hz {
        info!(rate_hz, "Overriding loop rate from CLI");
        config.run.rate_hz = rate_hz;
    }
    if args.dual_camera {
        config.engine.dual_camera = true;
    }
    if args.headless {
        config.engine.use_render = false;
    }
    if let Some(horizon) = args.horizon {
        info!(horizon, "Overriding episode horizon from CLI");
        config.kinematic.horizon = Some(horizon);
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &BridgeConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Engine:");
    println!("  Render window: {}", config.engine.use_render);
    println!("  Image backend: {:?}", config.engine.image_backend);
    println!(
        "  Cameras: {}",
        if config.engine.dual_camera {
            "rgb_road + rgb_wide"
        } else {
            "rgb_road"
        }
    );
    println!(
        "  Resolution: {0}x{0} -> crop {1}x{2}",
        config.engine.camera_resolution, config.camera.width, config.camera.height
    );
    println!("\nLoop:");
    println!("  Rate: {} Hz", config.run.rate_hz);
    println!("  Ticks per camera frame: {}", config.run.ticks_per_frame);
    println!("\nControls:");
    println!("  Steer ratio: {}", config.control.steer_ratio);
    println!("  Throttle scale: {}", config.control.throttle_scale);
    println!("  Reset grace: {} s", config.control.reset_grace_sec);
    println!();
}
