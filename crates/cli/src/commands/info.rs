//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use bridge::{Bridge, EngineConfig, FaultConfig, ImageBackend, KinematicFactory};
use contracts::{BridgeConfig, ControlConfig, LoopConfig};

use super::load_config;
use crate::cli::InfoArgs;

/// Resolved configuration for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    image_backend: ImageBackend,
    crop: [u32; 2],
    engine: EngineConfig,
    control: ControlConfig,
    #[serde(rename = "loop")]
    run: LoopConfig,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let info = build_config_info(&config);
    info!(sensors = info.engine.sensors.len(), "Resolved engine configuration");

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info, args);
    }

    Ok(())
}

fn build_config_info(config: &BridgeConfig) -> ConfigInfo {
    let factory = KinematicFactory::new(config.kinematic.clone(), FaultConfig::default());
    let bridge = Bridge::new(factory, config.clone());

    ConfigInfo {
        version: format!("{:?}", config.version),
        image_backend: bridge.image_backend(),
        crop: [config.camera.width, config.camera.height],
        engine: bridge.engine_config(),
        control: config.control.clone(),
        run: config.run.clone(),
    }
}

fn print_config_info(info: &ConfigInfo, args: &InfoArgs) {
    let engine = &info.engine;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                Sim Bridge Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🛠  Engine");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Render window: {}", engine.use_render);
    println!("   ├─ Image backend: {:?}", info.image_backend);
    println!("   ├─ Reverse enabled: {}", engine.vehicle_config.enable_reverse);
    println!("   ├─ Image source: {}", engine.vehicle_config.image_source);
    println!("   ├─ Spawn longitude: {} m", engine.vehicle_config.spawn_longitude);
    println!(
        "   └─ Done conditions: out_of_route={}, continuous_line={}, crash_vehicle={}, crash_object={}",
        engine.done.out_of_route_done,
        engine.done.on_continuous_line_done,
        engine.done.crash_vehicle_done,
        engine.done.crash_object_done
    );

    println!("\n📷 Cameras ({})", engine.sensors.len());
    let count = engine.sensors.len();
    for (i, (name, spec)) in engine.sensors.iter().enumerate() {
        let prefix = if i == count - 1 { "└─" } else { "├─" };
        if args.cameras {
            println!(
                "   {} {} ({}x{}, fov {}°, mount [{}, {}, {}])",
                prefix,
                name,
                spec.width,
                spec.height,
                spec.fov_deg,
                spec.position.x,
                spec.position.y,
                spec.position.z
            );
        } else {
            println!("   {} {}", prefix, name);
        }
    }
    println!("   Output crop: {}x{}", info.crop[0], info.crop[1]);

    println!("\n🎮 Controls");
    println!("   ├─ Steer ratio: {}", info.control.steer_ratio);
    println!("   ├─ Throttle scale: {}", info.control.throttle_scale);
    println!("   └─ Reset grace: {} s", info.control.reset_grace_sec);

    println!("\n⚙️  Loop");
    println!("   ├─ Rate: {} Hz", info.run.rate_hz);
    println!("   └─ Ticks per camera frame: {}", info.run.ticks_per_frame);
    println!();
}
