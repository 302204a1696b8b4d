//! Session orchestrator - builds the world and paces the driving loop.
//!
//! The loop is paced by a tokio interval at `loop.rate_hz`; each interval tick runs one
//! synchronous `DriveLoop` iteration on the kinematic engine.

use std::future::Future;
use std::time::{Duration, Instant};

use bridge::{Bridge, DriveLoop, FaultConfig, KinematicFactory, SpeedController};
use contracts::BridgeConfig;
use observability::{record_camera_read, record_state, record_tick_metrics, TickSample};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::SessionStats;
use crate::error::{CliError, Result};

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Validated bridge configuration
    pub bridge: BridgeConfig,

    /// Maximum number of loop iterations (None = unlimited)
    pub max_frames: Option<u64>,

    /// Session timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Speed controller target (m/s)
    pub target_speed: f64,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Driving session
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until `max_frames`, the timeout, or `shutdown` completes
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<SessionStats> {
        let start_time = Instant::now();
        let config = &self.config.bridge;
        let period = config.run.period()?;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)
                .map_err(|e| CliError::observability(e.to_string()))?;
            info!("Metrics endpoint available on port {}", port);
        }

        let factory = KinematicFactory::new(config.kinematic.clone(), FaultConfig::default());
        let bridge = Bridge::new(factory, config.clone());
        let world = bridge.spawn_world()?;

        let cameras = world.sensor_names().len();
        let mut stats = SessionStats {
            cameras: world.sensor_names().iter().map(|s| s.to_string()).collect(),
            image_backend: format!("{:?}", bridge.image_backend()),
            ..Default::default()
        };

        let mut drive = DriveLoop::new(
            world,
            SpeedController::new(self.config.target_speed),
            config.run.ticks_per_frame,
        );

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let deadline = self.config.timeout.map(|t| tokio::time::Instant::now() + t);
        let max_frames = self.config.max_frames;

        info!(
            rate_hz = config.run.rate_hz,
            ticks_per_frame = config.run.ticks_per_frame,
            max_frames = ?max_frames,
            cameras = ?stats.cameras,
            "Driving loop running"
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping driving loop...");
                    break;
                }
                _ = interval.tick() => {}
            }

            let tick_started = Instant::now();
            let report = drive.step()?;
            let duration_ms = tick_started.elapsed().as_secs_f64() * 1000.0;

            let world = drive.world();
            let sample = TickSample {
                suppressed: report.suppressed,
                cameras_read: report.cameras_read,
                reset: report.reset,
                ..TickSample::new(drive.state(), world.control_vector(), duration_ms)
            };
            record_tick_metrics(&sample, report.frame);
            record_state(drive.state());
            stats.metrics.update(&sample);

            if report.cameras_read {
                let camera_ms = report.camera_time.as_secs_f64() * 1000.0;
                record_camera_read(cameras, camera_ms);
                stats.metrics.update_camera(camera_ms);
            }

            if report.reset {
                info!(frame = report.frame, "Episode reset, controls suppressed");
            }
            debug!(
                frame = report.frame,
                speed = format!("{:.2}", sample.speed),
                steer = sample.controls.steer,
                accel = sample.controls.accel,
                "Tick completed"
            );

            if let Some(max) = max_frames {
                if drive.stats().ticks >= max {
                    info!(frames = drive.stats().ticks, "Reached max frames limit");
                    break;
                }
            }

            if deadline.is_some_and(|d| tokio::time::Instant::now() >= d) {
                warn!(
                    timeout_secs = self.config.timeout.map(|t| t.as_secs()),
                    "Session timed out"
                );
                break;
            }
        }

        info!("Shutting down driving loop...");
        let run = drive.finish()?;

        stats.ticks = run.ticks;
        stats.camera_reads = run.camera_reads;
        stats.resets = run.resets;
        stats.mean_tick_ms = run.mean_tick_ms();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Session shutdown complete"
        );

        Ok(stats)
    }
}
