//! Kinematic engine
//!
//! In-process `SimEngine` for headless runs and tests: a kinematic bicycle model
//! with a flat synthetic renderer. Supports injecting failures and terminations.

use contracts::{ControlVector, KinematicSettings, RgbImage};
use tracing::{debug, instrument, trace};

use crate::engine::{
    CameraSpec, DeviceBuffer, EngineConfig, EngineFactory, RenderTarget, RenderedFrame, SimEngine,
    StepOutcome, TerminationCause, VehicleSnapshot,
};
use crate::error::{BridgeError, Result};

const SKY_RGBA: [u8; 4] = [135, 206, 235, 255];
const ROAD_RGBA: [u8; 4] = [90, 90, 90, 255];
const MARKING_RGBA: [u8; 4] = [255, 255, 255, 255];
/// Ground distance the lane marking is drawn at (m)
const MARKING_DISTANCE_M: f64 = 10.0;

/// Fault injection
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// `create` fails
    pub fail_create: bool,
    /// Resets succeed this many times, then fail
    pub fail_reset_after: Option<u32>,
    /// Step number (1-based, across episodes) that fails
    pub fail_step_at: Option<u64>,
    /// Step numbers (1-based, across episodes) that end the episode
    pub terminate_at: Vec<u64>,
    /// Cameras whose render fails
    pub fail_render: Vec<String>,
}

/// Kinematic engine factory
#[derive(Debug, Clone, Default)]
pub struct KinematicFactory {
    settings: KinematicSettings,
    faults: FaultConfig,
}

impl KinematicFactory {
    pub fn new(settings: KinematicSettings, faults: FaultConfig) -> Self {
        Self { settings, faults }
    }
}

impl EngineFactory for KinematicFactory {
    type Engine = KinematicEngine;

    fn supports_device_images(&self) -> bool {
        self.settings.device_images
    }

    #[instrument(name = "kinematic_create", skip(self, config), fields(sensors = config.sensors.len()))]
    fn create(&self, config: &EngineConfig) -> Result<KinematicEngine> {
        if self.faults.fail_create {
            return Err(BridgeError::EngineCreate {
                message: "injected failure".into(),
            });
        }
        if config.image_on_cuda && !self.settings.device_images {
            return Err(BridgeError::EngineCreate {
                message: "device images requested but not available".into(),
            });
        }

        Ok(KinematicEngine {
            config: config.clone(),
            settings: self.settings.clone(),
            faults: self.faults.clone(),
            pose: Pose::default(),
            episode_steps: 0,
            total_steps: 0,
            resets: 0,
            renders: 0,
        })
    }
}

/// Vehicle pose and motion
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Pose {
    x: f64,
    y: f64,
    /// rad, wrapped to (-pi, pi]
    heading: f64,
    /// m/s
    speed: f64,
    /// normalised [-1, 1]
    steering: f64,
}

/// Kinematic engine
pub struct KinematicEngine {
    config: EngineConfig,
    settings: KinematicSettings,
    faults: FaultConfig,
    pose: Pose,
    episode_steps: u64,
    total_steps: u64,
    resets: u32,
    renders: u64,
}

impl KinematicEngine {
    /// 已执行的 reset 次数
    pub fn reset_count(&self) -> u32 {
        self.resets
    }

    /// 累计步数 (跨 episode)
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// 当前 episode 步数
    pub fn episode_steps(&self) -> u64 {
        self.episode_steps
    }

    /// 累计渲染次数
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn integrate(&mut self, action: ControlVector) {
        let s = &self.settings;
        let steer = action.steer.clamp(-1.0, 1.0);
        let accel_cmd = action.accel.clamp(-1.0, 1.0);

        let accel = if accel_cmd >= 0.0 {
            accel_cmd * s.max_accel
        } else {
            accel_cmd * s.max_brake
        };

        let mut speed = self.pose.speed + accel * s.dt;
        if !self.config.vehicle_config.enable_reverse {
            speed = speed.max(0.0);
        }

        let wheel_angle = (steer * s.max_steering).to_radians();
        let heading = self.pose.heading + speed / s.wheelbase * wheel_angle.tan() * s.dt;
        let heading = wrap_angle(heading);

        self.pose = Pose {
            x: self.pose.x + speed * heading.cos() * s.dt,
            y: self.pose.y + speed * heading.sin() * s.dt,
            heading,
            speed,
            steering: steer,
        };
    }

    fn termination(&self) -> Option<TerminationCause> {
        if self.faults.terminate_at.contains(&self.total_steps) {
            return Some(TerminationCause::Scripted);
        }
        if self
            .settings
            .horizon
            .is_some_and(|h| self.episode_steps >= h)
        {
            return Some(TerminationCause::Horizon);
        }
        if self.config.done.out_of_route_done && self.pose.y.abs() > self.settings.lane_half_width {
            return Some(TerminationCause::OutOfRoute);
        }
        None
    }

    /// RGBA8: sky above the horizon, road below, a lane marking shifted by lateral offset
    fn draw(&self, camera: &CameraSpec) -> Vec<u8> {
        let width = camera.width as usize;
        let height = camera.height as usize;
        let horizon = height / 2;

        let half_fov = (camera.fov_deg / 2.0).to_radians();
        let px_per_m = camera.width as f64 / (2.0 * half_fov.tan() * MARKING_DISTANCE_M);
        let lateral = self.pose.y + MARKING_DISTANCE_M * self.pose.heading.sin();
        let marking = (width as f64 / 2.0 + lateral * px_per_m).round() as i64;

        let mut data = Vec::with_capacity(width * height * 4);
        for row in 0..height {
            for col in 0..width {
                let px = if row < horizon {
                    SKY_RGBA
                } else if (col as i64 - marking).abs() <= 1 {
                    MARKING_RGBA
                } else {
                    ROAD_RGBA
                };
                data.extend_from_slice(&px);
            }
        }
        data
    }
}

impl SimEngine for KinematicEngine {
    fn reset(&mut self) -> Result<()> {
        if self
            .faults
            .fail_reset_after
            .is_some_and(|n| self.resets >= n)
        {
            return Err(BridgeError::reset("injected failure"));
        }

        self.pose = Pose {
            x: self.config.vehicle_config.spawn_longitude,
            ..Pose::default()
        };
        self.episode_steps = 0;
        self.resets += 1;
        debug!(resets = self.resets, "kinematic engine reset");
        Ok(())
    }

    fn step(&mut self, action: ControlVector) -> Result<StepOutcome> {
        self.total_steps += 1;
        if self.faults.fail_step_at == Some(self.total_steps) {
            return Err(BridgeError::step("injected failure"));
        }

        self.integrate(action);
        self.episode_steps += 1;
        trace!(step = self.total_steps, pose = ?self.pose, "kinematic step");

        Ok(match self.termination() {
            Some(cause) => StepOutcome::terminated(cause),
            None => StepOutcome::running(),
        })
    }

    fn vehicle(&self) -> VehicleSnapshot {
        let p = self.pose;
        VehicleSnapshot {
            velocity: [p.speed * p.heading.cos(), p.speed * p.heading.sin()],
            position: [p.x, p.y],
            heading_theta: p.heading,
            steering: p.steering,
            max_steering: self.settings.max_steering,
        }
    }

    fn render(&mut self, camera: &CameraSpec, target: RenderTarget) -> Result<RenderedFrame> {
        if self.faults.fail_render.contains(&camera.name) {
            return Err(BridgeError::capture(&camera.name, "injected failure"));
        }
        if !self.config.sensors.contains_key(&camera.name) {
            return Err(BridgeError::SensorNotFound {
                name: camera.name.clone(),
            });
        }

        let data = self.draw(camera);
        self.renders += 1;

        match target {
            RenderTarget::Host => Ok(RenderedFrame::HostRgba {
                width: camera.width,
                height: camera.height,
                data,
            }),
            RenderTarget::Device if self.settings.device_images => {
                Ok(RenderedFrame::Device(Box::new(StagedFrame {
                    width: camera.width,
                    height: camera.height,
                    rgba: data,
                })))
            }
            RenderTarget::Device => Err(BridgeError::capture(
                &camera.name,
                "device images not available",
            )),
        }
    }
}

/// Device frame stand-in: pixels staged in host memory, converted on download
struct StagedFrame {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl DeviceBuffer for StagedFrame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn download(&self) -> Result<RgbImage> {
        Ok(RgbImage::from_rgba(self.width, self.height, &self.rgba)?)
    }
}

fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}
