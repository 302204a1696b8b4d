//! DriveWorld 核心实现
//!
//! 单个引擎实例之上的 World 适配器：状态读取、相机采集、控制映射、步进与重置。

use std::collections::HashMap;
use std::time::Duration;

use contracts::{
    BridgeConfig, ContractError, ControlVector, RgbImage, SimulatorState, Vector3, World,
};
use tracing::{debug, info, instrument};

use crate::clock::{Clock, MonotonicClock};
use crate::controls::ControlMapping;
use crate::engine::SimEngine;
use crate::error::{BridgeError, Result};
use crate::factory::{ROAD_CAMERA, WIDE_CAMERA};
use crate::sensor::ImageSensor;

/// Adapter settings injected at construction
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSettings {
    /// Control mapping parameters
    pub mapping: ControlMapping,

    /// Controls are zeroed for this long after a reset
    pub reset_grace: Duration,

    /// Output frame width (px)
    pub crop_width: u32,

    /// Output frame height (px)
    pub crop_height: u32,

    /// Capture the wide camera too
    pub dual_camera: bool,
}

impl TryFrom<&BridgeConfig> for WorldSettings {
    type Error = ContractError;

    fn try_from(config: &BridgeConfig) -> std::result::Result<Self, ContractError> {
        Ok(Self {
            mapping: ControlMapping::from(&config.control),
            reset_grace: config.control.reset_grace()?,
            crop_width: config.camera.width,
            crop_height: config.camera.height,
            dual_camera: config.engine.dual_camera,
        })
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        let config = BridgeConfig::default();
        Self {
            mapping: ControlMapping::from(&config.control),
            reset_grace: config.control.reset_grace().unwrap_or_default(),
            crop_width: config.camera.width,
            crop_height: config.camera.height,
            dual_camera: config.engine.dual_camera,
        }
    }
}

/// World adapter
///
/// 持有引擎、相机与当前控制向量。所有方法在调用者线程上同步执行。
pub struct DriveWorld<E: SimEngine, C: Clock = MonotonicClock> {
    engine: E,
    sensors: HashMap<String, Box<dyn ImageSensor>>,
    clock: C,
    settings: WorldSettings,
    /// 下一次 tick 使用的控制向量
    vc: ControlVector,
    /// 最近一次 tick 触发重置的时间
    reset_time: Option<Duration>,
    resets: u64,
    ticks: u64,
    /// 最近一次裁剪后的道路相机帧
    pub road_image: Option<RgbImage>,
    /// 最近一次裁剪后的广角相机帧
    pub wide_road_image: Option<RgbImage>,
}

impl<E: SimEngine, C: Clock> DriveWorld<E, C> {
    /// 创建新的 DriveWorld
    ///
    /// 引擎应已完成初始 reset；该 reset 不会开启控制抑制窗口。
    pub fn new(
        engine: E,
        sensors: Vec<Box<dyn ImageSensor>>,
        clock: C,
        settings: WorldSettings,
    ) -> Self {
        let sensors = sensors
            .into_iter()
            .map(|s| (s.spec().name.clone(), s))
            .collect();

        Self {
            engine,
            sensors,
            clock,
            settings,
            vc: ControlVector::ZERO,
            reset_time: None,
            resets: 0,
            ticks: 0,
            road_image: None,
            wide_road_image: None,
        }
    }

    /// 采集指定相机并转为 RGB 图像
    #[instrument(name = "world_get_cam_as_rgb", skip(self))]
    pub fn get_cam_as_rgb(&mut self, camera: &str) -> Result<RgbImage> {
        let sensor = self
            .sensors
            .get_mut(camera)
            .ok_or_else(|| BridgeError::SensorNotFound {
                name: camera.to_string(),
            })?;
        sensor.perceive(&mut self.engine)
    }

    /// 当前控制向量
    pub fn control_vector(&self) -> ControlVector {
        self.vc
    }

    /// 最近一次重置时间 (clock 时间)
    pub fn reset_time(&self) -> Option<Duration> {
        self.reset_time
    }

    /// 是否处于重置后的控制抑制窗口
    pub fn in_reset_grace(&self) -> bool {
        self.reset_time
            .is_some_and(|t| self.clock.now().saturating_sub(t) < self.settings.reset_grace)
    }

    /// 已执行的 tick 次数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// 已注册的相机名称
    pub fn sensor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn capture_cropped(&mut self, camera: &str) -> Result<RgbImage> {
        let frame = self.get_cam_as_rgb(camera)?;
        Ok(frame.crop_center(self.settings.crop_width, self.settings.crop_height)?)
    }
}

impl<E: SimEngine, C: Clock> World for DriveWorld<E, C> {
    type Error = BridgeError;

    fn apply_controls(&mut self, steer_angle: f64, throttle_out: f64, brake_out: f64) {
        if self.in_reset_grace() {
            if !self.vc.is_zero() {
                debug!("controls suppressed after reset");
            }
            self.vc = ControlVector::ZERO;
            return;
        }

        let max_steering = self.engine.vehicle().max_steering;
        self.vc = self
            .settings
            .mapping
            .map(steer_angle, max_steering, throttle_out, brake_out);
    }

    fn read_sensors(&self, state: &mut SimulatorState) {
        let vehicle = self.engine.vehicle();

        state.velocity = Vector3::new(vehicle.velocity[0], vehicle.velocity[1], 0.0);
        state.gps.from_xy(vehicle.position);
        state.bearing = vehicle.heading_theta.to_degrees();
        state.steering_angle = vehicle.steering * vehicle.max_steering;
        state.valid = true;
    }

    #[instrument(name = "world_read_cameras", skip(self), fields(dual_camera = self.settings.dual_camera))]
    fn read_cameras(&mut self) -> Result<()> {
        if self.settings.dual_camera {
            self.wide_road_image = Some(self.capture_cropped(WIDE_CAMERA)?);
        }
        self.road_image = Some(self.capture_cropped(ROAD_CAMERA)?);
        Ok(())
    }

    fn tick(&mut self) -> Result<()> {
        let outcome = self.engine.step(self.vc)?;
        self.ticks += 1;

        if outcome.terminated {
            self.engine.reset()?;
            let now = self.clock.now();
            self.reset_time = Some(now);
            self.resets += 1;
            info!(
                cause = ?outcome.cause,
                tick = self.ticks,
                resets = self.resets,
                reset_at_secs = now.as_secs_f64(),
                "episode terminated, engine reset"
            );
        }

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // 引擎生命周期由外部管理
        debug!(ticks = self.ticks, resets = self.resets, "world closed");
        Ok(())
    }

    fn road_image(&self) -> Option<&RgbImage> {
        self.road_image.as_ref()
    }

    fn wide_road_image(&self) -> Option<&RgbImage> {
        self.wide_road_image.as_ref()
    }

    fn resets(&self) -> u64 {
        self.resets
    }

    fn controls_suppressed(&self) -> bool {
        self.in_reset_grace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::{
        CameraSpec, RenderTarget, RenderedFrame, StepOutcome, TerminationCause, VehicleSnapshot,
    };
    use crate::sensor::CpuCamera;

    /// Scripted engine: fixed vehicle, terminates on listed steps, 8x8 coordinate frames
    struct ScriptedEngine {
        vehicle: VehicleSnapshot,
        terminate_on: Vec<u64>,
        steps: u64,
        resets: u32,
        actions: Vec<ControlVector>,
    }

    impl ScriptedEngine {
        fn new() -> Self {
            Self {
                vehicle: VehicleSnapshot {
                    velocity: [3.0, -1.5],
                    position: [250.0, 40.0],
                    heading_theta: std::f64::consts::FRAC_PI_4,
                    steering: -0.25,
                    max_steering: 40.0,
                },
                terminate_on: vec![],
                steps: 0,
                resets: 0,
                actions: vec![],
            }
        }
    }

    impl SimEngine for ScriptedEngine {
        fn reset(&mut self) -> Result<()> {
            self.resets += 1;
            Ok(())
        }

        fn step(&mut self, action: ControlVector) -> Result<StepOutcome> {
            self.steps += 1;
            self.actions.push(action);
            if self.terminate_on.contains(&self.steps) {
                Ok(StepOutcome::terminated(TerminationCause::Scripted))
            } else {
                Ok(StepOutcome::running())
            }
        }

        fn vehicle(&self) -> VehicleSnapshot {
            self.vehicle
        }

        fn render(&mut self, camera: &CameraSpec, _target: RenderTarget) -> Result<RenderedFrame> {
            let mut data = Vec::new();
            for y in 0..camera.height {
                for x in 0..camera.width {
                    data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
                }
            }
            Ok(RenderedFrame::HostRgba {
                width: camera.width,
                height: camera.height,
                data,
            })
        }
    }

    fn camera(name: &str) -> Box<dyn ImageSensor> {
        Box::new(CpuCamera::new(CameraSpec {
            name: name.into(),
            width: 8,
            height: 8,
            fov_deg: 40.0,
            position: Vector3::new(0.0, 0.0, 1.0),
        }))
    }

    fn settings(dual_camera: bool) -> WorldSettings {
        WorldSettings {
            crop_width: 4,
            crop_height: 2,
            dual_camera,
            ..Default::default()
        }
    }

    fn world(engine: ScriptedEngine, clock: ManualClock) -> DriveWorld<ScriptedEngine, ManualClock> {
        DriveWorld::new(engine, vec![camera(ROAD_CAMERA)], clock, settings(false))
    }

    #[test]
    fn test_read_sensors() {
        let w = world(ScriptedEngine::new(), ManualClock::new());
        let mut state = SimulatorState::new();
        w.read_sensors(&mut state);

        assert!(state.valid);
        assert_eq!(state.velocity, Vector3::new(3.0, -1.5, 0.0));
        assert!((state.bearing - 45.0).abs() < 1e-9);
        assert!((state.steering_angle + 10.0).abs() < 1e-12);
        assert!((state.gps.latitude - (32.75308505188913 + 0.0025)).abs() < 1e-12);
    }

    #[test]
    fn test_read_sensors_bearing_follows_heading() {
        use std::f64::consts::PI;

        let headings = [
            0.0,
            PI / 6.0,
            PI / 2.0,
            PI,
            -PI,
            -PI / 2.0,
            -3.0 * PI / 4.0,
            -0.1,
            2.5 * PI,
        ];
        for heading in headings {
            let mut engine = ScriptedEngine::new();
            engine.vehicle.heading_theta = heading;
            engine.vehicle.velocity = [-7.0, 2.0];
            let w = world(engine, ManualClock::new());

            let mut state = SimulatorState::new();
            w.read_sensors(&mut state);

            assert_eq!(state.bearing, heading.to_degrees(), "heading {heading}");
            assert_eq!(state.velocity.z, 0.0);
            assert_eq!(state.velocity, Vector3::new(-7.0, 2.0, 0.0));
        }

        // 负角与 ±π 不做归一化
        let mut engine = ScriptedEngine::new();
        engine.vehicle.heading_theta = -PI;
        let mut state = SimulatorState::new();
        world(engine, ManualClock::new()).read_sensors(&mut state);
        assert!((state.bearing + 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_apply_controls_before_any_reset_passes_through() {
        let mut w = world(ScriptedEngine::new(), ManualClock::new());
        w.apply_controls(300.0, 0.5, 0.0);
        let vc = w.control_vector();
        assert!((vc.steer - 0.5).abs() < 1e-12);
        assert!((vc.accel - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_tick_sends_held_controls() {
        let mut w = world(ScriptedEngine::new(), ManualClock::new());
        w.apply_controls(-600.0, 0.0, 0.8);
        w.tick().unwrap();
        w.tick().unwrap();
        assert_eq!(w.engine().actions, vec![ControlVector::new(-1.0, -0.8); 2]);
        assert_eq!(w.ticks(), 2);
    }

    #[test]
    fn test_termination_resets_and_records_time() {
        let clock = ManualClock::new();
        let mut engine = ScriptedEngine::new();
        engine.terminate_on = vec![2];
        let mut w = world(engine, clock.clone());

        clock.set(Duration::from_secs(42));
        w.tick().unwrap();
        assert_eq!(w.resets(), 0);
        assert_eq!(w.reset_time(), None);

        clock.set(Duration::from_secs(43));
        w.tick().unwrap();
        assert_eq!(w.resets(), 1);
        assert_eq!(w.engine().resets, 1);
        assert_eq!(w.reset_time(), Some(Duration::from_secs(43)));
    }

    #[test]
    fn test_grace_window_zeroes_controls() {
        let clock = ManualClock::new();
        let mut engine = ScriptedEngine::new();
        engine.terminate_on = vec![1];
        let mut w = world(engine, clock.clone());

        clock.set(Duration::from_secs(100));
        w.apply_controls(300.0, 1.0, 0.0);
        w.tick().unwrap();

        // t = 0 since reset
        w.apply_controls(300.0, 1.0, 0.0);
        assert!(w.control_vector().is_zero());

        clock.advance(Duration::from_millis(4999));
        w.apply_controls(-300.0, 0.0, 1.0);
        assert!(w.control_vector().is_zero());
        assert!(w.in_reset_grace());

        clock.advance(Duration::from_millis(1));
        w.apply_controls(300.0, 1.0, 0.0);
        let vc = w.control_vector();
        assert!((vc.steer - 0.5).abs() < 1e-12);
        assert!((vc.accel - 0.1).abs() < 1e-12);
        assert!(!w.in_reset_grace());
    }

    #[test]
    fn test_read_cameras_road_only() {
        let mut w = world(ScriptedEngine::new(), ManualClock::new());
        w.read_cameras().unwrap();

        let road = w.road_image.as_ref().unwrap();
        assert_eq!((road.width, road.height), (4, 2));
        // (8 - 4) / 2 = 2, (8 - 2) / 2 = 3
        assert_eq!(road.pixel(0, 0), Some([2, 3, 0]));
        assert!(w.wide_road_image.is_none());
    }

    #[test]
    fn test_read_cameras_dual() {
        let mut w = DriveWorld::new(
            ScriptedEngine::new(),
            vec![camera(ROAD_CAMERA), camera(WIDE_CAMERA)],
            ManualClock::new(),
            settings(true),
        );
        w.read_cameras().unwrap();
        assert!(w.road_image().is_some());
        assert!(w.wide_road_image().is_some());
        assert_eq!(w.sensor_names(), vec![ROAD_CAMERA, WIDE_CAMERA]);
    }

    #[test]
    fn test_missing_sensor() {
        let mut w = world(ScriptedEngine::new(), ManualClock::new());
        let err = w.get_cam_as_rgb(WIDE_CAMERA).unwrap_err();
        assert!(matches!(err, BridgeError::SensorNotFound { .. }));
    }

    #[test]
    fn test_crop_larger_than_render_fails() {
        let mut w = DriveWorld::new(
            ScriptedEngine::new(),
            vec![camera(ROAD_CAMERA)],
            ManualClock::new(),
            WorldSettings {
                crop_width: 16,
                crop_height: 2,
                ..Default::default()
            },
        );
        assert!(matches!(
            w.read_cameras().unwrap_err(),
            BridgeError::Contract(contracts::ContractError::CropOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_close_idempotent() {
        let mut w = world(ScriptedEngine::new(), ManualClock::new());
        w.close().unwrap();
        w.close().unwrap();
    }
}
