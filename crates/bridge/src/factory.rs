//! Bridge 核心实现
//!
//! 构建引擎配置、创建并初始化引擎，返回绑定该引擎的 DriveWorld。

use std::collections::BTreeMap;

use contracts::{BridgeConfig, ImageBackendMode, Vector3};
use tracing::{info, instrument, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::engine::{CameraSpec, DoneConditions, EngineConfig, EngineFactory, SimEngine, VehicleSpec};
use crate::error::{BridgeError, Result};
use crate::sensor::{build_sensor, ImageBackend};
use crate::world::{DriveWorld, WorldSettings};

/// 道路相机名称
pub const ROAD_CAMERA: &str = "rgb_road";
/// 广角相机名称
pub const WIDE_CAMERA: &str = "rgb_wide";

const ROAD_FOV_DEG: f64 = 40.0;
const WIDE_FOV_DEG: f64 = 160.0;
/// 相机相对车辆的挂载位置 (米)
const CAMERA_MOUNT: Vector3 = Vector3::new(0.0, 0.0, 1.0);

/// Bridge
///
/// 负责从 BridgeConfig 构建引擎与相机，并交付可用的 World 适配器。
pub struct Bridge<F: EngineFactory> {
    factory: F,
    config: BridgeConfig,
}

impl<F: EngineFactory> Bridge<F> {
    /// 创建新的 Bridge
    pub fn new(factory: F, config: BridgeConfig) -> Self {
        Self { factory, config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// 解析图像后端 (构建时确定一次)
    pub fn image_backend(&self) -> ImageBackend {
        let supported = self.factory.supports_device_images();
        match self.config.engine.image_backend {
            ImageBackendMode::Auto if supported => ImageBackend::Gpu,
            ImageBackendMode::Auto => ImageBackend::Cpu,
            ImageBackendMode::Cpu => ImageBackend::Cpu,
            ImageBackendMode::Gpu => {
                if !supported {
                    warn!("gpu image backend requested but the engine reports no device image support");
                }
                ImageBackend::Gpu
            }
        }
    }

    /// 相机列表：道路相机总是存在，广角相机仅在双相机模式下
    pub fn camera_specs(&self) -> Vec<CameraSpec> {
        let size = self.config.engine.camera_resolution;
        let mut specs = vec![camera_spec(ROAD_CAMERA, size, ROAD_FOV_DEG)];
        if self.config.engine.dual_camera {
            specs.push(camera_spec(WIDE_CAMERA, size, WIDE_FOV_DEG));
        }
        specs
    }

    /// 引擎配置
    pub fn engine_config(&self) -> EngineConfig {
        self.engine_config_for(self.image_backend())
    }

    fn engine_config_for(&self, backend: ImageBackend) -> EngineConfig {
        let sensors: BTreeMap<String, CameraSpec> = self
            .camera_specs()
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect();

        EngineConfig {
            use_render: self.config.engine.use_render,
            vehicle_config: VehicleSpec {
                enable_reverse: false,
                image_source: ROAD_CAMERA.to_string(),
                spawn_longitude: self.config.engine.spawn_longitude,
            },
            sensors,
            image_on_cuda: backend == ImageBackend::Gpu,
            image_observation: true,
            interface_panel: Vec::new(),
            // episode 只在路线/碰撞逻辑显式判定时结束
            done: DoneConditions {
                out_of_route_done: false,
                on_continuous_line_done: false,
                crash_vehicle_done: false,
                crash_object_done: false,
            },
        }
    }

    /// 创建引擎并返回 World 适配器 (单调时钟)
    pub fn spawn_world(&self) -> Result<DriveWorld<F::Engine>> {
        self.spawn_world_with_clock(MonotonicClock::new())
    }

    /// 创建引擎并返回 World 适配器
    ///
    /// 引擎创建后立即 reset 一次以获得有效的初始观测。
    #[instrument(
        name = "bridge_spawn_world",
        skip(self, clock),
        fields(dual_camera = self.config.engine.dual_camera)
    )]
    pub fn spawn_world_with_clock<C: Clock>(&self, clock: C) -> Result<DriveWorld<F::Engine, C>> {
        let settings = WorldSettings::try_from(&self.config)?;
        let backend = self.image_backend();
        let engine_config = self.engine_config_for(backend);

        info!(
            ?backend,
            use_render = engine_config.use_render,
            sensors = ?engine_config.sensors.keys().collect::<Vec<_>>(),
            "creating engine"
        );

        let mut engine = self
            .factory
            .create(&engine_config)
            .map_err(|e| match e {
                e @ BridgeError::EngineCreate { .. } => e,
                other => BridgeError::EngineCreate {
                    message: other.to_string(),
                },
            })?;

        engine.reset()?;

        let sensors = engine_config
            .sensors
            .into_values()
            .map(|spec| build_sensor(spec, backend))
            .collect();

        info!("engine ready, world spawned");
        Ok(DriveWorld::new(
            engine,
            sensors,
            clock,
            settings,
        ))
    }
}

fn camera_spec(name: &str, size: u32, fov_deg: f64) -> CameraSpec {
    CameraSpec {
        name: name.to_string(),
        width: size,
        height: size,
        fov_deg,
        position: CAMERA_MOUNT,
    }
}
