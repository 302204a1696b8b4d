//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 内置运动学引擎 e2e 测试 (配置 -> Bridge -> World -> DriveLoop)

#[cfg(test)]
mod contract_tests {
    use contracts::{BridgeConfig, ControlVector, GpsState, RgbImage};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_gps_base_point() {
        let mut gps = GpsState::default();
        gps.from_xy([0.0, 0.0]);
        assert_eq!(gps.latitude, 32.75308505188913);
        assert_eq!(gps.longitude, -117.2095393365393);
    }

    #[test]
    fn test_control_vector_wire_shape() {
        let vc = ControlVector::new(0.25, -0.5);
        assert_eq!(vc.as_array(), [0.25, -0.5]);
    }

    #[test]
    fn test_center_crop_offsets() {
        let data: Vec<u8> = (0..6u8 * 4 * 3).collect();
        let img = RgbImage::new(6, 4, data).unwrap();
        let cropped = img.crop_center(2, 2).unwrap();
        // (6 - 2) / 2 = 2, (4 - 2) / 2 = 1
        assert_eq!(cropped.pixel(0, 0), img.pixel(2, 1));
    }

    #[test]
    fn test_default_config_round_trip() {
        let toml = config_loader::ConfigLoader::to_toml(&BridgeConfig::default()).unwrap();
        let parsed =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(parsed, BridgeConfig::default());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use bridge::{
        Bridge, Controller, ControlCommand, DriveLoop, DriveWorld, FaultConfig, ImageBackend,
        KinematicEngine, KinematicFactory, ManualClock, SimEngine, SpeedController, World,
        ROAD_CAMERA, WIDE_CAMERA,
    };
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{BridgeConfig, SimulatorState};
    use observability::{BridgeMetricsAggregator, TickSample};

    const SMALL_TOML: &str = r#"
[engine]
use_render = false
camera_resolution = 48
dual_camera = true

[camera]
width = 32
height = 20

[loop]
ticks_per_frame = 2

[kinematic]
horizon = 25
"#;

    fn load_small() -> BridgeConfig {
        ConfigLoader::load_from_str(SMALL_TOML, ConfigFormat::Toml).unwrap()
    }

    fn spawn(config: &BridgeConfig, clock: ManualClock) -> DriveWorld<KinematicEngine, ManualClock> {
        let factory = KinematicFactory::new(config.kinematic.clone(), FaultConfig::default());
        Bridge::new(factory, config.clone())
            .spawn_world_with_clock(clock)
            .unwrap()
    }

    /// 固定输出的控制器
    struct Constant(ControlCommand);

    impl Controller for Constant {
        fn control(&mut self, _state: &SimulatorState) -> ControlCommand {
            self.0
        }
    }

    /// End-to-end test: Config -> Bridge -> DriveWorld -> DriveLoop
    ///
    /// 验证完整的数据流：
    /// 1. TOML 配置被解析并校验
    /// 2. Bridge 创建引擎并 reset 一次
    /// 3. DriveLoop 按 ticks_per_frame 读取双相机并裁剪
    #[test]
    fn test_e2e_config_to_loop() {
        let config = load_small();
        let world = spawn(&config, ManualClock::new());
        assert_eq!(world.engine().reset_count(), 1);
        assert_eq!(world.sensor_names(), vec![ROAD_CAMERA, WIDE_CAMERA]);

        let mut drive = DriveLoop::new(
            world,
            SpeedController::new(5.0),
            config.run.ticks_per_frame,
        );
        drive.run_frames(10).unwrap();

        let world = drive.world();
        let road = world.road_image().unwrap();
        let wide = world.wide_road_image().unwrap();
        assert_eq!((road.width, road.height), (32, 20));
        assert_eq!((wide.width, wide.height), (32, 20));
        assert_eq!(road.data.len(), 32 * 20 * 3);

        assert_eq!(drive.stats().ticks, 10);
        assert_eq!(drive.stats().camera_reads, 5);
        assert!(drive.state().valid);
        assert!(drive.state().speed() > 0.0);
    }

    /// Horizon 终止 -> 重置 -> 5 秒控制抑制 -> 恢复
    #[test]
    fn test_e2e_reset_grace_window() {
        let config = load_small();
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(1000));

        let full_throttle = Constant(ControlCommand {
            steer_angle: 0.0,
            throttle: 1.0,
            brake: 0.0,
        });
        let mut drive = DriveLoop::new(spawn(&config, clock.clone()), full_throttle, 2);

        // horizon = 25: 第 25 次 tick 触发重置
        let mut reset_frame = None;
        for _ in 0..25 {
            let report = drive.step().unwrap();
            assert!(!report.suppressed);
            if report.reset {
                reset_frame = Some(report.frame);
            }
        }
        assert_eq!(reset_frame, Some(24));
        assert_eq!(drive.world().reset_time(), Some(Duration::from_secs(1000)));
        assert_eq!(drive.world().engine().reset_count(), 2);

        // 抑制窗口内：控制清零，车辆保持静止
        clock.advance(Duration::from_millis(4999));
        for _ in 0..5 {
            assert!(drive.step().unwrap().suppressed);
            assert!(drive.world().control_vector().is_zero());
        }
        assert_eq!(drive.world().engine().vehicle().velocity, [0.0, 0.0]);

        // 窗口结束：控制透传
        clock.advance(Duration::from_millis(1));
        assert!(!drive.step().unwrap().suppressed);
        let vc = drive.world().control_vector();
        assert!((vc.accel - 0.1).abs() < 1e-12);
        assert_eq!(vc.steer, 0.0);
        drive.step().unwrap();
        assert!(drive.world().engine().vehicle().velocity[0] > 0.0);
    }

    /// GPU 后端：引擎支持常驻图像时自动选择
    #[test]
    fn test_e2e_gpu_backend() {
        let mut config = load_small();
        config.kinematic.device_images = true;

        let factory = KinematicFactory::new(config.kinematic.clone(), FaultConfig::default());
        let bridge = Bridge::new(factory, config.clone());
        assert_eq!(bridge.image_backend(), ImageBackend::Gpu);
        assert!(bridge.engine_config().image_on_cuda);

        let mut world = bridge.spawn_world_with_clock(ManualClock::new()).unwrap();
        world.read_cameras().unwrap();
        assert_eq!(world.road_image().unwrap().width, 32);
    }

    /// 渲染失败在 read_cameras 中向上传播
    #[test]
    fn test_e2e_render_failure_propagates() {
        let config = load_small();
        let faults = FaultConfig {
            fail_render: vec![WIDE_CAMERA.to_string()],
            ..Default::default()
        };
        let factory = KinematicFactory::new(config.kinematic.clone(), faults);
        let mut world = Bridge::new(factory, config)
            .spawn_world_with_clock(ManualClock::new())
            .unwrap();

        let err = world.read_cameras().unwrap_err();
        assert!(matches!(err, bridge::BridgeError::Capture { .. }));
    }

    /// 指标聚合与 DriveLoop 配合
    #[test]
    fn test_e2e_metrics_aggregation() {
        let config = load_small();
        let mut drive = DriveLoop::new(
            spawn(&config, ManualClock::new()),
            SpeedController::new(5.0),
            2,
        );
        let mut aggregator = BridgeMetricsAggregator::new();

        for _ in 0..50 {
            let report = drive.step().unwrap();
            let world = drive.world();
            let sample = TickSample {
                suppressed: report.suppressed,
                cameras_read: report.cameras_read,
                reset: report.reset,
                ..TickSample::new(drive.state(), world.control_vector(), 0.0)
            };
            aggregator.update(&sample);
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_ticks, 50);
        assert_eq!(summary.total_resets, 2);
        assert_eq!(summary.camera_reads, 25);
        // ManualClock 不前进：第 24 帧重置，之后 25 帧的控制都被抑制
        assert_eq!(summary.suppressed_ticks, 25);
    }

    /// DriveLoop 可移入阻塞任务，由 tokio 驱动
    #[tokio::test]
    async fn test_e2e_loop_on_blocking_task() {
        let config = load_small();
        let mut drive = DriveLoop::new(
            spawn(&config, ManualClock::new()),
            SpeedController::new(5.0),
            config.run.ticks_per_frame,
        );

        let stats = tokio::task::spawn_blocking(move || {
            drive.run_frames(20).unwrap();
            drive.finish().unwrap()
        })
        .await
        .unwrap();

        assert_eq!(stats.ticks, 20);
        assert_eq!(stats.resets, 0);
    }
}
