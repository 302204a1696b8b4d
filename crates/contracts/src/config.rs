//! BridgeConfig - Config Loader 输出
//!
//! 描述完整的桥接配置：引擎、相机裁剪、控制映射、驱动循环、内置运动学引擎。
//! 所有字段都有默认值，空配置文件即为合法配置。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ContractError;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的桥接配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct BridgeConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 引擎设置
    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineSettings,

    /// 相机输出裁剪尺寸
    #[serde(default)]
    #[validate(nested)]
    pub camera: CropConfig,

    /// 控制映射
    #[serde(default)]
    #[validate(nested)]
    pub control: ControlConfig,

    /// 驱动循环
    #[serde(default, rename = "loop")]
    #[validate(nested)]
    pub run: LoopConfig,

    /// 内置运动学引擎参数
    #[serde(default)]
    #[validate(nested)]
    pub kinematic: KinematicSettings,
}

/// 引擎构建设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EngineSettings {
    /// 是否开启渲染窗口
    #[serde(default = "default_true")]
    pub use_render: bool,

    /// 图像后端选择
    #[serde(default)]
    pub image_backend: ImageBackendMode,

    /// 相机方形渲染分辨率 (像素)
    #[serde(default = "default_camera_resolution")]
    #[validate(range(min = 1))]
    pub camera_resolution: u32,

    /// 是否同时渲染广角相机
    #[serde(default)]
    pub dual_camera: bool,

    /// 出生点沿车道偏移 (米)
    #[serde(default = "default_spawn_longitude")]
    pub spawn_longitude: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            use_render: true,
            image_backend: ImageBackendMode::default(),
            camera_resolution: default_camera_resolution(),
            dual_camera: false,
            spawn_longitude: default_spawn_longitude(),
        }
    }
}

/// 图像后端选择策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageBackendMode {
    /// 引擎支持时使用 GPU 常驻图像
    #[default]
    Auto,
    /// 总是 CPU 回读
    Cpu,
    /// 总是 GPU 常驻图像
    Gpu,
}

/// 输出帧尺寸 (由驱动栈的相机分辨率决定)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CropConfig {
    #[serde(default = "default_crop_width")]
    #[validate(range(min = 1))]
    pub width: u32,

    #[serde(default = "default_crop_height")]
    #[validate(range(min = 1))]
    pub height: u32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            width: default_crop_width(),
            height: default_crop_height(),
        }
    }
}

/// 控制映射参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ControlConfig {
    /// 方向盘转角 / 车轮转角
    #[serde(default = "default_steer_ratio")]
    #[validate(range(exclusive_min = 0.0))]
    pub steer_ratio: f64,

    /// 油门缩放除数
    #[serde(default = "default_throttle_scale")]
    #[validate(range(exclusive_min = 0.0))]
    pub throttle_scale: f64,

    /// 重置后控制输出清零的时长 (秒)
    #[serde(default = "default_reset_grace_sec")]
    #[validate(range(min = 0.0))]
    pub reset_grace_sec: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            steer_ratio: default_steer_ratio(),
            throttle_scale: default_throttle_scale(),
            reset_grace_sec: default_reset_grace_sec(),
        }
    }
}

impl ControlConfig {
    /// 抑制窗口时长；NaN、负数或超出 Duration 范围的值返回错误
    pub fn reset_grace(&self) -> Result<Duration, ContractError> {
        Duration::try_from_secs_f64(self.reset_grace_sec).map_err(|e| {
            ContractError::config_validation(
                "control.reset_grace_sec",
                format!(
                    "reset_grace_sec must be a finite, non-negative duration, got {} ({e})",
                    self.reset_grace_sec
                ),
            )
        })
    }
}

/// 驱动循环参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LoopConfig {
    /// 控制循环频率 (Hz)
    #[serde(default = "default_rate_hz")]
    #[validate(range(exclusive_min = 0.0))]
    pub rate_hz: f64,

    /// 每读取一次相机对应的循环次数
    #[serde(default = "default_ticks_per_frame")]
    #[validate(range(min = 1))]
    pub ticks_per_frame: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            ticks_per_frame: default_ticks_per_frame(),
        }
    }
}

impl LoopConfig {
    /// 循环周期 (1 / rate_hz)，必须可表示且不为零
    pub fn period(&self) -> Result<Duration, ContractError> {
        let invalid = || {
            ContractError::config_validation(
                "loop.rate_hz",
                format!(
                    "rate_hz must be finite with a period between 1ns and Duration::MAX, got {}",
                    self.rate_hz
                ),
            )
        };
        let period = Duration::try_from_secs_f64(1.0 / self.rate_hz).map_err(|_| invalid())?;
        if period.is_zero() {
            return Err(invalid());
        }
        Ok(period)
    }
}

/// 内置运动学引擎参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct KinematicSettings {
    /// 单步积分时长 (秒)
    #[serde(default = "default_dt")]
    #[validate(range(exclusive_min = 0.0))]
    pub dt: f64,

    /// 轴距 (米)
    #[serde(default = "default_wheelbase")]
    #[validate(range(exclusive_min = 0.0))]
    pub wheelbase: f64,

    /// 最大车轮转角 (度)
    #[serde(default = "default_max_steering")]
    #[validate(range(exclusive_min = 0.0))]
    pub max_steering: f64,

    /// 满油门加速度 (m/s²)
    #[serde(default = "default_max_accel")]
    #[validate(range(exclusive_min = 0.0))]
    pub max_accel: f64,

    /// 满制动减速度 (m/s²)
    #[serde(default = "default_max_brake")]
    #[validate(range(exclusive_min = 0.0))]
    pub max_brake: f64,

    /// 车道半宽 (米)，out_of_route 判定用
    #[serde(default = "default_lane_half_width")]
    #[validate(range(exclusive_min = 0.0))]
    pub lane_half_width: f64,

    /// 每个 episode 的最大步数 (None = 不限)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub horizon: Option<u64>,

    /// 是否模拟 GPU 常驻图像能力
    #[serde(default)]
    pub device_images: bool,
}

impl Default for KinematicSettings {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            wheelbase: default_wheelbase(),
            max_steering: default_max_steering(),
            max_accel: default_max_accel(),
            max_brake: default_max_brake(),
            lane_half_width: default_lane_half_width(),
            horizon: None,
            device_images: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_camera_resolution() -> u32 {
    2048
}

fn default_spawn_longitude() -> f64 {
    15.0
}

fn default_crop_width() -> u32 {
    1928
}

fn default_crop_height() -> u32 {
    1208
}

fn default_steer_ratio() -> f64 {
    15.0
}

fn default_throttle_scale() -> f64 {
    10.0
}

fn default_reset_grace_sec() -> f64 {
    5.0
}

fn default_rate_hz() -> f64 {
    100.0
}

fn default_ticks_per_frame() -> u32 {
    2
}

fn default_dt() -> f64 {
    0.02
}

fn default_wheelbase() -> f64 {
    2.7
}

fn default_max_steering() -> f64 {
    40.0
}

fn default_max_accel() -> f64 {
    3.0
}

fn default_max_brake() -> f64 {
    6.0
}

fn default_lane_half_width() -> f64 {
    5.25
}
