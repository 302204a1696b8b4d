//! SimulatorState - World adapter output
//!
//! 驱动栈读取的中立车辆状态，每次 `read_sensors` 原地覆盖。

use serde::{Deserialize, Serialize};

/// Latitude of the planar map origin
const BASE_LAT: f64 = 32.75308505188913;
/// Longitude of the planar map origin
const BASE_LON: f64 = -117.2095393365393;
/// Metres per degree used by the planar projection
const DEG_TO_METERS: f64 = 100_000.0;

/// 3D 向量
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// GPS 状态 (度 / 米)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsState {
    /// 纬度 (度)
    pub latitude: f64,

    /// 经度 (度)
    pub longitude: f64,

    /// 高度 (米)
    pub altitude: f64,
}

impl GpsState {
    /// Place a planar `(x, y)` position (metres) on a fixed lat/lon origin.
    ///
    /// This is a flat-earth approximation, good enough for the few kilometres
    /// a simulated episode covers. Altitude is left untouched.
    pub fn from_xy(&mut self, xy: [f64; 2]) {
        self.latitude = BASE_LAT + xy[0] / DEG_TO_METERS;
        self.longitude = BASE_LON + xy[1] / DEG_TO_METERS;
    }
}

/// 仿真车辆状态
///
/// Owned by the driving loop and mutated in place by the world adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulatorState {
    /// 速度 (m/s)，z 恒为 0
    pub velocity: Vector3,

    /// 投影后的位置
    pub gps: GpsState,

    /// 航向 (度)
    pub bearing: f64,

    /// 转向角 (engine steering x max steering)
    pub steering_angle: f64,

    /// 是否已由 adapter 填充
    pub valid: bool,
}

impl SimulatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speed over ground (m/s)
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }
}
