//! Bridge 指标收集模块
//!
//! 基于每次 tick 的采样收集和统计驱动循环的运行指标。

use contracts::{ControlVector, SimulatorState};
use metrics::{counter, gauge, histogram};

/// 单次 tick 的采样
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickSample {
    /// tick 耗时 (毫秒)，含相机读取
    pub duration_ms: f64,
    /// 发送给引擎的控制向量
    pub controls: ControlVector,
    /// 车速 (m/s)
    pub speed: f64,
    /// 控制是否处于重置后的抑制窗口
    pub suppressed: bool,
    /// 本次 tick 是否读取了相机
    pub cameras_read: bool,
    /// 本次 tick 是否触发了 episode 重置
    pub reset: bool,
}

impl TickSample {
    /// 从状态与控制向量构建采样
    pub fn new(state: &SimulatorState, controls: ControlVector, duration_ms: f64) -> Self {
        Self {
            duration_ms,
            controls,
            speed: state.speed(),
            ..Default::default()
        }
    }
}

/// 从 TickSample 记录指标
///
/// 每次 tick 结束后调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::{record_tick_metrics, TickSample};
///
/// let report = drive.step()?;
/// let sample = TickSample { reset: report.reset, ..TickSample::new(drive.state(), vc, ms) };
/// record_tick_metrics(&sample, report.frame);
/// ```
pub fn record_tick_metrics(sample: &TickSample, frame: u64) {
    // tick 计数器
    counter!("sim_bridge_ticks_total").increment(1);
    gauge!("sim_bridge_last_frame").set(frame as f64);

    histogram!("sim_bridge_tick_duration_ms").record(sample.duration_ms);

    record_controls(&sample.controls, sample.suppressed);

    gauge!("sim_bridge_speed_mps").set(sample.speed);
    histogram!("sim_bridge_speed_mps_hist").record(sample.speed);

    if sample.reset {
        record_reset();
    }
}

/// 记录控制向量
pub fn record_controls(vc: &ControlVector, suppressed: bool) {
    gauge!("sim_bridge_control_steer").set(vc.steer);
    gauge!("sim_bridge_control_accel").set(vc.accel);
    if suppressed {
        counter!("sim_bridge_controls_suppressed_total").increment(1);
    }
}

/// 记录 episode 重置
pub fn record_reset() {
    counter!("sim_bridge_resets_total").increment(1);
}

/// 记录一次相机读取 (一次读取包含所有已启用的相机)
pub fn record_camera_read(cameras: usize, duration_ms: f64) {
    counter!("sim_bridge_camera_reads_total").increment(1);
    gauge!("sim_bridge_cameras_active").set(cameras as f64);
    histogram!("sim_bridge_camera_read_ms").record(duration_ms);
}

/// 记录车辆状态
pub fn record_state(state: &SimulatorState) {
    gauge!("sim_bridge_bearing_deg").set(state.bearing);
    gauge!("sim_bridge_steering_angle").set(state.steering_angle);
    gauge!("sim_bridge_gps_latitude").set(state.gps.latitude);
    gauge!("sim_bridge_gps_longitude").set(state.gps.longitude);
}

/// 驱动循环指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct BridgeMetricsAggregator {
    /// 总 tick 数
    pub total_ticks: u64,

    /// episode 重置次数
    pub total_resets: u64,

    /// 相机读取次数
    pub camera_reads: u64,

    /// 控制被抑制的 tick 数
    pub suppressed_ticks: u64,

    /// tick 耗时统计
    pub tick_stats: RunningStats,

    /// 车速统计
    pub speed_stats: RunningStats,

    /// 转向输出统计
    pub steer_stats: RunningStats,

    /// 相机读取耗时统计
    pub camera_stats: RunningStats,
}

impl BridgeMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, sample: &TickSample) {
        self.total_ticks += 1;
        if sample.reset {
            self.total_resets += 1;
        }
        if sample.cameras_read {
            self.camera_reads += 1;
        }
        if sample.suppressed {
            self.suppressed_ticks += 1;
        }

        self.tick_stats.push(sample.duration_ms);
        self.speed_stats.push(sample.speed);
        self.steer_stats.push(sample.controls.steer);
    }

    /// 记录相机读取耗时
    pub fn update_camera(&mut self, duration_ms: f64) {
        self.camera_stats.push(duration_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_ticks: self.total_ticks,
            total_resets: self.total_resets,
            camera_reads: self.camera_reads,
            suppressed_ticks: self.suppressed_ticks,
            suppressed_rate: if self.total_ticks > 0 {
                self.suppressed_ticks as f64 / self.total_ticks as f64 * 100.0
            } else {
                0.0
            },
            tick_ms: StatsSummary::from(&self.tick_stats),
            speed_mps: StatsSummary::from(&self.speed_stats),
            steer: StatsSummary::from(&self.steer_stats),
            camera_ms: StatsSummary::from(&self.camera_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_ticks: u64,
    pub total_resets: u64,
    pub camera_reads: u64,
    pub suppressed_ticks: u64,
    pub suppressed_rate: f64,
    pub tick_ms: StatsSummary,
    pub speed_mps: StatsSummary,
    pub steer: StatsSummary,
    pub camera_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bridge Metrics Summary ===")?;
        writeln!(f, "Total ticks: {}", self.total_ticks)?;
        writeln!(f, "Episode resets: {}", self.total_resets)?;
        writeln!(f, "Camera reads: {}", self.camera_reads)?;
        writeln!(
            f,
            "Suppressed ticks: {} ({:.2}%)",
            self.suppressed_ticks, self.suppressed_rate
        )?;
        writeln!(f, "Tick duration (ms): {}", self.tick_ms)?;
        writeln!(f, "Speed (m/s): {}", self.speed_mps)?;
        writeln!(f, "Steer: {}", self.steer)?;
        writeln!(f, "Camera read (ms): {}", self.camera_ms)?;

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Vector3;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 8);
        assert!((stats.mean() - 5.0).abs() < 1e-10);
        assert!((stats.min() - 2.0).abs() < 1e-10);
        assert!((stats.max() - 9.0).abs() < 1e-10);
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-10);
    }

    #[test]
    fn test_tick_sample_from_state() {
        let state = SimulatorState {
            velocity: Vector3::new(3.0, 4.0, 0.0),
            ..Default::default()
        };
        let sample = TickSample::new(&state, ControlVector::new(0.1, 0.2), 1.5);
        assert!((sample.speed - 5.0).abs() < 1e-12);
        assert_eq!(sample.controls, ControlVector::new(0.1, 0.2));
        assert!(!sample.reset);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = BridgeMetricsAggregator::new();

        aggregator.update(&TickSample {
            duration_ms: 2.0,
            speed: 1.0,
            cameras_read: true,
            ..Default::default()
        });
        aggregator.update(&TickSample {
            duration_ms: 4.0,
            speed: 3.0,
            reset: true,
            ..Default::default()
        });
        aggregator.update(&TickSample {
            duration_ms: 3.0,
            suppressed: true,
            ..Default::default()
        });
        aggregator.update_camera(1.25);

        assert_eq!(aggregator.total_ticks, 3);
        assert_eq!(aggregator.total_resets, 1);
        assert_eq!(aggregator.camera_reads, 1);
        assert_eq!(aggregator.suppressed_ticks, 1);
        assert!((aggregator.tick_stats.mean() - 3.0).abs() < 1e-10);

        let summary = aggregator.summary();
        assert!((summary.suppressed_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.camera_ms.count, 1);

        aggregator.reset();
        assert_eq!(aggregator.total_ticks, 0);
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            total_ticks: 200,
            total_resets: 2,
            camera_reads: 100,
            suppressed_ticks: 10,
            suppressed_rate: 5.0,
            tick_ms: StatsSummary {
                count: 200,
                min: 0.5,
                max: 3.0,
                mean: 1.0,
                std_dev: 0.2,
            },
            ..Default::default()
        };

        let output = format!("{}", summary);
        assert!(output.contains("Total ticks: 200"));
        assert!(output.contains("5.00%"));
        assert!(output.contains("Speed (m/s): N/A"));
    }

    #[test]
    fn test_record_without_recorder() {
        // 未安装 recorder 时调用为空操作
        record_tick_metrics(&TickSample::default(), 0);
        record_camera_read(2, 1.0);
        record_state(&SimulatorState::default());
    }
}
