//! Session statistics.

use std::time::Duration;

use observability::BridgeMetricsAggregator;

/// Statistics from a driving session
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Loop iterations completed
    pub ticks: u64,

    /// Camera reads performed
    pub camera_reads: u64,

    /// Episode resets triggered by ticks
    pub resets: u64,

    /// Mean busy time per iteration (ms)
    pub mean_tick_ms: f64,

    /// Total duration of the session
    pub duration: Duration,

    /// Cameras registered on the world
    pub cameras: Vec<String>,

    /// Image backend chosen at construction
    pub image_backend: String,

    /// Per-tick metrics aggregator
    pub metrics: BridgeMetricsAggregator,
}

impl SessionStats {
    /// Loop iterations per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {}", self.ticks);
        println!("   ├─ Camera reads: {}", self.camera_reads);
        println!("   ├─ Episode resets: {}", self.resets);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   ├─ Mean tick: {:.3} ms", self.mean_tick_ms);
        println!("   ├─ Cameras: {}", self.cameras.join(", "));
        println!("   └─ Image backend: {}", self.image_backend);

        let summary = self.metrics.summary();

        println!("\n📈 Loop Metrics");
        println!(
            "   ├─ Suppressed ticks: {} ({:.2}%)",
            summary.suppressed_ticks, summary.suppressed_rate
        );
        println!("   ├─ Tick duration (ms): {}", summary.tick_ms);
        println!("   ├─ Camera read (ms): {}", summary.camera_ms);
        println!("   ├─ Speed (m/s): {}", summary.speed_mps);
        println!("   └─ Steer: {}", summary.steer);

        println!();
    }
}
