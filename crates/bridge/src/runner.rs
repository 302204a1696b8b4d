//! Driving loop
//!
//! One iteration: apply the controller's outputs, read sensors, read cameras every
//! `ticks_per_frame` iterations, tick. Pacing is left to the caller.

use std::time::{Duration, Instant};

use contracts::{SimulatorState, World};
use tracing::{debug, info};

/// Stack outputs for one iteration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlCommand {
    /// Physical steering angle
    pub steer_angle: f64,
    /// Throttle request, zero when braking
    pub throttle: f64,
    /// Brake request
    pub brake: f64,
}

/// Produces control outputs from the latest state
pub trait Controller {
    fn control(&mut self, state: &SimulatorState) -> ControlCommand;
}

/// Proportional speed keeper, wheel held straight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedController {
    /// Target speed (m/s)
    pub target_speed: f64,
    /// Command per m/s of error
    pub gain: f64,
}

impl SpeedController {
    pub fn new(target_speed: f64) -> Self {
        Self {
            target_speed,
            gain: 0.5,
        }
    }
}

impl Controller for SpeedController {
    fn control(&mut self, state: &SimulatorState) -> ControlCommand {
        let error = self.target_speed - state.speed();
        let command = (error * self.gain).clamp(-1.0, 1.0);
        if command > 0.0 {
            ControlCommand {
                throttle: command,
                ..Default::default()
            }
        } else {
            ControlCommand {
                brake: -command,
                ..Default::default()
            }
        }
    }
}

/// What one iteration did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Iteration index (0-based)
    pub frame: u64,
    /// Controls applied this iteration were zeroed by the post-reset window
    pub suppressed: bool,
    /// Cameras were read this iteration
    pub cameras_read: bool,
    /// The tick ended the episode and reset the engine
    pub reset: bool,
    /// Time spent reading cameras
    pub camera_time: Duration,
}

/// Run statistics
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Completed iterations
    pub ticks: u64,
    /// Camera reads
    pub camera_reads: u64,
    /// Episode resets
    pub resets: u64,
    /// Wall time spent inside iterations
    pub duration: Duration,
}

impl RunStats {
    /// Mean wall time per iteration (ms)
    pub fn mean_tick_ms(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.duration.as_secs_f64() * 1000.0 / self.ticks as f64
        }
    }
}

/// Driving loop over any [`World`]
pub struct DriveLoop<W: World, K: Controller> {
    world: W,
    controller: K,
    ticks_per_frame: u32,
    state: SimulatorState,
    frame: u64,
    stats: RunStats,
}

impl<W: World, K: Controller> DriveLoop<W, K> {
    /// `ticks_per_frame` of 0 is treated as 1
    pub fn new(world: W, controller: K, ticks_per_frame: u32) -> Self {
        Self {
            world,
            controller,
            ticks_per_frame: ticks_per_frame.max(1),
            state: SimulatorState::new(),
            frame: 0,
            stats: RunStats::default(),
        }
    }

    /// Run one iteration
    pub fn step(&mut self) -> Result<StepReport, W::Error> {
        let started = Instant::now();
        let frame = self.frame;

        let command = self.controller.control(&self.state);
        let suppressed = self.world.controls_suppressed();
        self.world
            .apply_controls(command.steer_angle, command.throttle, command.brake);
        self.world.read_sensors(&mut self.state);

        let cameras_read = frame % self.ticks_per_frame as u64 == 0;
        let mut camera_time = Duration::ZERO;
        if cameras_read {
            let capture_started = Instant::now();
            self.world.read_cameras()?;
            camera_time = capture_started.elapsed();
            self.stats.camera_reads += 1;
        }

        let resets_before = self.world.resets();
        self.world.tick()?;
        let reset = self.world.resets() > resets_before;

        self.frame += 1;
        self.stats.ticks += 1;
        if reset {
            self.stats.resets += 1;
        }
        self.stats.duration += started.elapsed();

        debug!(frame, cameras_read, reset, speed = self.state.speed(), "loop iteration");
        Ok(StepReport {
            frame,
            suppressed,
            cameras_read,
            reset,
            camera_time,
        })
    }

    /// Run `frames` iterations back to back
    pub fn run_frames(&mut self, frames: u64) -> Result<&RunStats, W::Error> {
        for _ in 0..frames {
            self.step()?;
        }
        info!(
            ticks = self.stats.ticks,
            camera_reads = self.stats.camera_reads,
            resets = self.stats.resets,
            "frames completed"
        );
        Ok(&self.stats)
    }

    /// Close the world and hand back the statistics
    pub fn finish(mut self) -> Result<RunStats, W::Error> {
        self.world.close()?;
        Ok(self.stats)
    }

    /// Latest state read from the world
    pub fn state(&self) -> &SimulatorState {
        &self.state
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }
}
