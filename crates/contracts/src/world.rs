//! World trait - simulator-agnostic read/write surface
//!
//! Defines what the driving loop needs from a running simulation, decoupling the
//! loop from any concrete engine.

use crate::{RgbImage, SimulatorState};

/// Read/write surface over one running simulation
///
/// All calls are synchronous and run to completion on the caller's thread.
///
/// # Example
///
/// ```ignore
/// let mut state = SimulatorState::new();
/// world.apply_controls(steer, throttle, brake);
/// world.read_sensors(&mut state);
/// world.read_cameras()?;
/// world.tick()?;
/// ```
pub trait World {
    /// Error raised by camera reads, ticks and close
    type Error: std::error::Error + Send + Sync + 'static;

    /// Convert the stack's outputs into the control vector held for the next tick.
    ///
    /// # Arguments
    /// * `steer_angle` - Physical steering angle requested by the stack
    /// * `throttle_out` - Throttle request, zero when braking
    /// * `brake_out` - Brake request
    fn apply_controls(&mut self, steer_angle: f64, throttle_out: f64, brake_out: f64);

    /// Overwrite `state` with the current vehicle state and mark it valid
    fn read_sensors(&self, state: &mut SimulatorState);

    /// Capture and crop the camera frames, replacing the previous ones
    fn read_cameras(&mut self) -> Result<(), Self::Error>;

    /// Advance the simulation by one step
    ///
    /// Episode termination is handled internally (reset) and is not an error.
    fn tick(&mut self) -> Result<(), Self::Error>;

    /// Release adapter resources; repeated calls are safe
    fn close(&mut self) -> Result<(), Self::Error>;

    /// Most recent road camera frame
    fn road_image(&self) -> Option<&RgbImage>;

    /// Most recent wide camera frame (dual-camera mode only)
    fn wide_road_image(&self) -> Option<&RgbImage>;

    /// Number of episode resets triggered by `tick`
    fn resets(&self) -> u64;

    /// Whether `apply_controls` would currently zero the stack's outputs
    fn controls_suppressed(&self) -> bool;
}
