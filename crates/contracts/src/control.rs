//! ControlVector - engine actuation command

use serde::{Deserialize, Serialize};

/// Normalised two-axis command consumed by the engine's step function.
///
/// `accel` is a single signed axis: positive is throttle, negative is brake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlVector {
    /// Steering command in [-1, 1]
    pub steer: f64,

    /// Throttle (+) / brake (-) command in [-1, 1]
    pub accel: f64,
}

impl ControlVector {
    /// Both axes zero
    pub const ZERO: Self = Self {
        steer: 0.0,
        accel: 0.0,
    };

    pub const fn new(steer: f64, accel: f64) -> Self {
        Self { steer, accel }
    }

    pub fn is_zero(&self) -> bool {
        self.steer == 0.0 && self.accel == 0.0
    }

    /// As the `[steer, accel]` pair engines take as an action
    pub fn as_array(&self) -> [f64; 2] {
        [self.steer, self.accel]
    }
}
