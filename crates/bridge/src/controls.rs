//! Stack output -> engine action mapping

use contracts::{ControlConfig, ControlVector};
use tracing::{debug, warn};

/// Converts physical steering and throttle/brake requests into a normalised
/// [`ControlVector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlMapping {
    /// Steering wheel angle per unit of wheel angle
    pub steer_ratio: f64,

    /// Divisor applied to throttle requests
    pub throttle_scale: f64,
}

impl Default for ControlMapping {
    fn default() -> Self {
        Self::from(&ControlConfig::default())
    }
}

impl From<&ControlConfig> for ControlMapping {
    fn from(config: &ControlConfig) -> Self {
        Self {
            steer_ratio: config.steer_ratio,
            throttle_scale: config.throttle_scale,
        }
    }
}

impl ControlMapping {
    /// Normalised steering command, always within [-1, 1].
    ///
    /// Non-finite results (NaN input, zero capability) map to straight ahead.
    pub fn steer(&self, steer_angle: f64, max_steering: f64) -> f64 {
        let steer = steer_angle / (max_steering * self.steer_ratio);
        if !steer.is_finite() {
            warn!(steer_angle, max_steering, "non-finite steering command, using 0");
            return 0.0;
        }
        steer.clamp(-1.0, 1.0)
    }

    /// Signed throttle/brake command.
    ///
    /// A non-zero throttle wins; otherwise the brake is applied as a negative value.
    pub fn accel(&self, throttle_out: f64, brake_out: f64) -> f64 {
        if throttle_out != 0.0 {
            if brake_out != 0.0 {
                debug!(throttle_out, brake_out, "throttle and brake both set, using throttle");
            }
            throttle_out / self.throttle_scale
        } else {
            -brake_out
        }
    }

    /// Full control vector for one set of stack outputs
    pub fn map(
        &self,
        steer_angle: f64,
        max_steering: f64,
        throttle_out: f64,
        brake_out: f64,
    ) -> ControlVector {
        ControlVector::new(
            self.steer(steer_angle, max_steering),
            self.accel(throttle_out, brake_out),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_STEERING: f64 = 40.0;

    #[test]
    fn test_steer_scaled_by_ratio() {
        let mapping = ControlMapping::default();
        // 300 / (40 * 15) = 0.5
        assert!((mapping.steer(300.0, MAX_STEERING) - 0.5).abs() < 1e-12);
        assert!((mapping.steer(-120.0, MAX_STEERING) + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_steer_always_clamped() {
        let mapping = ControlMapping::default();
        let mut angle = -5000.0;
        while angle <= 5000.0 {
            let s = mapping.steer(angle, MAX_STEERING);
            assert!((-1.0..=1.0).contains(&s), "angle {angle} -> {s}");
            angle += 7.3;
        }
        assert_eq!(mapping.steer(1e9, MAX_STEERING), 1.0);
        assert_eq!(mapping.steer(-1e9, MAX_STEERING), -1.0);
    }

    #[test]
    fn test_steer_non_finite() {
        let mapping = ControlMapping::default();
        assert_eq!(mapping.steer(f64::NAN, MAX_STEERING), 0.0);
        assert_eq!(mapping.steer(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_throttle_scaled() {
        let mapping = ControlMapping::default();
        assert!((mapping.accel(0.5, 0.0) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_brake_negated() {
        let mapping = ControlMapping::default();
        assert_eq!(mapping.accel(0.0, 0.7), -0.7);
        assert_eq!(mapping.accel(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_throttle_wins_over_brake() {
        let mapping = ControlMapping::default();
        assert!((mapping.accel(0.3, 0.9) - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_exactly_one_source() {
        let mapping = ControlMapping::default();
        for &(t, b) in &[(0.0, 0.4), (0.2, 0.0), (1.0, 1.0), (0.0, 0.0)] {
            let a = mapping.accel(t, b);
            let expected = if t != 0.0 { t / 10.0 } else { -b };
            assert_eq!(a, expected);
        }
    }

    #[test]
    fn test_from_config() {
        let config = ControlConfig {
            steer_ratio: 10.0,
            throttle_scale: 2.0,
            reset_grace_sec: 1.0,
        };
        let mapping = ControlMapping::from(&config);
        let vc = mapping.map(100.0, 40.0, 1.0, 0.0);
        assert!((vc.steer - 0.25).abs() < 1e-12);
        assert!((vc.accel - 0.5).abs() < 1e-12);
    }
}
