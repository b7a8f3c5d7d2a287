//! Steering filter
//!
//! Turns the raw steer axis into a smoothed, rate-limited steer fraction and
//! a speed-adaptive wheel angle.

use mechanics::Side;
use serde::{Deserialize, Serialize};
use simcore::error::ensure_at_least;
use simcore::{ConfigError, Model, clamp01, finite_or_zero, lerp, move_towards};

/// Configuration for the steering filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Maximum change of the smoothed steer fraction per second
    pub max_steer_rate: f64,
    /// Inputs with a smaller magnitude recenter the wheel
    pub deadzone: f64,
    /// Recenter rate (per second) at standstill
    pub recenter_rate_low: f64,
    /// Recenter rate (per second) at top speed
    pub recenter_rate_high: f64,
    /// Steer range at standstill (degrees)
    pub full_range_deg: f64,
    /// Steer range at top speed (degrees)
    pub high_speed_range_deg: f64,
    /// Range never shrinks below this (degrees)
    pub min_range_deg: f64,
    /// Bias inner/outer wheel angles to approximate Ackermann geometry
    pub differential_bias: bool,
    pub inner_bias: f64,
    pub outer_bias: f64,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            max_steer_rate: 8.0,
            deadzone: 0.01,
            recenter_rate_low: 2.0,
            recenter_rate_high: 8.0,
            full_range_deg: 30.0,
            high_speed_range_deg: 10.0,
            min_range_deg: 8.0,
            differential_bias: false,
            inner_bias: 1.15,
            outer_bias: 0.85,
        }
    }
}

impl SteeringConfig {
    /// Set the steer rate limit
    pub fn with_max_steer_rate(mut self, rate: f64) -> Self {
        self.max_steer_rate = rate;
        self
    }

    /// Set the speed-adaptive range
    pub fn with_range(mut self, full_range_deg: f64, high_speed_range_deg: f64, min_range_deg: f64) -> Self {
        self.full_range_deg = full_range_deg;
        self.high_speed_range_deg = high_speed_range_deg;
        self.min_range_deg = min_range_deg;
        self
    }

    /// Enable or disable differential inner/outer bias
    pub fn with_differential_bias(mut self, enabled: bool) -> Self {
        self.differential_bias = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_at_least("max_steer_rate", self.max_steer_rate, 0.0)?;
        ensure_at_least("deadzone", self.deadzone, 0.0)?;
        ensure_at_least("recenter_rate_low", self.recenter_rate_low, 0.0)?;
        ensure_at_least("recenter_rate_high", self.recenter_rate_high, 0.0)?;
        ensure_at_least("min_range_deg", self.min_range_deg, 0.0)?;
        ensure_at_least("full_range_deg", self.full_range_deg, self.min_range_deg)?;
        ensure_at_least("high_speed_range_deg", self.high_speed_range_deg, 0.0)?;
        ensure_at_least("inner_bias", self.inner_bias, 0.0)?;
        ensure_at_least("outer_bias", self.outer_bias, 0.0)
    }
}

/// Quadratic response that keeps the sign: `sign(h) * h²`.
pub fn shape_input(raw: f64) -> f64 {
    raw * raw.abs()
}

/// Rate-limited steering state
#[derive(Debug, Clone)]
pub struct SteeringModel {
    config: SteeringConfig,
    smoothed: f64,
}

impl SteeringModel {
    /// Create a centered steering model
    pub fn new(config: SteeringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            smoothed: 0.0,
        })
    }

    pub fn config(&self) -> &SteeringConfig {
        &self.config
    }

    /// Smoothed steer fraction in [-1, 1]
    pub fn smoothed(&self) -> f64 {
        self.smoothed
    }

    /// Recenter rate at the given normalized speed, capped by the steer rate limit
    pub fn recenter_rate(&self, speed01: f64) -> f64 {
        let rate = lerp(self.config.recenter_rate_low, self.config.recenter_rate_high, clamp01(speed01));
        rate.min(self.config.max_steer_rate)
    }

    /// Advance the filter by one tick and return the new smoothed steer
    pub fn update(&mut self, raw: f64, speed01: f64, dt: f64) -> f64 {
        let raw = finite_or_zero(raw).clamp(-1.0, 1.0);
        let dt = finite_or_zero(dt).max(0.0);

        self.smoothed = if raw.abs() < self.config.deadzone {
            move_towards(self.smoothed, 0.0, self.recenter_rate(speed01) * dt)
        } else {
            move_towards(self.smoothed, shape_input(raw), self.config.max_steer_rate * dt)
        }
        .clamp(-1.0, 1.0);
        self.smoothed
    }

    /// Steer range (degrees) at the given normalized speed
    pub fn range_deg(&self, speed01: f64) -> f64 {
        let c = &self.config;
        lerp(c.full_range_deg, c.high_speed_range_deg, clamp01(speed01)).clamp(c.min_range_deg, c.full_range_deg)
    }

    /// Unbiased steer angle (degrees); positive turns right
    pub fn steer_angle(&self, speed01: f64) -> f64 {
        self.smoothed * self.range_deg(speed01)
    }

    /// Steer angle for a wheel on `side`, with the differential bias if enabled
    pub fn wheel_angle(&self, side: Side, speed01: f64) -> f64 {
        let angle = self.steer_angle(speed01);
        if !self.config.differential_bias || angle == 0.0 {
            return angle;
        }
        let turn_side = if angle > 0.0 { Side::Right } else { Side::Left };
        if side == turn_side {
            angle * self.config.inner_bias
        } else {
            angle * self.config.outer_bias
        }
    }
}

impl Model for SteeringModel {
    fn reset(&mut self) {
        self.smoothed = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f64 = 0.02;

    fn model() -> SteeringModel {
        SteeringModel::new(SteeringConfig::default()).unwrap()
    }

    #[test]
    fn test_shaping_keeps_sign() {
        assert_relative_eq!(shape_input(0.5), 0.25);
        assert_relative_eq!(shape_input(-0.5), -0.25);
        assert_relative_eq!(shape_input(1.0), 1.0);
    }

    #[test]
    fn test_rate_limited_per_tick() {
        let mut steering = model();
        let bound = steering.config().max_steer_rate * DT;
        let inputs = [1.0, -1.0, 0.0, 1.0, 0.3, -0.9, 0.005, 1.0];

        for &input in inputs.iter().cycle().take(200) {
            let before = steering.smoothed();
            let after = steering.update(input, 0.7, DT);
            assert!((after - before).abs() <= bound + 1e-12);
        }
    }

    #[test]
    fn test_converges_to_shaped_input() {
        let mut steering = model();
        for _ in 0..100 {
            steering.update(0.5, 0.0, DT);
        }
        assert_relative_eq!(steering.smoothed(), 0.25);
    }

    #[test]
    fn test_recenters_inside_deadzone() {
        let mut steering = model();
        for _ in 0..100 {
            steering.update(1.0, 0.0, DT);
        }
        steering.update(0.005, 0.0, DT);
        assert_relative_eq!(steering.smoothed(), 1.0 - 2.0 * DT);

        for _ in 0..100 {
            steering.update(0.0, 0.0, DT);
        }
        assert_eq!(steering.smoothed(), 0.0);
    }

    #[test]
    fn test_recenter_rate_spans_speed_range() {
        let steering = model();
        assert_relative_eq!(steering.recenter_rate(0.0), 2.0);
        assert_relative_eq!(steering.recenter_rate(0.5), 5.0);
        assert_relative_eq!(steering.recenter_rate(1.0), 8.0);
    }

    #[test]
    fn test_recenter_capped_by_steer_rate() {
        let tight = SteeringModel::new(SteeringConfig::default().with_max_steer_rate(3.0)).unwrap();
        assert_relative_eq!(tight.recenter_rate(0.0), 2.0);
        assert_relative_eq!(tight.recenter_rate(1.0), 3.0);
    }

    #[test]
    fn test_range_shrinks_with_speed() {
        let steering = model();
        assert_relative_eq!(steering.range_deg(0.0), 30.0);
        assert_relative_eq!(steering.range_deg(0.5), 20.0);
        assert_relative_eq!(steering.range_deg(1.0), 10.0);

        let clamped = SteeringModel::new(SteeringConfig::default().with_range(30.0, 0.0, 8.0)).unwrap();
        assert_relative_eq!(clamped.range_deg(1.0), 8.0);
    }

    #[test]
    fn test_differential_bias_inner_wheel() {
        let mut steering = SteeringModel::new(SteeringConfig::default().with_differential_bias(true)).unwrap();
        for _ in 0..100 {
            steering.update(1.0, 0.0, DT);
        }
        // turning right: right wheel is inner
        assert_relative_eq!(steering.wheel_angle(Side::Right, 0.0), 30.0 * 1.15);
        assert_relative_eq!(steering.wheel_angle(Side::Left, 0.0), 30.0 * 0.85);

        for _ in 0..200 {
            steering.update(-1.0, 0.0, DT);
        }
        assert_relative_eq!(steering.wheel_angle(Side::Left, 0.0), -30.0 * 1.15);
    }

    #[test]
    fn test_no_bias_when_disabled() {
        let mut steering = model();
        for _ in 0..100 {
            steering.update(1.0, 0.0, DT);
        }
        assert_relative_eq!(steering.wheel_angle(Side::Left, 0.0), steering.wheel_angle(Side::Right, 0.0));
    }

    #[test]
    fn test_nan_input_recenters() {
        let mut steering = model();
        steering.update(1.0, 0.0, DT);
        let before = steering.smoothed();
        steering.update(f64::NAN, 0.0, DT);
        assert!(steering.smoothed() < before);
        assert!(steering.smoothed().is_finite());
    }

    #[test]
    fn test_rejects_min_range_above_full() {
        let config = SteeringConfig::default().with_range(10.0, 5.0, 20.0);
        assert!(SteeringModel::new(config).is_err());
    }
}
