use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use simcore::{ConfigError, clamp01, lerp};
use simcore::error::ensure_at_least;

/// Speed-dependent yaw damping, as per-second decay rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YawDampingConfig {
    pub low_speed_damping: f64,
    pub high_speed_damping: f64,
}

impl Default for YawDampingConfig {
    fn default() -> Self {
        Self {
            low_speed_damping: 0.5,
            high_speed_damping: 3.0,
        }
    }
}

impl YawDampingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_at_least("low_speed_damping", self.low_speed_damping, 0.0)?;
        ensure_at_least("high_speed_damping", self.high_speed_damping, 0.0)
    }

    /// Fraction of yaw rate kept after one tick.
    pub fn retention(&self, speed01: f64, dt: f64) -> f64 {
        let damping = lerp(self.low_speed_damping, self.high_speed_damping, clamp01(speed01));
        clamp01(1.0 - damping * dt)
    }

    /// Damp the chassis-local yaw component of a world-space angular velocity.
    ///
    /// Pitch and roll pass through untouched.
    pub fn damp(
        &self,
        angular_velocity: Vector3<f64>,
        rotation: &UnitQuaternion<f64>,
        speed01: f64,
        dt: f64,
    ) -> Vector3<f64> {
        let mut local = rotation.inverse_transform_vector(&angular_velocity);
        local.y *= self.retention(speed01, dt);
        rotation.transform_vector(&local)
    }
}
