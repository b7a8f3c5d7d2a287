//! Engine torque band as a piecewise-linear curve over normalized RPM.

use serde::{Deserialize, Serialize};
use simcore::{ConfigError, clamp01, lerp};

/// Keyframes `[rpm01, torque_factor]`, sorted by `rpm01`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorqueCurve {
    pub points: Vec<[f64; 2]>,
}

impl Default for TorqueCurve {
    /// Rises quickly off idle, flat peak through the middle of the band,
    /// falls away toward redline.
    fn default() -> Self {
        Self {
            points: vec![
                [0.0, 0.45],
                [0.15, 0.75],
                [0.35, 1.0],
                [0.6, 1.0],
                [0.85, 0.8],
                [1.0, 0.6],
            ],
        }
    }
}

impl TorqueCurve {
    pub fn new(points: Vec<[f64; 2]>) -> Result<Self, ConfigError> {
        let curve = Self { points };
        curve.validate()?;
        Ok(curve)
    }

    /// A flat curve; handy for isolating other terms in tests.
    pub fn flat(factor: f64) -> Self {
        Self {
            points: vec![[0.0, factor], [1.0, factor]],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.points.is_empty() {
            return Err(ConfigError::invalid("torque_curve", "needs at least one point"));
        }
        for pair in self.points.windows(2) {
            if !(pair[1][0] > pair[0][0]) {
                return Err(ConfigError::invalid(
                    "torque_curve",
                    format!("rpm01 keys must increase ({} then {})", pair[0][0], pair[1][0]),
                ));
            }
        }
        if let Some(p) = self.points.iter().find(|p| !(0.0..=1.0).contains(&p[1])) {
            return Err(ConfigError::invalid(
                "torque_curve",
                format!("torque factor {} outside [0, 1]", p[1]),
            ));
        }
        Ok(())
    }

    /// Torque factor in [0, 1] at `rpm01`. Holds the end values outside the keys.
    pub fn evaluate(&self, rpm01: f64) -> f64 {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        if rpm01.is_nan() || rpm01 <= first[0] {
            return clamp01(first[1]);
        }
        if rpm01 >= last[0] {
            return clamp01(last[1]);
        }

        let value = self
            .points
            .windows(2)
            .find(|pair| rpm01 <= pair[1][0])
            .map(|pair| {
                let t = (rpm01 - pair[0][0]) / (pair[1][0] - pair[0][0]);
                lerp(pair[0][1], pair[1][1], t)
            })
            .unwrap_or(last[1]);
        clamp01(value)
    }
}
