//! Haptic feedback aggregation
//!
//! Folds the per-wheel surface contributions into one dual-motor pulse per
//! tick and silences the device exactly once when feedback ends.

use mechanics::SurfaceContribution;
use serde::{Deserialize, Serialize};
use simcore::error::ensure_at_least;
use simcore::{ConfigError, HapticPulse, HapticSink, Model, clamp01};

/// Configuration for haptic aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapticConfig {
    /// No feedback at or below this chassis speed (km/h)
    pub min_speed_kph: f64,
    /// Pulse duration as a multiple of the tick length
    pub duration_factor: f64,
}

impl Default for HapticConfig {
    fn default() -> Self {
        Self {
            min_speed_kph: 3.0,
            duration_factor: 1.1,
        }
    }
}

impl HapticConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_at_least("min_speed_kph", self.min_speed_kph, 0.0)?;
        ensure_at_least("duration_factor", self.duration_factor, 0.0)
    }
}

/// What the aggregator sent to the sink this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HapticEmission {
    Pulse(HapticPulse),
    /// The single zero pulse after feedback ends
    Stop,
    /// Nothing sent
    Idle,
}

/// Average `(low, high)` over contributing wheels, `None` if there are none.
///
/// The high channel of a speed-scaled surface is further scaled by `speed01`.
pub fn average_contributions(
    contributions: impl IntoIterator<Item = SurfaceContribution>,
    speed01: f64,
) -> Option<(f64, f64)> {
    let speed01 = clamp01(speed01);
    let (low, high, count) = contributions
        .into_iter()
        .fold((0.0, 0.0, 0usize), |(low, high, count), c| {
            let speed_scale = if c.speed_scaled { speed01 } else { 1.0 };
            (
                low + c.low_frequency * c.strength,
                high + c.high_frequency * c.strength * speed_scale,
                count + 1,
            )
        });
    if count == 0 {
        return None;
    }
    let n = count as f64;
    Some((clamp01(low / n), clamp01(high / n)))
}

/// Edge-triggered haptic pipeline in front of an injected sink
pub struct HapticFeedbackAggregator {
    config: HapticConfig,
    sink: Box<dyn HapticSink>,
    active: bool,
}

impl HapticFeedbackAggregator {
    /// Create an aggregator driving `sink`
    pub fn new(config: HapticConfig, sink: Box<dyn HapticSink>) -> Self {
        Self {
            config,
            sink,
            active: false,
        }
    }

    pub fn config(&self) -> &HapticConfig {
        &self.config
    }

    /// Whether the last emission left the device rumbling
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Aggregate this tick's contributions and drive the sink
    pub fn update(
        &mut self,
        contributions: impl IntoIterator<Item = SurfaceContribution>,
        speed_kph: f64,
        speed01: f64,
        dt: f64,
    ) -> HapticEmission {
        let fast_enough = speed_kph > self.config.min_speed_kph;
        let averaged = if fast_enough {
            average_contributions(contributions, speed01)
        } else {
            None
        };

        match averaged {
            Some((low, high)) => {
                let pulse = HapticPulse::new(low, high, dt * self.config.duration_factor);
                self.sink.pulse(pulse);
                self.active = true;
                HapticEmission::Pulse(pulse)
            }
            None if self.active => {
                log::debug!("haptic feedback stopped at {speed_kph:.1} km/h");
                self.sink.pulse(HapticPulse::stop());
                self.active = false;
                HapticEmission::Stop
            }
            None => HapticEmission::Idle,
        }
    }
}

impl Model for HapticFeedbackAggregator {
    /// Silence the device if it may still be rumbling
    fn reset(&mut self) {
        if self.active {
            self.sink.pulse(HapticPulse::stop());
        }
        self.active = false;
    }
}
