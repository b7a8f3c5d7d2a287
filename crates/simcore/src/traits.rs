use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::math::{clamp01, finite_or_zero};

// Physics boundary

/// Non-owning handle to a wheel inside the physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WheelId(pub usize);

/// Identifier of a physical contact material as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// Ground-contact state of one wheel for the current tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroundContact {
    pub grounded: bool,
    /// Lateral slip of the contact patch. Sign is irrelevant to the grip model.
    pub sideways_slip: f64,
    /// Suspension force at the contact (N).
    pub vertical_force: f64,
    pub material: Option<MaterialId>,
}

impl GroundContact {
    /// A wheel in the air.
    pub fn airborne() -> Self {
        Self::default()
    }

    /// Replace malformed engine readings with well-defined values.
    ///
    /// A non-finite slip reads as zero slip. A non-finite vertical force means
    /// the contact itself cannot be trusted, so the wheel reads as airborne.
    pub fn sanitized(self) -> Self {
        if !self.grounded || !self.vertical_force.is_finite() {
            return Self::airborne();
        }
        Self {
            grounded: true,
            sideways_slip: finite_or_zero(self.sideways_slip),
            vertical_force: self.vertical_force.max(0.0),
            material: self.material,
        }
    }

    /// True when the sanitized contact differs from the raw reading.
    pub fn is_malformed(&self) -> bool {
        self.grounded && (!self.sideways_slip.is_finite() || !self.vertical_force.is_finite())
    }
}

/// Actuation for one wheel, applied by the physics engine after the tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelCommand {
    pub steer_angle_deg: f64,
    pub motor_torque_nm: f64,
    pub brake_torque_nm: f64,
    pub sideways_stiffness: f64,
}

/// The rigid body and wheel colliders of one vehicle.
///
/// Implemented by the host physics engine. The simulation layer only reads
/// chassis state, queries wheel contacts and hands back commands.
pub trait VehicleBody {
    /// Linear velocity of the chassis in world space (m/s).
    fn linear_velocity(&self) -> Vector3<f64>;
    /// Angular velocity of the chassis in world space (rad/s).
    fn angular_velocity(&self) -> Vector3<f64>;
    /// Chassis orientation. Local +Z is forward, +Y is up.
    fn rotation(&self) -> UnitQuaternion<f64>;
    fn set_angular_velocity(&mut self, angular_velocity: Vector3<f64>);
    /// Shift the center of mass vertically by `offset` metres (negative lowers it).
    fn offset_center_of_mass(&mut self, offset: f64);
    fn ground_contact(&self, wheel: WheelId) -> GroundContact;
    /// Signed rotation speed of the wheel (rev/min).
    fn wheel_rpm(&self, wheel: WheelId) -> f64;
    fn apply_wheel_command(&mut self, wheel: WheelId, command: &WheelCommand);

    /// Chassis speed along its own forward axis (m/s).
    fn forward_speed(&self) -> f64 {
        let forward = self.rotation() * Vector3::z();
        forward.dot(&self.linear_velocity())
    }
}

// Haptic boundary

/// One rumble command for a dual-motor haptic device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HapticPulse {
    pub low_frequency: f64,
    pub high_frequency: f64,
    /// Advisory; the sink owns the expiry timer.
    pub duration_s: f64,
}

impl HapticPulse {
    pub fn new(low_frequency: f64, high_frequency: f64, duration_s: f64) -> Self {
        Self {
            low_frequency: clamp01(low_frequency),
            high_frequency: clamp01(high_frequency),
            duration_s: duration_s.max(0.0),
        }
    }

    /// The pulse that silences the device.
    pub fn stop() -> Self {
        Self::default()
    }

    pub fn is_stop(&self) -> bool {
        self.low_frequency == 0.0 && self.high_frequency == 0.0
    }
}

pub trait HapticSink {
    fn pulse(&mut self, pulse: HapticPulse);
}

// Driver boundary

/// Pre-normalized driver input for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverInput {
    /// 0..1
    pub throttle: f64,
    /// 0..1
    pub brake: f64,
    /// -1..1, positive steers right
    pub steer: f64,
    pub handbrake: bool,
    pub shift_up: bool,
    pub shift_down: bool,
}

impl DriverInput {
    /// Clamp every axis to its domain. NaN axes read as released.
    pub fn sanitized(self) -> Self {
        Self {
            throttle: clamp01(finite_or_zero(self.throttle)),
            brake: clamp01(finite_or_zero(self.brake)),
            steer: finite_or_zero(self.steer).clamp(-1.0, 1.0),
            ..self
        }
    }
}

// Simulation lifecycle

#[derive(Debug, Clone, Copy)]
pub struct SimContext {
    pub dt: f64,
    pub t: f64,
}

pub trait Model {
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_slip_reads_as_zero() {
        let contact = GroundContact {
            grounded: true,
            sideways_slip: f64::NAN,
            vertical_force: 3000.0,
            material: Some(MaterialId(1)),
        };
        assert!(contact.is_malformed());

        let clean = contact.sanitized();
        assert!(clean.grounded);
        assert_eq!(clean.sideways_slip, 0.0);
        assert_eq!(clean.material, Some(MaterialId(1)));
    }

    #[test]
    fn test_nan_force_reads_as_airborne() {
        let contact = GroundContact {
            grounded: true,
            sideways_slip: 0.3,
            vertical_force: f64::INFINITY,
            material: Some(MaterialId(1)),
        };
        assert_eq!(contact.sanitized(), GroundContact::airborne());
    }

    #[test]
    fn test_input_sanitized_to_domains() {
        let input = DriverInput {
            throttle: 1.7,
            brake: f64::NAN,
            steer: -3.0,
            handbrake: true,
            shift_up: false,
            shift_down: true,
        }
        .sanitized();

        assert_eq!(input.throttle, 1.0);
        assert_eq!(input.brake, 0.0);
        assert_eq!(input.steer, -1.0);
        assert!(input.handbrake);
        assert!(input.shift_down);
    }

    #[test]
    fn test_pulse_channels_clamped() {
        let pulse = HapticPulse::new(1.4, -0.2, 0.022);
        assert_eq!(pulse.low_frequency, 1.0);
        assert_eq!(pulse.high_frequency, 0.0);
        assert!(!pulse.is_stop());
        assert!(HapticPulse::stop().is_stop());
    }
}
