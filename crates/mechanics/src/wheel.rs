//! Per-wheel actuation: torque distribution, sideways grip and surface sensing.

use serde::{Deserialize, Serialize};
use simcore::{ConfigError, GroundContact, Model, WheelCommand, WheelId, clamp01, inverse_lerp, lerp};
use simcore::error::{ensure_at_least, ensure_within};

use crate::surface::{SurfaceCatalog, SurfaceProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axle {
    Front,
    Rear,
}

/// Fixed properties of one wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    pub side: Side,
    pub axle: Axle,
    #[serde(default)]
    pub steerable: bool,
    #[serde(default)]
    pub motorized: bool,
    /// Spring rate used to normalize the contact force into a load fraction
    #[serde(default = "default_spring")]
    pub suspension_spring: f64,
}

fn default_spring() -> f64 {
    35_000.0
}

impl WheelConfig {
    pub fn new(side: Side, axle: Axle) -> Self {
        Self {
            side,
            axle,
            steerable: false,
            motorized: false,
            suspension_spring: default_spring(),
        }
    }

    pub fn steerable(mut self) -> Self {
        self.steerable = true;
        self
    }

    pub fn motorized(mut self) -> Self {
        self.motorized = true;
        self
    }

    pub fn with_suspension_spring(mut self, spring: f64) -> Self {
        self.suspension_spring = spring;
        self
    }

    /// Front-steer, rear-drive layout: FL, FR, RL, RR.
    pub fn rear_drive_layout() -> Vec<WheelConfig> {
        vec![
            WheelConfig::new(Side::Left, Axle::Front).steerable(),
            WheelConfig::new(Side::Right, Axle::Front).steerable(),
            WheelConfig::new(Side::Left, Axle::Rear).motorized(),
            WheelConfig::new(Side::Right, Axle::Rear).motorized(),
        ]
    }
}

/// Sideways friction stiffness levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GripConfig {
    /// Stiffness once the tire has fully broken away
    pub min_sideways_grip: f64,
    /// Stiffness below the slip band
    pub max_sideways_grip: f64,
    /// Used while airborne
    pub normal_stiffness: f64,
    pub brake_stiffness: f64,
    pub handbrake_stiffness: f64,
    pub slip_band_start: f64,
    pub slip_band_end: f64,
}

impl Default for GripConfig {
    fn default() -> Self {
        Self {
            min_sideways_grip: 0.4,
            max_sideways_grip: 1.0,
            normal_stiffness: 1.0,
            brake_stiffness: 0.75,
            handbrake_stiffness: 0.3,
            slip_band_start: 0.2,
            slip_band_end: 1.0,
        }
    }
}

impl GripConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_at_least("min_sideways_grip", self.min_sideways_grip, 0.0)?;
        ensure_at_least("max_sideways_grip", self.max_sideways_grip, self.min_sideways_grip)?;
        ensure_at_least("normal_stiffness", self.normal_stiffness, 0.0)?;
        ensure_at_least("brake_stiffness", self.brake_stiffness, 0.0)?;
        ensure_at_least("handbrake_stiffness", self.handbrake_stiffness, 0.0)?;
        ensure_at_least("slip_band_start", self.slip_band_start, 0.0)?;
        if !(self.slip_band_end > self.slip_band_start) {
            return Err(ConfigError::invalid(
                "slip_band_end",
                format!("{} must exceed slip_band_start {}", self.slip_band_end, self.slip_band_start),
            ));
        }
        Ok(())
    }

    /// Slip-dependent stiffness before the surface factor.
    pub fn dynamic_grip(&self, slip: f64) -> f64 {
        let slip01 = inverse_lerp(self.slip_band_start, self.slip_band_end, slip.abs());
        lerp(self.max_sideways_grip, self.min_sideways_grip, slip01)
    }
}

/// Which wheels keep full braking authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrakeBiasTarget {
    #[default]
    NonDriven,
    Front,
    Rear,
    /// Every wheel brakes at full torque
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakeConfig {
    /// Full brake torque per wheel (Nm)
    pub brake_torque: f64,
    /// Handbrake torque as a multiple of `brake_torque`
    pub handbrake_multiplier: f64,
    pub bias_target: BrakeBiasTarget,
    /// Scale on wheels outside the bias target
    pub bias_multiplier: f64,
    /// Fraction of brake removed from steerable wheels at full lock
    pub steering_relief: f64,
}

impl Default for BrakeConfig {
    fn default() -> Self {
        Self {
            brake_torque: 1500.0,
            handbrake_multiplier: 2.0,
            bias_target: BrakeBiasTarget::NonDriven,
            bias_multiplier: 0.6,
            steering_relief: 0.3,
        }
    }
}

impl BrakeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_at_least("brake_torque", self.brake_torque, 0.0)?;
        ensure_at_least("handbrake_multiplier", self.handbrake_multiplier, 0.0)?;
        ensure_within("bias_multiplier", self.bias_multiplier, 0.0, 1.0)?;
        ensure_within("steering_relief", self.steering_relief, 0.0, 1.0)
    }

    /// Brake authority of a wheel in [0, 1] at the given smoothed steer.
    pub fn bias(&self, wheel: &WheelConfig, smoothed_steer: f64) -> f64 {
        let favoured = match self.bias_target {
            BrakeBiasTarget::NonDriven => !wheel.motorized,
            BrakeBiasTarget::Front => wheel.axle == Axle::Front,
            BrakeBiasTarget::Rear => wheel.axle == Axle::Rear,
            BrakeBiasTarget::None => true,
        };
        let mut bias = if favoured { 1.0 } else { self.bias_multiplier };
        if wheel.steerable {
            bias *= 1.0 - self.steering_relief * clamp01(smoothed_steer.abs());
        }
        clamp01(bias)
    }
}

/// Grip and brake tuning shared by every wheel of a vehicle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelTuning {
    pub grip: GripConfig,
    pub brakes: BrakeConfig,
}

impl WheelTuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grip.validate()?;
        self.brakes.validate()
    }
}

/// Drivetrain and pedal state handed to every wheel for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct WheelDrive {
    pub throttle: f64,
    pub brake: f64,
    pub smoothed_steer: f64,
    /// Per-wheel torque magnitude at full throttle, already zero when rev-limited
    pub motor_torque: f64,
    /// -1 in reverse
    pub direction: f64,
    pub engine_brake_torque: f64,
}

/// Which level of the grip stack set the stiffness this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GripSource {
    #[default]
    Default,
    DynamicSlip,
    Braking,
    Handbrake,
}

/// Haptic contribution of a wheel resting on a known surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceContribution {
    /// clamp01((slip + load) * intensity)
    pub strength: f64,
    pub low_frequency: f64,
    pub high_frequency: f64,
    pub speed_scaled: bool,
}

impl SurfaceContribution {
    fn new(profile: &SurfaceProfile, slip: f64, load: f64) -> Self {
        Self {
            strength: clamp01((slip.abs() + load) * profile.intensity_multiplier),
            low_frequency: profile.low_frequency,
            high_frequency: profile.high_frequency,
            speed_scaled: profile.speed_scaled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WheelState {
    id: WheelId,
    config: WheelConfig,
    handbrake_active: bool,
    command: WheelCommand,
    grip_source: GripSource,
    on_curb: bool,
    contribution: Option<SurfaceContribution>,
}

impl WheelState {
    pub fn new(id: WheelId, config: WheelConfig) -> Self {
        Self {
            id,
            config,
            handbrake_active: false,
            command: WheelCommand::default(),
            grip_source: GripSource::Default,
            on_curb: false,
            contribution: None,
        }
    }

    pub fn id(&self) -> WheelId {
        self.id
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn is_steerable(&self) -> bool {
        self.config.steerable
    }

    pub fn is_motorized(&self) -> bool {
        self.config.motorized
    }

    pub fn side(&self) -> Side {
        self.config.side
    }

    pub fn handbrake_active(&self) -> bool {
        self.handbrake_active
    }

    /// Latest command, as handed to the physics engine.
    pub fn command(&self) -> &WheelCommand {
        &self.command
    }

    pub fn grip_source(&self) -> GripSource {
        self.grip_source
    }

    pub fn on_curb(&self) -> bool {
        self.on_curb
    }

    pub fn contribution(&self) -> Option<SurfaceContribution> {
        self.contribution
    }

    /// Handbrake command sink. Returns true when the state changed.
    pub fn set_handbrake(&mut self, active: bool) -> bool {
        if self.handbrake_active == active {
            return false;
        }
        self.handbrake_active = active;
        true
    }

    /// Steer command sink; ignored by fixed wheels.
    pub fn set_steer_angle(&mut self, angle_deg: f64) {
        self.command.steer_angle_deg = if self.config.steerable && angle_deg.is_finite() {
            angle_deg
        } else {
            0.0
        };
    }

    /// Motor and brake torque for this tick.
    ///
    /// A locked handbrake on a driven wheel overrides everything else.
    pub fn apply_drive(&mut self, drive: &WheelDrive, brakes: &BrakeConfig) {
        self.command.motor_torque_nm = 0.0;
        self.command.brake_torque_nm = 0.0;

        if self.handbrake_active && self.config.motorized {
            self.command.brake_torque_nm = brakes.brake_torque * brakes.handbrake_multiplier;
            return;
        }

        if drive.throttle > 0.0 && self.config.motorized {
            self.command.motor_torque_nm = drive.motor_torque * drive.throttle * drive.direction;
        }

        if drive.brake > 0.0 {
            let bias = brakes.bias(&self.config, drive.smoothed_steer);
            self.command.brake_torque_nm = drive.brake * brakes.brake_torque * bias;
        } else if self.config.motorized && drive.engine_brake_torque > 0.0 {
            self.command.brake_torque_nm = drive.engine_brake_torque;
        }

        if !self.command.motor_torque_nm.is_finite() {
            self.command.motor_torque_nm = 0.0;
        }
        if !self.command.brake_torque_nm.is_finite() || self.command.brake_torque_nm < 0.0 {
            self.command.brake_torque_nm = 0.0;
        }
    }

    /// Sideways stiffness and surface sensing from the current contact.
    pub fn update_grip(&mut self, contact: GroundContact, braking: bool, catalog: &SurfaceCatalog, grip: &GripConfig) {
        if contact.is_malformed() {
            log::warn!("wheel {}: malformed contact reading sanitized", self.id.0);
        }
        let contact = contact.sanitized();
        let surface = if contact.grounded {
            catalog.lookup(contact.material)
        } else {
            None
        };

        let (source, stiffness) = if self.handbrake_active {
            (GripSource::Handbrake, grip.handbrake_stiffness)
        } else if braking {
            (GripSource::Braking, grip.brake_stiffness)
        } else if contact.grounded {
            let surface_grip = surface.map_or(1.0, |s| s.sideways_grip);
            (GripSource::DynamicSlip, grip.dynamic_grip(contact.sideways_slip) * surface_grip)
        } else {
            (GripSource::Default, grip.normal_stiffness)
        };
        self.grip_source = source;
        self.command.sideways_stiffness = if stiffness.is_finite() { stiffness.max(0.0) } else { 0.0 };

        self.on_curb = surface.is_some_and(|s| s.curb);
        self.contribution = surface.map(|profile| {
            let load = if self.config.suspension_spring > 0.0 {
                contact.vertical_force / self.config.suspension_spring
            } else {
                0.0
            };
            SurfaceContribution::new(profile, contact.sideways_slip, load)
        });
    }

    /// Full per-tick update: torques first, then grip. Returns the command to apply.
    pub fn update(
        &mut self,
        contact: GroundContact,
        drive: &WheelDrive,
        catalog: &SurfaceCatalog,
        tuning: &WheelTuning,
    ) -> WheelCommand {
        self.apply_drive(drive, &tuning.brakes);
        self.update_grip(contact, drive.brake > 0.0, catalog, &tuning.grip);
        self.command
    }
}

impl Model for WheelState {
    fn reset(&mut self) {
        self.handbrake_active = false;
        self.command = WheelCommand::default();
        self.grip_source = GripSource::Default;
        self.on_curb = false;
        self.contribution = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use simcore::MaterialId;

    fn rear_left() -> WheelState {
        WheelState::new(WheelId(2), WheelConfig::new(Side::Left, Axle::Rear).motorized())
    }

    fn front_left() -> WheelState {
        WheelState::new(WheelId(0), WheelConfig::new(Side::Left, Axle::Front).steerable())
    }

    fn grounded(slip: f64, material: Option<MaterialId>) -> GroundContact {
        GroundContact {
            grounded: true,
            sideways_slip: slip,
            vertical_force: 3500.0,
            material,
        }
    }

    fn drive(throttle: f64, brake: f64) -> WheelDrive {
        WheelDrive {
            throttle,
            brake,
            smoothed_steer: 0.0,
            motor_torque: 1000.0,
            direction: 1.0,
            engine_brake_torque: 0.0,
        }
    }

    #[test]
    fn test_slip_band_floor_gives_max_grip() {
        let mut wheel = rear_left();
        let grip = GripConfig::default();
        wheel.update_grip(grounded(0.2, None), false, &SurfaceCatalog::default(), &grip);
        assert_relative_eq!(wheel.command().sideways_stiffness, grip.max_sideways_grip);
        assert_eq!(wheel.grip_source(), GripSource::DynamicSlip);
    }

    #[test]
    fn test_slip_band_ceiling_gives_min_grip() {
        let mut wheel = rear_left();
        let grip = GripConfig::default();
        wheel.update_grip(grounded(1.0, None), false, &SurfaceCatalog::default(), &grip);
        assert_relative_eq!(wheel.command().sideways_stiffness, grip.min_sideways_grip);

        wheel.update_grip(grounded(-3.0, None), false, &SurfaceCatalog::default(), &grip);
        assert_relative_eq!(wheel.command().sideways_stiffness, grip.min_sideways_grip);
    }

    #[test]
    fn test_surface_grip_scales_dynamic_grip() {
        let mut wheel = rear_left();
        let catalog = SurfaceCatalog::reference().unwrap();
        wheel.update_grip(grounded(0.0, Some(MaterialId(3))), false, &catalog, &GripConfig::default());
        assert_relative_eq!(wheel.command().sideways_stiffness, 0.55);
    }

    #[test]
    fn test_handbrake_beats_braking() {
        let mut wheel = rear_left();
        wheel.set_handbrake(true);
        let tuning = WheelTuning::default();
        let command = wheel.update(grounded(0.5, None), &drive(0.0, 1.0), &SurfaceCatalog::default(), &tuning);

        assert_relative_eq!(command.sideways_stiffness, tuning.grip.handbrake_stiffness);
        assert_eq!(wheel.grip_source(), GripSource::Handbrake);
    }

    #[test]
    fn test_braking_beats_dynamic_slip_and_releases() {
        let mut wheel = rear_left();
        let tuning = WheelTuning::default();
        let catalog = SurfaceCatalog::default();

        wheel.update(grounded(0.0, None), &drive(0.0, 0.5), &catalog, &tuning);
        assert_relative_eq!(wheel.command().sideways_stiffness, tuning.grip.brake_stiffness);

        wheel.update(grounded(0.0, None), &drive(0.0, 0.0), &catalog, &tuning);
        assert_relative_eq!(wheel.command().sideways_stiffness, tuning.grip.max_sideways_grip);
    }

    #[test]
    fn test_airborne_wheel_gets_normal_stiffness_and_no_contribution() {
        let mut wheel = rear_left();
        wheel.update_grip(GroundContact::airborne(), false, &SurfaceCatalog::reference().unwrap(), &GripConfig::default());
        assert_relative_eq!(wheel.command().sideways_stiffness, 1.0);
        assert!(wheel.contribution().is_none());
        assert!(!wheel.on_curb());
    }

    #[test]
    fn test_handbrake_is_terminal_for_driven_wheel() {
        let mut wheel = rear_left();
        wheel.set_handbrake(true);
        let brakes = BrakeConfig::default();
        wheel.apply_drive(&drive(1.0, 0.0), &brakes);

        assert_eq!(wheel.command().motor_torque_nm, 0.0);
        assert_relative_eq!(wheel.command().brake_torque_nm, 3000.0);
    }

    #[test]
    fn test_handbrake_on_undriven_wheel_keeps_pedal_braking() {
        let mut wheel = front_left();
        wheel.set_handbrake(true);
        wheel.apply_drive(&drive(0.0, 1.0), &BrakeConfig::default());
        assert_relative_eq!(wheel.command().brake_torque_nm, 1500.0);
    }

    #[test]
    fn test_motor_torque_follows_throttle_and_direction() {
        let mut wheel = rear_left();
        let mut reverse = drive(0.5, 0.0);
        reverse.direction = -1.0;
        wheel.apply_drive(&reverse, &BrakeConfig::default());
        assert_relative_eq!(wheel.command().motor_torque_nm, -500.0);

        let mut steer_only = front_left();
        steer_only.apply_drive(&drive(1.0, 0.0), &BrakeConfig::default());
        assert_eq!(steer_only.command().motor_torque_nm, 0.0);
    }

    #[test]
    fn test_torques_cleared_each_tick() {
        let mut wheel = rear_left();
        let brakes = BrakeConfig::default();
        wheel.apply_drive(&drive(1.0, 1.0), &brakes);
        assert!(wheel.command().brake_torque_nm > 0.0);

        wheel.apply_drive(&drive(0.0, 0.0), &brakes);
        assert_eq!(wheel.command().motor_torque_nm, 0.0);
        assert_eq!(wheel.command().brake_torque_nm, 0.0);
    }

    #[test]
    fn test_brake_bias_toward_non_driven_wheels() {
        let brakes = BrakeConfig::default();
        let driven = WheelConfig::new(Side::Left, Axle::Rear).motorized();
        let free = WheelConfig::new(Side::Left, Axle::Front);
        assert_relative_eq!(brakes.bias(&free, 0.0), 1.0);
        assert_relative_eq!(brakes.bias(&driven, 0.0), 0.6);
    }

    #[test]
    fn test_front_braking_relieved_while_steering() {
        let brakes = BrakeConfig {
            bias_target: BrakeBiasTarget::Front,
            ..BrakeConfig::default()
        };
        let front = WheelConfig::new(Side::Right, Axle::Front).steerable();
        assert_relative_eq!(brakes.bias(&front, 0.0), 1.0);
        assert_relative_eq!(brakes.bias(&front, -1.0), 0.7);

        let rear = WheelConfig::new(Side::Right, Axle::Rear);
        assert_relative_eq!(brakes.bias(&rear, 1.0), 0.6);
    }

    #[test]
    fn test_engine_braking_only_without_pedal() {
        let mut wheel = rear_left();
        let mut coast = drive(0.0, 0.0);
        coast.engine_brake_torque = 120.0;
        wheel.apply_drive(&coast, &BrakeConfig::default());
        assert_relative_eq!(wheel.command().brake_torque_nm, 120.0);

        let mut front = front_left();
        front.apply_drive(&coast, &BrakeConfig::default());
        assert_eq!(front.command().brake_torque_nm, 0.0);
    }

    #[test]
    fn test_contribution_strength() {
        let mut wheel = rear_left();
        let catalog = SurfaceCatalog::reference().unwrap();
        // gravel: intensity 1.2, load = 3500 / 35000 = 0.1
        wheel.update_grip(grounded(0.3, Some(MaterialId(3))), false, &catalog, &GripConfig::default());
        let contribution = wheel.contribution().unwrap();
        assert_relative_eq!(contribution.strength, (0.3 + 0.1) * 1.2, epsilon = 1e-12);
        assert_relative_eq!(contribution.low_frequency, 0.6);
    }

    #[test]
    fn test_contribution_strength_clamped() {
        let mut wheel = rear_left();
        wheel.update_grip(grounded(2.0, Some(MaterialId(2))), false, &SurfaceCatalog::reference().unwrap(), &GripConfig::default());
        assert_eq!(wheel.contribution().unwrap().strength, 1.0);
        assert!(wheel.on_curb());
    }

    #[test]
    fn test_unknown_material_keeps_slip_grip_without_contribution() {
        let mut wheel = rear_left();
        wheel.update_grip(grounded(1.0, Some(MaterialId(404))), false, &SurfaceCatalog::reference().unwrap(), &GripConfig::default());
        assert!(wheel.contribution().is_none());
        assert_relative_eq!(wheel.command().sideways_stiffness, 0.4);
    }

    #[test]
    fn test_nan_slip_treated_as_zero() {
        let mut wheel = rear_left();
        wheel.update_grip(grounded(f64::NAN, Some(MaterialId(1))), false, &SurfaceCatalog::reference().unwrap(), &GripConfig::default());
        assert_relative_eq!(wheel.command().sideways_stiffness, 1.0);
        assert!(wheel.contribution().unwrap().strength.is_finite());
    }

    #[test]
    fn test_set_handbrake_reports_edges_only() {
        let mut wheel = rear_left();
        assert!(wheel.set_handbrake(true));
        assert!(!wheel.set_handbrake(true));
        assert!(wheel.set_handbrake(false));
    }

    #[test]
    fn test_fixed_wheel_ignores_steer() {
        let mut wheel = rear_left();
        wheel.set_steer_angle(20.0);
        assert_eq!(wheel.command().steer_angle_deg, 0.0);

        let mut front = front_left();
        front.set_steer_angle(20.0);
        assert_eq!(front.command().steer_angle_deg, 20.0);
    }

    #[test]
    fn test_grip_config_rejects_inverted_band() {
        let grip = GripConfig {
            slip_band_start: 1.0,
            slip_band_end: 0.5,
            ..GripConfig::default()
        };
        assert!(grip.validate().is_err());
    }
}
