//! Drivetrain - gearbox state machine, engine RPM estimate and motor torque
//!
//! The engine is rigidly coupled to the driven wheels in forward gears
//! (no clutch or converter slip). In neutral and reverse the RPM relaxes
//! toward idle. Torque delivery follows one of two policies that keep the
//! car inside the current gear's speed envelope.

use std::fmt;

use serde::{Deserialize, Serialize};
use simcore::{ConfigError, Model, SimContext, clamp01, inverse_lerp, lerp};
use simcore::error::ensure_at_least;

use crate::torque_curve::TorqueCurve;

/// One forward gear: its ratio and the top of its speed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GearRatio {
    pub ratio: f64,
    pub max_speed_kph: f64,
}

/// Forward gears, index 0 is first gear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GearRatioTable {
    gears: Vec<GearRatio>,
}

impl GearRatioTable {
    pub fn new(gears: Vec<GearRatio>) -> Result<Self, ConfigError> {
        let table = Self { gears };
        table.validate()?;
        Ok(table)
    }

    /// Build from `(ratio, max_speed_kph)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ConfigError> {
        Self::new(
            pairs
                .iter()
                .map(|&(ratio, max_speed_kph)| GearRatio { ratio, max_speed_kph })
                .collect(),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gears.is_empty() {
            return Err(ConfigError::EmptyGearTable);
        }
        for gear in &self.gears {
            ensure_at_least("gear_ratio", gear.ratio, f64::MIN_POSITIVE)?;
            ensure_at_least("gear_max_speed_kph", gear.max_speed_kph, f64::MIN_POSITIVE)?;
        }
        for (i, pair) in self.gears.windows(2).enumerate() {
            if !(pair[1].max_speed_kph > pair[0].max_speed_kph) {
                return Err(ConfigError::NonIncreasingGearSpeeds {
                    gear: i + 2,
                    previous: i + 1,
                    max_speed_kph: pair[1].max_speed_kph,
                });
            }
        }
        Ok(())
    }

    /// Number of forward gears (G).
    pub fn len(&self) -> usize {
        self.gears.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gears.is_empty()
    }

    /// Bound-checked, 1-based.
    pub fn get(&self, gear: u8) -> Option<&GearRatio> {
        let index = usize::from(gear).checked_sub(1)?;
        self.gears.get(index)
    }

    /// `[min, max]` speed of a forward gear; min is the previous gear's max.
    pub fn envelope(&self, gear: u8) -> Option<(f64, f64)> {
        let max = self.get(gear)?.max_speed_kph;
        let min = gear
            .checked_sub(1)
            .and_then(|previous| self.get(previous))
            .map(|g| g.max_speed_kph)
            .unwrap_or(0.0);
        Some((min, max))
    }
}

impl Default for GearRatioTable {
    fn default() -> Self {
        Self {
            gears: vec![
                GearRatio { ratio: 3.2, max_speed_kph: 20.0 },
                GearRatio { ratio: 2.1, max_speed_kph: 35.0 },
                GearRatio { ratio: 1.5, max_speed_kph: 55.0 },
                GearRatio { ratio: 1.15, max_speed_kph: 75.0 },
                GearRatio { ratio: 0.9, max_speed_kph: 95.0 },
            ],
        }
    }
}

/// Selected gear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gear {
    Reverse,
    #[default]
    Neutral,
    /// 1-based forward gear
    Forward(u8),
}

impl Gear {
    /// -1 for reverse, 0 for neutral, 1..G for forward gears.
    pub fn index(self) -> i32 {
        match self {
            Gear::Reverse => -1,
            Gear::Neutral => 0,
            Gear::Forward(n) => i32::from(n),
        }
    }

    /// `"R"`, `"N"` or the gear number.
    pub fn label(self) -> String {
        self.to_string()
    }

    /// Sign applied to motor torque.
    pub fn direction(self) -> f64 {
        match self {
            Gear::Reverse => -1.0,
            _ => 1.0,
        }
    }

    pub fn is_forward(self) -> bool {
        matches!(self, Gear::Forward(_))
    }
}

impl fmt::Display for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gear::Reverse => write!(f, "R"),
            Gear::Neutral => write!(f, "N"),
            Gear::Forward(n) => write!(f, "{n}"),
        }
    }
}

/// How motor torque is kept inside the gear's speed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TorquePolicy {
    /// Chase a throttle-selected speed inside the envelope; torque scales with
    /// the remaining speed error normalized over `response_kph`.
    TargetSpeed { response_kph: f64 },
    /// Full torque until the last `band_kph` below the gear's top speed,
    /// then ramp to zero.
    GearLimiter { band_kph: f64 },
}

impl Default for TorquePolicy {
    fn default() -> Self {
        TorquePolicy::TargetSpeed { response_kph: 10.0 }
    }
}

impl TorquePolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            TorquePolicy::TargetSpeed { response_kph } => {
                ensure_at_least("response_kph", response_kph, f64::MIN_POSITIVE)
            }
            TorquePolicy::GearLimiter { band_kph } => {
                ensure_at_least("band_kph", band_kph, f64::MIN_POSITIVE)
            }
        }
    }

    /// Scale in [0, 1] for a gear envelope at the current speed.
    pub fn factor(&self, envelope: (f64, f64), throttle: f64, speed_kph: f64) -> f64 {
        let (min_kph, max_kph) = envelope;
        match *self {
            TorquePolicy::TargetSpeed { response_kph } => {
                let target = lerp(min_kph, max_kph, clamp01(throttle));
                let speed_error = target - speed_kph;
                clamp01(speed_error / response_kph)
            }
            TorquePolicy::GearLimiter { band_kph } => {
                1.0 - inverse_lerp(max_kph - band_kph, max_kph, speed_kph)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearboxConfig {
    pub gears: GearRatioTable,
    pub final_drive: f64,
    /// Flat torque multiplier used in reverse in place of a gear ratio
    pub reverse_multiplier: f64,
    pub reverse_max_speed_kph: f64,
    /// Neutral → reverse is refused above this speed (exclusive)
    pub reverse_interlock_kph: f64,
}

impl Default for GearboxConfig {
    fn default() -> Self {
        Self {
            gears: GearRatioTable::default(),
            final_drive: 3.4,
            reverse_multiplier: 4.0,
            reverse_max_speed_kph: 20.0,
            reverse_interlock_kph: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub idle_rpm: f64,
    pub redline_rpm: f64,
    /// Peak engine torque (Nm)
    pub engine_torque: f64,
    pub torque_curve: TorqueCurve,
    /// Torque is cut within this many RPM of redline
    pub rev_limit_band_rpm: f64,
    /// Per-second rate at which RPM falls back to idle when decoupled
    pub idle_return_rate: f64,
    /// Overall scale on forward-gear torque
    pub forward_scale: f64,
    /// Brake torque at redline while coasting, when engine braking is enabled
    pub engine_brake_torque: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_rpm: 900.0,
            redline_rpm: 7000.0,
            engine_torque: 320.0,
            torque_curve: TorqueCurve::default(),
            rev_limit_band_rpm: 100.0,
            idle_return_rate: 5.0,
            forward_scale: 0.6,
            engine_brake_torque: 250.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivetrainConfig {
    pub gearbox: GearboxConfig,
    pub engine: EngineConfig,
    pub torque_policy: TorquePolicy,
    pub engine_braking_enabled: bool,
}

impl DrivetrainConfig {
    pub fn with_gears(mut self, gears: GearRatioTable) -> Self {
        self.gearbox.gears = gears;
        self
    }

    pub fn with_torque_policy(mut self, policy: TorquePolicy) -> Self {
        self.torque_policy = policy;
        self
    }

    pub fn with_engine_braking(mut self, enabled: bool) -> Self {
        self.engine_braking_enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gearbox = &self.gearbox;
        let engine = &self.engine;

        gearbox.gears.validate()?;
        ensure_at_least("final_drive", gearbox.final_drive, f64::MIN_POSITIVE)?;
        ensure_at_least("reverse_multiplier", gearbox.reverse_multiplier, 0.0)?;
        ensure_at_least("reverse_max_speed_kph", gearbox.reverse_max_speed_kph, f64::MIN_POSITIVE)?;
        ensure_at_least("reverse_interlock_kph", gearbox.reverse_interlock_kph, 0.0)?;

        ensure_at_least("idle_rpm", engine.idle_rpm, 0.0)?;
        if !(engine.redline_rpm > engine.idle_rpm) {
            return Err(ConfigError::invalid(
                "redline_rpm",
                format!("{} must exceed idle_rpm {}", engine.redline_rpm, engine.idle_rpm),
            ));
        }
        ensure_at_least("engine_torque", engine.engine_torque, 0.0)?;
        engine.torque_curve.validate()?;
        ensure_at_least("rev_limit_band_rpm", engine.rev_limit_band_rpm, 0.0)?;
        ensure_at_least("idle_return_rate", engine.idle_return_rate, 0.0)?;
        ensure_at_least("forward_scale", engine.forward_scale, 0.0)?;
        ensure_at_least("engine_brake_torque", engine.engine_brake_torque, 0.0)?;

        self.torque_policy.validate()
    }
}

/// Result of a shift request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOutcome {
    /// No rising edge this tick
    Idle,
    Shifted { from: Gear, to: Gear },
    /// Already at the end of the range
    AtLimit,
    /// Neutral → reverse refused while moving
    Interlocked,
}

/// Per-tick drivetrain input.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrivetrainInput {
    pub throttle: f64,
    pub brake: f64,
    pub shift_up: bool,
    pub shift_down: bool,
    /// Chassis speed magnitude (km/h)
    pub speed_kph: f64,
    /// Mean RPM of the motorized wheels; `None` when there are none
    pub wheel_rpm: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrivetrainOutput {
    pub gear: Gear,
    pub engine_rpm: f64,
    pub rpm01: f64,
    /// Torque magnitude available to each motorized wheel at full throttle
    pub motor_torque: f64,
    pub rev_limited: bool,
    /// Coasting brake torque for motorized wheels
    pub engine_brake_torque: f64,
    pub shift: ShiftOutcome,
}

/// Mean of the given wheel RPMs, `None` for an empty set.
pub fn average_wheel_rpm(rpms: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = rpms
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), rpm| (sum + rpm, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[derive(Debug, Clone)]
pub struct DrivetrainModel {
    config: DrivetrainConfig,
    gear: Gear,
    engine_rpm: f64,
    shift_up_held: bool,
    shift_down_held: bool,
}

impl DrivetrainModel {
    pub fn new(config: DrivetrainConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let idle = config.engine.idle_rpm;
        Ok(Self {
            config,
            gear: Gear::Neutral,
            engine_rpm: idle,
            shift_up_held: false,
            shift_down_held: false,
        })
    }

    pub fn config(&self) -> &DrivetrainConfig {
        &self.config
    }

    pub fn gear(&self) -> Gear {
        self.gear
    }

    pub fn engine_rpm(&self) -> f64 {
        self.engine_rpm
    }

    pub fn forward_gears(&self) -> u8 {
        u8::try_from(self.config.gearbox.gears.len()).unwrap_or(u8::MAX)
    }

    /// Engine speed as a fraction of the idle..redline band.
    pub fn rpm01(&self) -> f64 {
        let engine = &self.config.engine;
        inverse_lerp(engine.idle_rpm, engine.redline_rpm, self.engine_rpm)
    }

    pub fn torque_factor(&self) -> f64 {
        self.config.engine.torque_curve.evaluate(self.rpm01())
    }

    pub fn is_rev_limited(&self) -> bool {
        let engine = &self.config.engine;
        self.engine_rpm >= engine.redline_rpm - engine.rev_limit_band_rpm
    }

    /// Place the gearbox in a gear directly; out-of-range forward gears are clamped.
    pub fn set_gear(&mut self, gear: Gear) {
        self.gear = match gear {
            Gear::Forward(0) => Gear::Neutral,
            Gear::Forward(n) => Gear::Forward(n.min(self.forward_gears())),
            other => other,
        };
    }

    /// One step up: R → N → 1 → … → G, saturating at G.
    pub fn shift_up(&mut self) -> ShiftOutcome {
        let top = self.forward_gears();
        let next = match self.gear {
            Gear::Reverse => Gear::Neutral,
            Gear::Neutral => Gear::Forward(1),
            Gear::Forward(n) if n < top => Gear::Forward(n + 1),
            Gear::Forward(_) => return ShiftOutcome::AtLimit,
        };
        self.engage(next)
    }

    /// One step down: G → … → 1 → N → R, saturating at R.
    ///
    /// Neutral → reverse is refused while `speed_kph` exceeds the interlock speed.
    pub fn shift_down(&mut self, speed_kph: f64) -> ShiftOutcome {
        let next = match self.gear {
            Gear::Forward(n) if n > 1 => Gear::Forward(n - 1),
            Gear::Forward(_) => Gear::Neutral,
            Gear::Neutral => {
                let limit = self.config.gearbox.reverse_interlock_kph;
                if !(speed_kph.abs() <= limit) {
                    log::debug!("reverse refused at {speed_kph:.1} km/h (limit {limit} km/h)");
                    return ShiftOutcome::Interlocked;
                }
                Gear::Reverse
            }
            Gear::Reverse => return ShiftOutcome::AtLimit,
        };
        self.engage(next)
    }

    fn engage(&mut self, next: Gear) -> ShiftOutcome {
        let from = self.gear;
        self.gear = next;
        log::info!("gear {from} -> {next}");
        ShiftOutcome::Shifted { from, to: next }
    }

    /// Apply at most one shift, on the rising edge of either button.
    /// Shift-up wins if both rise together.
    pub fn handle_shift_buttons(&mut self, shift_up: bool, shift_down: bool, speed_kph: f64) -> ShiftOutcome {
        let up_edge = shift_up && !self.shift_up_held;
        let down_edge = shift_down && !self.shift_down_held;
        self.shift_up_held = shift_up;
        self.shift_down_held = shift_down;

        if up_edge {
            self.shift_up()
        } else if down_edge {
            self.shift_down(speed_kph)
        } else {
            ShiftOutcome::Idle
        }
    }

    /// Update the RPM estimate from the driven wheels.
    ///
    /// Without a wheel reading a forward gear holds the previous value.
    pub fn update_rpm(&mut self, wheel_rpm: Option<f64>, dt: f64) {
        let engine = &self.config.engine;
        let wheel_rpm = wheel_rpm.filter(|rpm| rpm.is_finite());

        let rpm = match (self.gear, wheel_rpm) {
            (Gear::Forward(n), Some(wheel_rpm)) => match self.config.gearbox.gears.get(n) {
                Some(gear) => wheel_rpm.abs() * gear.ratio * self.config.gearbox.final_drive,
                None => self.engine_rpm,
            },
            (Gear::Forward(_), None) => self.engine_rpm,
            _ => lerp(self.engine_rpm, engine.idle_rpm, clamp01(engine.idle_return_rate * dt)),
        };

        self.engine_rpm = if rpm.is_finite() {
            rpm.clamp(engine.idle_rpm, engine.redline_rpm)
        } else {
            engine.idle_rpm
        };
    }

    /// Torque magnitude per motorized wheel at full throttle for this tick.
    ///
    /// Zero in neutral and inside the rev-limit band.
    pub fn motor_torque(&self, throttle: f64, speed_kph: f64) -> f64 {
        if self.is_rev_limited() {
            return 0.0;
        }
        let gearbox = &self.config.gearbox;
        let engine = &self.config.engine;
        let base = engine.engine_torque * self.torque_factor();

        let torque = match self.gear {
            Gear::Neutral => 0.0,
            Gear::Forward(n) => {
                let (Some(gear), Some(envelope)) = (gearbox.gears.get(n), gearbox.gears.envelope(n)) else {
                    return 0.0;
                };
                let policy = self.config.torque_policy.factor(envelope, throttle, speed_kph.abs());
                base * gear.ratio * gearbox.final_drive * policy * engine.forward_scale
            }
            Gear::Reverse => {
                let envelope = (0.0, gearbox.reverse_max_speed_kph);
                let policy = self.config.torque_policy.factor(envelope, throttle, speed_kph.abs());
                base * gearbox.reverse_multiplier * policy
            }
        };
        if torque.is_finite() { torque.max(0.0) } else { 0.0 }
    }

    /// Coasting brake torque for motorized wheels, zero unless enabled.
    pub fn engine_brake_torque(&self, throttle: f64, brake: f64) -> f64 {
        if !self.config.engine_braking_enabled || !self.gear.is_forward() || throttle > 0.0 || brake > 0.0 {
            return 0.0;
        }
        self.config.engine.engine_brake_torque * self.rpm01()
    }

    /// Shift, then RPM, then torque.
    pub fn step(&mut self, ctx: SimContext, input: DrivetrainInput) -> DrivetrainOutput {
        let shift = self.handle_shift_buttons(input.shift_up, input.shift_down, input.speed_kph);
        self.update_rpm(input.wheel_rpm, ctx.dt);

        DrivetrainOutput {
            gear: self.gear,
            engine_rpm: self.engine_rpm,
            rpm01: self.rpm01(),
            motor_torque: self.motor_torque(input.throttle, input.speed_kph),
            rev_limited: self.is_rev_limited(),
            engine_brake_torque: self.engine_brake_torque(input.throttle, input.brake),
            shift,
        }
    }
}

impl Model for DrivetrainModel {
    fn reset(&mut self) {
        self.gear = Gear::Neutral;
        self.engine_rpm = self.config.engine.idle_rpm;
        self.shift_up_held = false;
        self.shift_down_held = false;
    }
}
