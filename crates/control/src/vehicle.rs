//! Vehicle controller
//!
//! Owns the drivetrain, the steering filter and the wheel arena of one car and
//! runs them in a fixed order once per physics tick:
//!
//! 1. sample and sanitize driver input
//! 2. steering
//! 3. gearbox, engine RPM and torque
//! 4. per-wheel torque, brake and grip
//! 5. yaw damping
//! 6. haptic aggregation

use std::sync::Arc;

use mechanics::{
    DrivetrainInput, DrivetrainModel, Gear, SurfaceCatalog, WheelDrive, WheelState, average_wheel_rpm,
};
use serde::Serialize;
use simcore::{
    ConfigError, DriverInput, HapticSink, MPS_TO_KPH, Model, SimContext, VehicleBody, WheelId, finite_or_zero,
    inverse_lerp,
};

use crate::config::VehicleConfig;
use crate::haptics::{HapticEmission, HapticFeedbackAggregator};
use crate::steering::SteeringModel;

/// Read-only snapshot for displays, produced every tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    /// Chassis speed magnitude (km/h)
    pub speed_kph: f64,
    /// Signed speed along the chassis forward axis (km/h)
    pub forward_speed_kph: f64,
    pub engine_rpm: f64,
    pub gear: Gear,
    /// "R", "N" or the gear number
    pub gear_label: String,
    pub smoothed_steer: f64,
    pub wheels_on_curb: usize,
    pub haptic_active: bool,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            speed_kph: 0.0,
            forward_speed_kph: 0.0,
            engine_rpm: 0.0,
            gear: Gear::Neutral,
            gear_label: Gear::Neutral.label(),
            smoothed_steer: 0.0,
            wheels_on_curb: 0,
            haptic_active: false,
        }
    }
}

/// Per-vehicle orchestrator
pub struct VehicleController {
    config: VehicleConfig,
    surfaces: Arc<SurfaceCatalog>,
    steering: SteeringModel,
    drivetrain: DrivetrainModel,
    wheels: Vec<WheelState>,
    haptics: HapticFeedbackAggregator,
    handbrake_held: bool,
    center_of_mass_applied: bool,
    last_emission: HapticEmission,
}

impl VehicleController {
    /// Build a controller; the wheel list index becomes each wheel's handle
    pub fn new(
        config: VehicleConfig,
        surfaces: Arc<SurfaceCatalog>,
        haptic_sink: Box<dyn HapticSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let steering = SteeringModel::new(config.steering.clone())?;
        let drivetrain = DrivetrainModel::new(config.drivetrain.clone())?;
        let wheels: Vec<WheelState> = config
            .wheels
            .iter()
            .enumerate()
            .map(|(i, wheel)| WheelState::new(WheelId(i), wheel.clone()))
            .collect();
        let haptics = HapticFeedbackAggregator::new(config.haptics.clone(), haptic_sink);

        log::info!(
            "vehicle controller ready: {} wheels ({} driven, {} steered), {} gears, {} surfaces",
            wheels.len(),
            wheels.iter().filter(|w| w.is_motorized()).count(),
            wheels.iter().filter(|w| w.is_steerable()).count(),
            drivetrain.forward_gears(),
            surfaces.len()
        );

        Ok(Self {
            config,
            surfaces,
            steering,
            drivetrain,
            wheels,
            haptics,
            handbrake_held: false,
            center_of_mass_applied: false,
            last_emission: HapticEmission::Idle,
        })
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn wheels(&self) -> &[WheelState] {
        &self.wheels
    }

    pub fn drivetrain(&self) -> &DrivetrainModel {
        &self.drivetrain
    }

    pub fn steering(&self) -> &SteeringModel {
        &self.steering
    }

    /// What the haptic stage emitted on the last tick
    pub fn last_emission(&self) -> HapticEmission {
        self.last_emission
    }

    /// Lower the center of mass. Only the first call has an effect.
    pub fn attach(&mut self, body: &mut dyn VehicleBody) {
        if self.center_of_mass_applied {
            return;
        }
        body.offset_center_of_mass(self.config.center_of_mass_offset);
        self.center_of_mass_applied = true;
    }

    /// Normalized speed shared by every speed-adaptive term
    pub fn speed01(&self, speed_kph: f64) -> f64 {
        inverse_lerp(0.0, self.config.top_speed_kph, speed_kph)
    }

    /// Run one tick against the physics body
    pub fn tick(&mut self, ctx: SimContext, input: DriverInput, body: &mut dyn VehicleBody) -> Telemetry {
        self.attach(body);

        let input = input.sanitized();
        let dt = finite_or_zero(ctx.dt).max(0.0);
        let ctx = SimContext { dt, t: ctx.t };

        let speed_kph = finite_or_zero(body.linear_velocity().norm() * MPS_TO_KPH);
        let forward_speed_kph = finite_or_zero(body.forward_speed() * MPS_TO_KPH);
        let speed01 = self.speed01(speed_kph);

        // Steering
        let smoothed_steer = self.steering.update(input.steer, speed01, dt);

        // Drivetrain
        let wheel_rpm = average_wheel_rpm(
            self.wheels
                .iter()
                .filter(|w| w.is_motorized())
                .map(|w| body.wheel_rpm(w.id()))
                .filter(|rpm| rpm.is_finite()),
        );
        let drive_out = self.drivetrain.step(
            ctx,
            DrivetrainInput {
                throttle: input.throttle,
                brake: input.brake,
                shift_up: input.shift_up,
                shift_down: input.shift_down,
                speed_kph,
                wheel_rpm,
            },
        );

        // Wheels
        if input.handbrake != self.handbrake_held {
            log::debug!("handbrake {}", if input.handbrake { "on" } else { "off" });
            for wheel in &mut self.wheels {
                wheel.set_handbrake(input.handbrake);
            }
            self.handbrake_held = input.handbrake;
        }
        let drive = WheelDrive {
            throttle: input.throttle,
            brake: input.brake,
            smoothed_steer,
            motor_torque: drive_out.motor_torque,
            direction: drive_out.gear.direction(),
            engine_brake_torque: drive_out.engine_brake_torque,
        };
        for wheel in &mut self.wheels {
            wheel.set_steer_angle(self.steering.wheel_angle(wheel.side(), speed01));
            let contact = body.ground_contact(wheel.id());
            let command = wheel.update(contact, &drive, &self.surfaces, &self.config.wheel_tuning);
            body.apply_wheel_command(wheel.id(), &command);
        }

        // Yaw damping
        let angular_velocity = body.angular_velocity();
        if angular_velocity.iter().all(|w| w.is_finite()) {
            let damped = self
                .config
                .yaw_damping
                .damp(angular_velocity, &body.rotation(), speed01, dt);
            body.set_angular_velocity(damped);
        }

        // Haptics
        let contributions = self.wheels.iter().filter_map(|w| w.contribution());
        self.last_emission = self.haptics.update(contributions, speed_kph, speed01, dt);

        Telemetry {
            speed_kph,
            forward_speed_kph,
            engine_rpm: drive_out.engine_rpm,
            gear: drive_out.gear,
            gear_label: drive_out.gear.label(),
            smoothed_steer,
            wheels_on_curb: self.wheels.iter().filter(|w| w.on_curb()).count(),
            haptic_active: self.haptics.is_active(),
        }
    }
}

impl Model for VehicleController {
    /// Respawn: neutral at idle, wheel centered, handbrake off, haptics silenced.
    fn reset(&mut self) {
        self.steering.reset();
        self.drivetrain.reset();
        for wheel in &mut self.wheels {
            wheel.reset();
        }
        self.haptics.reset();
        self.handbrake_held = false;
        self.last_emission = HapticEmission::Idle;
    }
}
