//! Toy host: a flat test track and a point-mass car with four wheel contacts.
//!
//! Just enough physics to close the loop around the controller. Longitudinal
//! force comes from the wheel torques, yaw from a kinematic bicycle model.

use nalgebra::{UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simcore::{GroundContact, MaterialId, VehicleBody, WheelCommand, WheelId, clamp01};

pub const ASPHALT: MaterialId = MaterialId(1);
pub const CURB: MaterialId = MaterialId(2);
pub const GRAVEL: MaterialId = MaterialId(3);
pub const GRASS: MaterialId = MaterialId(4);

const GRAVITY: f64 = 9.81;

/// Straight track along +Z: asphalt lane, curbs on both edges, grass beyond,
/// and a gravel trap across the lane.
#[derive(Debug, Clone)]
pub struct Track {
    pub half_width: f64,
    pub curb_width: f64,
    pub gravel_start: f64,
    pub gravel_end: f64,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            half_width: 4.0,
            curb_width: 0.6,
            gravel_start: 260.0,
            gravel_end: 320.0,
        }
    }
}

impl Track {
    pub fn material_at(&self, x: f64, z: f64) -> MaterialId {
        let lateral = x.abs();
        if (self.gravel_start..self.gravel_end).contains(&z) {
            GRAVEL
        } else if lateral < self.half_width {
            ASPHALT
        } else if lateral < self.half_width + self.curb_width {
            CURB
        } else {
            GRASS
        }
    }
}

#[derive(Debug, Clone)]
pub struct CarParams {
    pub mass: f64,
    pub wheel_radius: f64,
    pub wheelbase: f64,
    pub track_width: f64,
    pub drag: f64,
    pub rolling_resistance: f64,
    /// Per-second rate at which the yaw rate follows the steering geometry
    pub yaw_response: f64,
}

impl Default for CarParams {
    fn default() -> Self {
        Self {
            mass: 1200.0,
            wheel_radius: 0.33,
            wheelbase: 2.6,
            track_width: 1.6,
            drag: 0.4,
            rolling_resistance: 150.0,
            yaw_response: 4.0,
        }
    }
}

/// Point-mass car on a [`Track`]. Wheels are FL, FR, RL, RR.
pub struct ToyCar {
    params: CarParams,
    track: Track,
    rng: StdRng,
    position: Vector3<f64>,
    heading: f64,
    speed: f64,
    angular_velocity: Vector3<f64>,
    com_offset: f64,
    commands: [WheelCommand; 4],
    contacts: [GroundContact; 4],
}

impl ToyCar {
    pub fn new(params: CarParams, track: Track, seed: u64) -> Self {
        let mut car = Self {
            params,
            track,
            rng: StdRng::seed_from_u64(seed),
            position: Vector3::zeros(),
            heading: 0.0,
            speed: 0.0,
            angular_velocity: Vector3::zeros(),
            com_offset: 0.0,
            commands: [WheelCommand::default(); 4],
            contacts: [GroundContact::airborne(); 4],
        };
        car.refresh_contacts();
        car
    }

    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    pub fn com_offset(&self) -> f64 {
        self.com_offset
    }

    /// Chassis-local wheel positions (x lateral, z longitudinal)
    fn wheel_offsets(&self) -> [Vector3<f64>; 4] {
        let x = self.params.track_width / 2.0;
        let z = self.params.wheelbase / 2.0;
        [
            Vector3::new(-x, 0.0, z),
            Vector3::new(x, 0.0, z),
            Vector3::new(-x, 0.0, -z),
            Vector3::new(x, 0.0, -z),
        ]
    }

    fn refresh_contacts(&mut self) {
        let rotation = self.rotation();
        let lateral_slip = (self.angular_velocity.y * self.speed).abs() * 0.05;
        let load = self.params.mass * GRAVITY / 4.0;

        for (i, offset) in self.wheel_offsets().iter().enumerate() {
            let world = self.position + rotation * offset;
            let material = self.track.material_at(world.x, world.z);
            let jitter = match material {
                GRAVEL => self.rng.gen_range(0.05..0.3),
                GRASS => self.rng.gen_range(0.0..0.1),
                _ => 0.0,
            };
            self.contacts[i] = GroundContact {
                grounded: true,
                sideways_slip: lateral_slip + jitter,
                vertical_force: load,
                material: Some(material),
            };
        }
    }

    /// Advance the toy physics by one tick using the last wheel commands.
    pub fn integrate(&mut self, dt: f64) {
        let p = &self.params;
        let motor: f64 = self.commands.iter().map(|c| c.motor_torque_nm).sum();
        let brake: f64 = self.commands.iter().map(|c| c.brake_torque_nm).sum();

        let drive_force = motor / p.wheel_radius;
        let resist_force = brake / p.wheel_radius + p.rolling_resistance + p.drag * self.speed * self.speed;
        let resist_dv = resist_force / p.mass * dt;

        self.speed += drive_force / p.mass * dt;
        if self.speed.abs() <= resist_dv {
            self.speed = 0.0;
        } else {
            self.speed -= resist_dv * self.speed.signum();
        }

        let steer_deg = (self.commands[0].steer_angle_deg + self.commands[1].steer_angle_deg) / 2.0;
        // grip on the front axle bounds how much of the geometry the car follows
        let grip = clamp01((self.commands[0].sideways_stiffness + self.commands[1].sideways_stiffness) / 2.0);
        let target_yaw = self.speed * steer_deg.to_radians().tan() / p.wheelbase * grip;
        self.angular_velocity.y += (target_yaw - self.angular_velocity.y) * clamp01(p.yaw_response * dt);

        self.heading += self.angular_velocity.y * dt;
        let forward = self.rotation() * Vector3::z();
        self.position += forward * self.speed * dt;

        self.refresh_contacts();
    }
}

impl VehicleBody for ToyCar {
    fn linear_velocity(&self) -> Vector3<f64> {
        self.rotation() * Vector3::z() * self.speed
    }

    fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    fn rotation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.heading)
    }

    fn set_angular_velocity(&mut self, angular_velocity: Vector3<f64>) {
        self.angular_velocity = angular_velocity;
    }

    fn offset_center_of_mass(&mut self, offset: f64) {
        self.com_offset += offset;
    }

    fn ground_contact(&self, wheel: WheelId) -> GroundContact {
        self.contacts.get(wheel.0).copied().unwrap_or_default()
    }

    fn wheel_rpm(&self, _wheel: WheelId) -> f64 {
        self.speed / (2.0 * std::f64::consts::PI * self.params.wheel_radius) * 60.0
    }

    fn apply_wheel_command(&mut self, wheel: WheelId, command: &WheelCommand) {
        if let Some(slot) = self.commands.get_mut(wheel.0) {
            *slot = *command;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car() -> ToyCar {
        ToyCar::new(CarParams::default(), Track::default(), 7)
    }

    #[test]
    fn test_track_zones() {
        let track = Track::default();
        assert_eq!(track.material_at(0.0, 10.0), ASPHALT);
        assert_eq!(track.material_at(-4.3, 10.0), CURB);
        assert_eq!(track.material_at(6.0, 10.0), GRASS);
        assert_eq!(track.material_at(0.0, 300.0), GRAVEL);
    }

    #[test]
    fn test_motor_torque_accelerates_forward() {
        let mut car = car();
        for wheel in 2..4 {
            car.apply_wheel_command(
                WheelId(wheel),
                &WheelCommand {
                    motor_torque_nm: 800.0,
                    sideways_stiffness: 1.0,
                    ..Default::default()
                },
            );
        }
        for _ in 0..50 {
            car.integrate(0.02);
        }
        assert!(car.forward_speed() > 1.0);
        assert!(car.position().z > 0.0);
        assert!(car.wheel_rpm(WheelId(2)) > 0.0);
    }

    #[test]
    fn test_brakes_stop_without_reversing() {
        let mut car = car();
        car.speed = 5.0;
        for wheel in 0..4 {
            car.apply_wheel_command(
                WheelId(wheel),
                &WheelCommand {
                    brake_torque_nm: 1500.0,
                    ..Default::default()
                },
            );
        }
        for _ in 0..200 {
            car.integrate(0.02);
        }
        assert_eq!(car.speed, 0.0);
    }

    #[test]
    fn test_gravel_slip_is_jittered() {
        let mut car = car();
        car.position = Vector3::new(0.0, 0.0, 290.0);
        car.refresh_contacts();
        let contact = car.ground_contact(WheelId(0));
        assert_eq!(contact.material, Some(GRAVEL));
        assert!(contact.sideways_slip >= 0.05);
    }
}
