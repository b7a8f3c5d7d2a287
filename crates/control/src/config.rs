//! Vehicle configuration
//!
//! Every tunable of one vehicle in a single serde tree. Fields left out of a
//! JSON file take the reference tuning.

use std::path::Path;

use mechanics::{BrakeBiasTarget, DrivetrainConfig, TorquePolicy, WheelConfig, WheelTuning, YawDampingConfig};
use serde::{Deserialize, Serialize};
use simcore::ConfigError;
use simcore::error::ensure_at_least;

use crate::haptics::HapticConfig;
use crate::steering::SteeringConfig;

/// The optional behaviours that differ between vehicle variants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleBehaviour {
    pub differential_steer_bias: bool,
    pub torque_policy: TorquePolicy,
    pub engine_braking_enabled: bool,
    pub brake_bias: BrakeBiasTarget,
}

/// Complete configuration of one vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Speed at which the speed-adaptive terms saturate (km/h)
    pub top_speed_kph: f64,
    /// Vertical center-of-mass shift applied once at construction (m)
    pub center_of_mass_offset: f64,
    /// Ordered wheel layout; the index is the physics wheel handle
    pub wheels: Vec<WheelConfig>,
    pub steering: SteeringConfig,
    pub drivetrain: DrivetrainConfig,
    pub wheel_tuning: WheelTuning,
    pub yaw_damping: YawDampingConfig,
    pub haptics: HapticConfig,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            top_speed_kph: 100.0,
            center_of_mass_offset: -0.5,
            wheels: WheelConfig::rear_drive_layout(),
            steering: SteeringConfig::default(),
            drivetrain: DrivetrainConfig::default(),
            wheel_tuning: WheelTuning::default(),
            yaw_damping: YawDampingConfig::default(),
            haptics: HapticConfig::default(),
        }
    }
}

impl VehicleConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: VehicleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("loaded vehicle config from {}", path.display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_wheels(mut self, wheels: Vec<WheelConfig>) -> Self {
        self.wheels = wheels;
        self
    }

    pub fn with_top_speed(mut self, top_speed_kph: f64) -> Self {
        self.top_speed_kph = top_speed_kph;
        self
    }

    /// Current optional-behaviour selection
    pub fn behaviour(&self) -> VehicleBehaviour {
        VehicleBehaviour {
            differential_steer_bias: self.steering.differential_bias,
            torque_policy: self.drivetrain.torque_policy,
            engine_braking_enabled: self.drivetrain.engine_braking_enabled,
            brake_bias: self.wheel_tuning.brakes.bias_target,
        }
    }

    pub fn with_behaviour(mut self, behaviour: VehicleBehaviour) -> Self {
        self.steering.differential_bias = behaviour.differential_steer_bias;
        self.drivetrain.torque_policy = behaviour.torque_policy;
        self.drivetrain.engine_braking_enabled = behaviour.engine_braking_enabled;
        self.wheel_tuning.brakes.bias_target = behaviour.brake_bias;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_at_least("top_speed_kph", self.top_speed_kph, f64::MIN_POSITIVE)?;
        if !self.center_of_mass_offset.is_finite() {
            return Err(ConfigError::invalid("center_of_mass_offset", "must be finite"));
        }
        if self.wheels.is_empty() {
            return Err(ConfigError::NoWheels);
        }
        for wheel in &self.wheels {
            ensure_at_least("suspension_spring", wheel.suspension_spring, 0.0)?;
        }
        self.steering.validate()?;
        self.drivetrain.validate()?;
        self.wheel_tuning.validate()?;
        self.yaw_damping.validate()?;
        self.haptics.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        VehicleConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{
            "top_speed_kph": 140.0,
            "drivetrain": {
                "torque_policy": { "kind": "gear_limiter", "band_kph": 5.0 },
                "engine_braking_enabled": true
            },
            "steering": { "differential_bias": true }
        }"#;
        let config = VehicleConfig::from_json_str(json).unwrap();

        assert_eq!(config.top_speed_kph, 140.0);
        assert_eq!(config.wheels.len(), 4);
        assert_eq!(config.drivetrain.gearbox.gears.len(), 5);
        let behaviour = config.behaviour();
        assert!(behaviour.differential_steer_bias);
        assert!(behaviour.engine_braking_enabled);
        assert_eq!(behaviour.torque_policy, TorquePolicy::GearLimiter { band_kph: 5.0 });
        assert_eq!(behaviour.brake_bias, BrakeBiasTarget::NonDriven);
    }

    #[test]
    fn test_serialized_config_reloads() {
        let config = VehicleConfig::default().with_top_speed(180.0);
        let json = config.to_json_string().unwrap();
        let reloaded = VehicleConfig::from_json_str(&json).unwrap();
        assert_eq!(reloaded.top_speed_kph, 180.0);
        assert_eq!(reloaded.wheels, config.wheels);
    }

    #[test]
    fn test_rejects_empty_wheel_list() {
        let config = VehicleConfig::default().with_wheels(Vec::new());
        assert!(matches!(config.validate(), Err(ConfigError::NoWheels)));
    }

    #[test]
    fn test_rejects_bad_gear_table() {
        let json = r#"{ "drivetrain": { "gearbox": { "gears": [
            { "ratio": 3.0, "max_speed_kph": 40.0 },
            { "ratio": 2.0, "max_speed_kph": 30.0 }
        ] } } }"#;
        assert!(matches!(
            VehicleConfig::from_json_str(json),
            Err(ConfigError::NonIncreasingGearSpeeds { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(VehicleConfig::from_json_str("{ nope"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            VehicleConfig::load("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_with_behaviour_overrides_sub_configs() {
        let config = VehicleConfig::default().with_behaviour(VehicleBehaviour {
            differential_steer_bias: true,
            torque_policy: TorquePolicy::GearLimiter { band_kph: 8.0 },
            engine_braking_enabled: true,
            brake_bias: BrakeBiasTarget::Rear,
        });
        assert!(config.steering.differential_bias);
        assert_eq!(config.wheel_tuning.brakes.bias_target, BrakeBiasTarget::Rear);
        config.validate().unwrap();
    }
}
