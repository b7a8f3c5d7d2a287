use thiserror::Error;

/// Rejected vehicle or surface configuration.
///
/// Only raised while building a vehicle; the per-tick update never fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("gear ratio table is empty")]
    EmptyGearTable,

    #[error("gear {gear} max speed {max_speed_kph} km/h does not exceed gear {previous}")]
    NonIncreasingGearSpeeds {
        gear: usize,
        previous: usize,
        max_speed_kph: f64,
    },

    #[error("material {material} is claimed by surfaces `{first}` and `{second}`")]
    DuplicateMaterial {
        material: u32,
        first: String,
        second: String,
    },

    #[error("surface `{surface}`: {field} = {value} is out of range")]
    SurfaceOutOfRange {
        surface: String,
        field: &'static str,
        value: f64,
    },

    #[error("vehicle must have at least one wheel")]
    NoWheels,

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Fail with `InvalidParameter` unless `value` is finite and at least `min`.
pub fn ensure_at_least(name: &'static str, value: f64, min: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min {
        return Err(ConfigError::invalid(name, format!("{value} must be >= {min}")));
    }
    Ok(())
}

/// Fail with `InvalidParameter` unless `value` is finite and inside [min, max].
pub fn ensure_within(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigError::invalid(
            name,
            format!("{value} must be within [{min}, {max}]"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_at_least() {
        assert!(ensure_at_least("x", 1.0, 0.0).is_ok());
        assert!(ensure_at_least("x", -1.0, 0.0).is_err());
        assert!(ensure_at_least("x", f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_error_message_names_parameter() {
        let err = ensure_within("idle_rpm", 12.0, 0.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("idle_rpm"));
    }
}
