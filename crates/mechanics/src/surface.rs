//! Surface catalog - contact material to grip/rumble characteristics
//!
//! Built once at startup and shared read-only (behind an `Arc`) by every
//! wheel of every vehicle.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use simcore::{ConfigError, MaterialId};

/// Grip and haptic characteristics of one kind of ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceProfile {
    #[serde(alias = "name")]
    pub id: String,
    /// Every contact material that behaves as this surface
    pub materials: Vec<MaterialId>,
    /// Low-frequency rumble weight in [0, 1]
    pub low_frequency: f64,
    /// High-frequency rumble weight in [0, 1]
    pub high_frequency: f64,
    /// Scales the per-wheel contribution strength
    #[serde(default = "one")]
    pub intensity_multiplier: f64,
    /// Scale the high-frequency channel with vehicle speed
    #[serde(default = "yes")]
    pub speed_scaled: bool,
    /// Multiplier on sideways friction stiffness
    #[serde(default = "one")]
    pub sideways_grip: f64,
    /// Curbs and painted lines
    #[serde(default)]
    pub curb: bool,
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

impl SurfaceProfile {
    pub fn new(id: impl Into<String>, materials: Vec<MaterialId>) -> Self {
        Self {
            id: id.into(),
            materials,
            low_frequency: 0.0,
            high_frequency: 0.0,
            intensity_multiplier: 1.0,
            speed_scaled: true,
            sideways_grip: 1.0,
            curb: false,
        }
    }

    pub fn with_rumble(mut self, low_frequency: f64, high_frequency: f64) -> Self {
        self.low_frequency = low_frequency;
        self.high_frequency = high_frequency;
        self
    }

    pub fn with_intensity(mut self, intensity_multiplier: f64) -> Self {
        self.intensity_multiplier = intensity_multiplier;
        self
    }

    pub fn with_sideways_grip(mut self, sideways_grip: f64) -> Self {
        self.sideways_grip = sideways_grip;
        self
    }

    pub fn with_speed_scaled(mut self, speed_scaled: bool) -> Self {
        self.speed_scaled = speed_scaled;
        self
    }

    pub fn as_curb(mut self) -> Self {
        self.curb = true;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let out_of_range = |field: &'static str, value: f64| ConfigError::SurfaceOutOfRange {
            surface: self.id.clone(),
            field,
            value,
        };

        for (field, value) in [
            ("low_frequency", self.low_frequency),
            ("high_frequency", self.high_frequency),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(out_of_range(field, value));
            }
        }
        for (field, value) in [
            ("intensity_multiplier", self.intensity_multiplier),
            ("sideways_grip", self.sideways_grip),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(out_of_range(field, value));
            }
        }
        Ok(())
    }
}

/// Immutable material → profile index.
#[derive(Debug, Clone, Default)]
pub struct SurfaceCatalog {
    profiles: Vec<SurfaceProfile>,
    by_material: HashMap<MaterialId, usize>,
}

impl SurfaceCatalog {
    /// Validate the profiles and index them by material.
    ///
    /// A material may belong to one profile only.
    pub fn from_profiles(profiles: Vec<SurfaceProfile>) -> Result<Self, ConfigError> {
        let by_material = index_by_material(&profiles)?;
        log::info!(
            "surface catalog built: {} profiles, {} materials",
            profiles.len(),
            by_material.len()
        );
        Ok(Self {
            profiles,
            by_material,
        })
    }

    /// Parse a JSON array of profiles.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let profiles: Vec<SurfaceProfile> = serde_json::from_str(json)?;
        Self::from_profiles(profiles)
    }

    /// Asphalt, curb, gravel and grass on materials 1 through 4.
    pub fn reference() -> Result<Self, ConfigError> {
        Self::from_profiles(reference_profiles())
    }

    /// Resolve a contact material. Absent or unknown materials have no surface.
    pub fn lookup(&self, material: Option<MaterialId>) -> Option<&SurfaceProfile> {
        let index = *self.by_material.get(&material?)?;
        self.profiles.get(index)
    }

    pub fn profiles(&self) -> &[SurfaceProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn reference_profiles() -> Vec<SurfaceProfile> {
    vec![
        SurfaceProfile::new("asphalt", vec![MaterialId(1)])
            .with_rumble(0.02, 0.05)
            .with_intensity(0.2),
        SurfaceProfile::new("curb", vec![MaterialId(2)])
            .with_rumble(0.35, 0.9)
            .with_intensity(1.5)
            .with_sideways_grip(0.9)
            .as_curb(),
        SurfaceProfile::new("gravel", vec![MaterialId(3)])
            .with_rumble(0.6, 0.4)
            .with_intensity(1.2)
            .with_sideways_grip(0.55),
        SurfaceProfile::new("grass", vec![MaterialId(4)])
            .with_rumble(0.3, 0.1)
            .with_intensity(0.8)
            .with_sideways_grip(0.7)
            .with_speed_scaled(false),
    ]
}

/// Map every material to the index of its profile, validating each profile.
///
/// A material may belong to one profile only.
fn index_by_material(profiles: &[SurfaceProfile]) -> Result<HashMap<MaterialId, usize>, ConfigError> {
    let mut by_material = HashMap::new();
    for (index, profile) in profiles.iter().enumerate() {
        profile.validate()?;
        for &material in &profile.materials {
            if let Some(&previous) = by_material.get(&material) {
                let first: &SurfaceProfile = &profiles[previous];
                return Err(ConfigError::DuplicateMaterial {
                    material: material.0,
                    first: first.id.clone(),
                    second: profile.id.clone(),
                });
            }
            by_material.insert(material, index);
        }
    }
    Ok(by_material)
}
