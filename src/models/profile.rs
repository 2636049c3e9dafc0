//! Patient profile — one per session, validated at construction, immutable after.
//!
//! All derived quantities (BMI, dosage brackets) work on metric values; the
//! unit conversions live here so no caller ever mixes lb/kg or ft/cm.

use serde::{Deserialize, Serialize};

use super::str_enum;

str_enum!(WeightUnit {
    Kg => "kg",
    Lb => "lb",
});

str_enum!(HeightUnit {
    Cm => "cm",
    Ft => "ft",
});

str_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

const LB_TO_KG: f64 = 0.453_592;
const FT_TO_CM: f64 = 30.48;

/// Errors from profile construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProfileError {
    #[error("patient name must not be empty")]
    EmptyName,

    #[error("age must be between 1 and 120, got {0}")]
    AgeOutOfRange(u32),

    #[error("weight must be positive, got {0}")]
    NonPositiveWeight(f64),

    #[error("height must be positive, got {0}")]
    NonPositiveHeight(f64),
}

/// Personal details captured once at form completion.
///
/// Fields are public for read access; construction goes through [`PatientProfile::new`]
/// so invalid ranges never enter the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub age: u32,
    pub weight: f64,
    pub weight_unit: WeightUnit,
    pub height: f64,
    pub height_unit: HeightUnit,
    pub gender: Gender,
}

impl PatientProfile {
    pub fn new(
        name: &str,
        age: u32,
        weight: f64,
        weight_unit: WeightUnit,
        height: f64,
        height_unit: HeightUnit,
        gender: Gender,
    ) -> Result<Self, ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if age == 0 || age > 120 {
            return Err(ProfileError::AgeOutOfRange(age));
        }
        if !(weight > 0.0) {
            return Err(ProfileError::NonPositiveWeight(weight));
        }
        if !(height > 0.0) {
            return Err(ProfileError::NonPositiveHeight(height));
        }

        Ok(Self {
            name: name.to_string(),
            age,
            weight,
            weight_unit,
            height,
            height_unit,
            gender,
        })
    }

    /// Weight normalized to kilograms.
    pub fn weight_kg(&self) -> f64 {
        match self.weight_unit {
            WeightUnit::Kg => self.weight,
            WeightUnit::Lb => self.weight * LB_TO_KG,
        }
    }

    /// Height normalized to centimeters.
    pub fn height_cm(&self) -> f64 {
        match self.height_unit {
            HeightUnit::Cm => self.height,
            HeightUnit::Ft => self.height * FT_TO_CM,
        }
    }

    /// Body Mass Index: weight(kg) / height(m)².
    pub fn bmi(&self) -> f64 {
        let height_m = self.height_cm() / 100.0;
        self.weight_kg() / (height_m * height_m)
    }
}
