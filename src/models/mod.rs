pub mod history;
pub mod medication;
pub mod profile;

pub use history::MedicalHistory;
pub use medication::{default_glossary, GlossaryEntry, MedicationRecord};
pub use profile::{Gender, HeightUnit, PatientProfile, ProfileError, WeightUnit};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::models::InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(crate::models::InvalidEnum {
                        field: stringify!($name),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

pub(crate) use str_enum;

/// Failed to parse a string into one of the model enums.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid {field} value: {value}")]
pub struct InvalidEnum {
    pub field: &'static str,
    pub value: String,
}
