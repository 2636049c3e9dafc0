//! Types for the personalization engine: derived patient brackets and the
//! advisory records the rule tables emit.

use serde::{Deserialize, Serialize};

use crate::models::str_enum;

str_enum!(RecommendationKind {
    Dosage => "dosage",
    Timing => "timing",
    Duration => "duration",
    Warning => "warning",
    Monitoring => "monitoring",
});

str_enum!(Severity {
    Info => "info",
    Warning => "warning",
    Critical => "critical",
});

str_enum!(TipKind {
    Question => "question",
    Tip => "tip",
    Warning => "warning",
    Lifestyle => "lifestyle",
});

str_enum!(TipPriority {
    High => "high",
    Medium => "medium",
    Low => "low",
});

impl TipPriority {
    /// Sort weight: high before medium before low.
    pub fn weight(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

/// One personalized advisory derived from the patient's attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
    pub severity: Severity,
}

/// One follow-up prompt for the result view: a question to ask the doctor,
/// a practical tip, a warning to watch for, or a lifestyle nudge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpTip {
    pub kind: TipKind,
    pub title: String,
    pub message: String,
    pub priority: TipPriority,
    /// Icon tag for the UI layer (named, not a glyph).
    pub icon: String,
}

/// Life-stage bracket driving age-gated rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBracket {
    Infant,
    Child,
    Adolescent,
    Adult,
    Senior,
}

impl AgeBracket {
    pub fn of(age: u32) -> Self {
        match age {
            0..=1 => Self::Infant,
            2..=11 => Self::Child,
            12..=17 => Self::Adolescent,
            18..=64 => Self::Adult,
            _ => Self::Senior,
        }
    }

    /// Pediatric dosing rules apply to both brackets.
    pub fn is_pediatric(&self) -> bool {
        matches!(self, Self::Child | Self::Adolescent)
    }
}

/// WHO BMI classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiBracket {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiBracket {
    pub fn of(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }
}
