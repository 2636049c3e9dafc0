pub mod engine;
pub mod rules;
pub mod types;

pub use engine::{
    follow_up_tips, history_warnings, personalized_dosage, personalized_recommendations,
    timing_recommendations,
};
pub use types::{
    AgeBracket, BmiBracket, FollowUpTip, Recommendation, RecommendationKind, Severity, TipKind,
    TipPriority,
};
