//! Declarative personalization rule tables.
//!
//! Each table is an ordered list of `{predicate, output}` pairs over a
//! derived [`RuleContext`]; the engine evaluates them in the declared order.
//! For recommendations every matching rule fires; for dosage notes only the
//! first match wins. Keeping the conditions as data makes each rule
//! independently testable and keeps the message catalog in one place.

use crate::models::{Gender, MedicalHistory, PatientProfile};

use super::types::{
    AgeBracket, BmiBracket, FollowUpTip, Recommendation, RecommendationKind, Severity, TipKind,
    TipPriority,
};

// ─── Derived context ─────────────────────────────────────────────────────────

/// Quantities every rule predicate works from, derived once per evaluation.
#[derive(Debug, Clone)]
pub struct ProfileFacts {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub weight_kg: f64,
    pub bmi: f64,
    pub age_bracket: AgeBracket,
    pub bmi_bracket: BmiBracket,
}

impl ProfileFacts {
    pub fn derive(profile: &PatientProfile) -> Self {
        let bmi = profile.bmi();
        Self {
            name: profile.name.clone(),
            age: profile.age,
            gender: profile.gender,
            weight_kg: profile.weight_kg(),
            bmi,
            age_bracket: AgeBracket::of(profile.age),
            bmi_bracket: BmiBracket::of(bmi),
        }
    }
}

/// Full context for recommendation rules: patient facts, history, and the
/// medication under consideration (lowercased once for substring checks).
pub struct RuleContext<'a> {
    pub facts: &'a ProfileFacts,
    pub history: &'a MedicalHistory,
    pub medication: String,
}

impl<'a> RuleContext<'a> {
    pub fn new(facts: &'a ProfileFacts, history: &'a MedicalHistory, medication_name: &str) -> Self {
        Self {
            facts,
            history,
            medication: medication_name.to_lowercase(),
        }
    }

    pub fn medication_mentions(&self, keyword: &str) -> bool {
        self.medication.contains(keyword)
    }

    fn is_nsaid(&self) -> bool {
        self.medication_mentions("ibuprofen") || self.medication_mentions("nsaid")
    }

    fn is_antibiotic(&self) -> bool {
        self.medication_mentions("amoxicillin") || self.medication_mentions("antibiotic")
    }
}

fn rec(kind: RecommendationKind, severity: Severity, message: String) -> Recommendation {
    Recommendation {
        kind,
        message,
        severity,
    }
}

// ─── Recommendation rules ────────────────────────────────────────────────────

/// One `{predicate, output}` pair. All matching rules fire, in table order.
pub struct RecommendationRule {
    pub name: &'static str,
    pub applies: fn(&RuleContext<'_>) -> bool,
    pub emit: fn(&RuleContext<'_>) -> Recommendation,
}

/// Evaluation order is the table order: age → BMI → raw weight → gender →
/// medication substring → medical history. No deduplication, no ranking.
pub static RECOMMENDATION_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        name: "senior-timing",
        applies: |ctx| ctx.facts.age_bracket == AgeBracket::Senior,
        emit: |ctx| rec(
            RecommendationKind::Timing,
            Severity::Info,
            format!(
                "{}, as a senior, consider taking medications earlier in the day to avoid sleep disruption. Your body may process medications more slowly.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "senior-monitoring",
        applies: |ctx| ctx.facts.age_bracket == AgeBracket::Senior,
        emit: |ctx| rec(
            RecommendationKind::Monitoring,
            Severity::Warning,
            format!(
                "{}, seniors should monitor for increased side effects and drug interactions. Consider more frequent check-ups.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "pediatric-dosage",
        applies: |ctx| ctx.facts.age_bracket.is_pediatric(),
        emit: |ctx| rec(
            RecommendationKind::Dosage,
            Severity::Critical,
            format!(
                "For {}, pediatric dosing is weight-based and requires careful calculation. Always verify dosage with your pediatrician.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "pediatric-timing",
        applies: |ctx| ctx.facts.age_bracket.is_pediatric(),
        emit: |ctx| rec(
            RecommendationKind::Timing,
            Severity::Warning,
            format!(
                "For {}, consider liquid formulations if available and ensure medications are taken with adult supervision.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "underweight-dosage",
        applies: |ctx| ctx.facts.bmi_bracket == BmiBracket::Underweight,
        emit: |ctx| rec(
            RecommendationKind::Dosage,
            Severity::Warning,
            format!(
                "{}, your BMI indicates underweight status ({:.1}). This may require dosage adjustments. Discuss with your doctor if you experience stronger effects than expected.",
                ctx.facts.name, ctx.facts.bmi
            ),
        ),
    },
    RecommendationRule {
        name: "obese-dosage",
        applies: |ctx| ctx.facts.bmi_bracket == BmiBracket::Obese,
        emit: |ctx| rec(
            RecommendationKind::Dosage,
            Severity::Info,
            format!(
                "{}, your BMI indicates obesity ({:.1}). Higher body weight may affect medication effectiveness and distribution. Your doctor may need to adjust dosages.",
                ctx.facts.name, ctx.facts.bmi
            ),
        ),
    },
    RecommendationRule {
        name: "obese-monitoring",
        applies: |ctx| ctx.facts.bmi_bracket == BmiBracket::Obese,
        emit: |ctx| rec(
            RecommendationKind::Monitoring,
            Severity::Info,
            format!(
                "{}, obesity can affect how medications are processed. Monitor for effectiveness and discuss any concerns with your healthcare provider.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "low-weight-dosage",
        applies: |ctx| ctx.facts.weight_kg < 50.0,
        emit: |ctx| rec(
            RecommendationKind::Dosage,
            Severity::Warning,
            format!(
                "{}, your lower body weight ({:.1}kg) may require dosage adjustments. Discuss with your doctor if you experience stronger effects than expected.",
                ctx.facts.name, ctx.facts.weight_kg
            ),
        ),
    },
    RecommendationRule {
        name: "high-weight-dosage",
        applies: |ctx| ctx.facts.weight_kg > 100.0,
        emit: |ctx| rec(
            RecommendationKind::Dosage,
            Severity::Info,
            format!(
                "{}, higher body weight ({:.1}kg) may affect medication effectiveness. Your doctor may need to adjust dosages for optimal results.",
                ctx.facts.name, ctx.facts.weight_kg
            ),
        ),
    },
    RecommendationRule {
        name: "female-pregnancy-disclosure",
        applies: |ctx| ctx.facts.gender == Gender::Female,
        emit: |ctx| rec(
            RecommendationKind::Warning,
            Severity::Critical,
            format!(
                "{}, if you are pregnant, planning to become pregnant, or breastfeeding, inform your healthcare provider immediately.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "nsaid-senior",
        applies: |ctx| ctx.is_nsaid() && ctx.facts.age >= 65,
        emit: |ctx| rec(
            RecommendationKind::Warning,
            Severity::Warning,
            format!(
                "{}, NSAIDs like ibuprofen carry increased risks for seniors, including stomach bleeding and kidney problems. Use the lowest effective dose.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "nsaid-low-weight",
        applies: |ctx| ctx.is_nsaid() && ctx.facts.weight_kg < 50.0,
        emit: |ctx| rec(
            RecommendationKind::Dosage,
            Severity::Info,
            format!(
                "{}, consider starting with a lower dose of ibuprofen due to your body weight. 200mg may be sufficient instead of 400mg.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "nsaid-obese",
        applies: |ctx| ctx.is_nsaid() && ctx.facts.bmi_bracket == BmiBracket::Obese,
        emit: |ctx| rec(
            RecommendationKind::Monitoring,
            Severity::Warning,
            format!(
                "{}, obesity may increase the risk of cardiovascular side effects with NSAIDs. Monitor blood pressure and discuss with your doctor.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "antibiotic-senior",
        applies: |ctx| ctx.is_antibiotic() && ctx.facts.age_bracket == AgeBracket::Senior,
        emit: |ctx| rec(
            RecommendationKind::Duration,
            Severity::Warning,
            format!(
                "{}, complete the full antibiotic course even if you feel better. Seniors are at higher risk for antibiotic-resistant infections.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "antibiotic-female",
        applies: |ctx| ctx.is_antibiotic() && ctx.facts.gender == Gender::Female,
        emit: |ctx| rec(
            RecommendationKind::Monitoring,
            Severity::Info,
            format!(
                "{}, antibiotics may increase risk of yeast infections in women. Consider probiotics and monitor for symptoms.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "antibiotic-obese",
        applies: |ctx| ctx.is_antibiotic() && ctx.facts.bmi_bracket == BmiBracket::Obese,
        emit: |ctx| rec(
            RecommendationKind::Dosage,
            Severity::Info,
            format!(
                "{}, obesity may affect antibiotic distribution. Ensure your doctor knows your current weight for proper dosing.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "diabetes-monitoring",
        applies: |ctx| ctx.history.mentions_condition("diabetes"),
        emit: |ctx| rec(
            RecommendationKind::Monitoring,
            Severity::Warning,
            format!(
                "{}, monitor blood sugar levels more frequently while taking new medications, as they may affect glucose control.",
                ctx.facts.name
            ),
        ),
    },
    RecommendationRule {
        name: "kidney-dosage",
        applies: |ctx| ctx.history.mentions_condition("kidney"),
        emit: |ctx| rec(
            RecommendationKind::Dosage,
            Severity::Critical,
            format!(
                "{}, kidney disease may require dosage adjustments for many medications. Ensure your doctor knows about your kidney function.",
                ctx.facts.name
            ),
        ),
    },
];

// ─── Dosage note rules ───────────────────────────────────────────────────────

/// First-match-wins parenthetical appended to a dosage string.
pub struct DosageRule {
    pub name: &'static str,
    pub applies: fn(&ProfileFacts) -> bool,
    pub note: fn(&ProfileFacts) -> String,
}

/// Branch priority: senior > pediatric > low weight > obese > high weight.
pub static DOSAGE_RULES: &[DosageRule] = &[
    DosageRule {
        name: "senior",
        applies: |f| f.age_bracket == AgeBracket::Senior,
        note: |f| format!(" ({}, seniors may need reduced doses - consult your doctor)", f.name),
    },
    DosageRule {
        name: "pediatric",
        applies: |f| f.age_bracket.is_pediatric(),
        note: |f| {
            format!(
                " ({}, pediatric dosing: typically 10-15mg/kg - verify with pediatrician)",
                f.name
            )
        },
    },
    DosageRule {
        name: "low-weight",
        applies: |f| f.weight_kg < 50.0,
        note: |f| format!(" ({}, lower body weight may require dose reduction)", f.name),
    },
    DosageRule {
        name: "obese",
        applies: |f| f.bmi_bracket == BmiBracket::Obese,
        note: |f| {
            format!(
                " ({}, BMI {:.1} may require dose adjustment for optimal effectiveness)",
                f.name, f.bmi
            )
        },
    },
    DosageRule {
        name: "high-weight",
        applies: |f| f.weight_kg > 100.0,
        note: |f| format!(" ({}, higher body weight may require dose adjustment)", f.name),
    },
];

// ─── Timing rules ────────────────────────────────────────────────────────────

/// Timing suggestions gated on patient facts and the schedule text.
pub struct TimingRule {
    pub name: &'static str,
    pub applies: fn(&ProfileFacts, &str) -> bool,
    pub emit: fn(&ProfileFacts) -> String,
}

pub static TIMING_RULES: &[TimingRule] = &[
    TimingRule {
        name: "senior-three-times",
        applies: |f, schedule| {
            f.age_bracket == AgeBracket::Senior
                && (schedule.contains("t.i.d") || schedule.contains("three times"))
        },
        emit: |f| format!("For {}: Take at 8 AM, 2 PM, and 8 PM to avoid late-night dosing", f.name),
    },
    TimingRule {
        name: "senior-twice",
        applies: |f, schedule| {
            f.age_bracket == AgeBracket::Senior
                && (schedule.contains("b.i.d") || schedule.contains("twice"))
        },
        emit: |f| {
            format!(
                "For {}: Take at 8 AM and 6 PM to ensure adequate spacing without affecting sleep",
                f.name
            )
        },
    },
    TimingRule {
        name: "pediatric-school",
        applies: |f, _| f.age_bracket.is_pediatric(),
        emit: |f| format!("For {}: Coordinate medication times with meals and school schedule", f.name),
    },
    TimingRule {
        name: "pediatric-supervision",
        applies: |f, _| f.age_bracket.is_pediatric(),
        emit: |_| "Set reminders and ensure adult supervision for all doses".to_string(),
    },
    TimingRule {
        name: "menstrual-cycle",
        applies: |f, _| f.gender == Gender::Female && (12..=50).contains(&f.age),
        emit: |f| {
            format!(
                "{}, track medication timing with menstrual cycle as hormonal changes may affect drug effectiveness",
                f.name
            )
        },
    },
    TimingRule {
        name: "obese-consistency",
        applies: |f, _| f.bmi_bracket == BmiBracket::Obese,
        emit: |f| {
            format!(
                "{}, with higher BMI ({:.1}), maintain consistent timing to ensure steady medication levels",
                f.name, f.bmi
            )
        },
    },
];

// ─── Follow-up tip builders ──────────────────────────────────────────────────

fn tip(
    kind: TipKind,
    title: &str,
    message: String,
    priority: TipPriority,
    icon: &str,
) -> FollowUpTip {
    FollowUpTip {
        kind,
        title: title.to_string(),
        message,
        priority,
        icon: icon.to_string(),
    }
}

pub fn bmi_tips(facts: &ProfileFacts) -> Vec<FollowUpTip> {
    let mut tips = Vec::new();
    match facts.bmi_bracket {
        BmiBracket::Obese => {
            tips.push(tip(
                TipKind::Question,
                "Ask Your Doctor",
                format!(
                    "{}, ask your doctor: \"Should my medication dosages be adjusted based on my BMI of {:.1}?\"",
                    facts.name, facts.bmi
                ),
                TipPriority::High,
                "scale",
            ));
            tips.push(tip(
                TipKind::Lifestyle,
                "Weight Management",
                format!(
                    "{}, maintaining a healthy weight can improve medication effectiveness and reduce side effects. Discuss weight management strategies with your healthcare provider.",
                    facts.name
                ),
                TipPriority::Medium,
                "activity",
            ));
        }
        BmiBracket::Underweight => {
            tips.push(tip(
                TipKind::Warning,
                "Underweight Alert",
                format!(
                    "{}, your BMI of {:.1} indicates underweight status. This may affect how medications work. Monitor for stronger effects and discuss with your doctor.",
                    facts.name, facts.bmi
                ),
                TipPriority::High,
                "alert",
            ));
        }
        _ => {}
    }
    tips
}

pub fn medication_tips(facts: &ProfileFacts, medication_name: &str) -> Vec<FollowUpTip> {
    let med = medication_name.to_lowercase();
    let mut tips = Vec::new();

    if med.contains("amoxicillin") || med.contains("antibiotic") {
        tips.push(tip(
            TipKind::Question,
            "Ask Your Doctor",
            format!(
                "{}, ask your doctor: \"Should I take probiotics while on this antibiotic to protect my gut health?\"",
                facts.name
            ),
            TipPriority::Medium,
            "question",
        ));
        tips.push(tip(
            TipKind::Tip,
            "Complete the Course",
            format!(
                "{}, even if you feel 100% better, finish all antibiotic pills to prevent antibiotic resistance.",
                facts.name
            ),
            TipPriority::High,
            "pill",
        ));
        if facts.gender == Gender::Female {
            tips.push(tip(
                TipKind::Warning,
                "Watch for Yeast Infections",
                format!(
                    "{}, antibiotics can disrupt natural bacteria. Watch for unusual discharge or itching and contact your doctor if symptoms occur.",
                    facts.name
                ),
                TipPriority::Medium,
                "alert",
            ));
        }
    }

    if med.contains("ibuprofen") || med.contains("nsaid") {
        tips.push(tip(
            TipKind::Question,
            "Ask Your Doctor",
            format!(
                "{}, ask your doctor: \"Should I take this medication with food to protect my stomach?\"",
                facts.name
            ),
            TipPriority::High,
            "question",
        ));
        tips.push(tip(
            TipKind::Warning,
            "Stomach Protection",
            format!(
                "{}, this medicine may cause stomach upset. Take with food and stop if you experience stomach pain or black stools.",
                facts.name
            ),
            TipPriority::High,
            "shield",
        ));
        if facts.age_bracket == AgeBracket::Senior {
            tips.push(tip(
                TipKind::Tip,
                "Senior Safety",
                format!(
                    "{}, as a senior, use the lowest effective dose and for the shortest time possible to reduce risks.",
                    facts.name
                ),
                TipPriority::High,
                "senior",
            ));
        }
        if facts.bmi_bracket == BmiBracket::Obese {
            tips.push(tip(
                TipKind::Warning,
                "Cardiovascular Risk",
                format!(
                    "{}, with higher BMI, NSAIDs may increase cardiovascular risks. Monitor blood pressure and discuss with your doctor.",
                    facts.name
                ),
                TipPriority::Medium,
                "heart",
            ));
        }
    }

    if med.contains("omeprazole") || med.contains("proton pump") {
        tips.push(tip(
            TipKind::Lifestyle,
            "Timing Matters",
            format!(
                "{}, take this medication 30-60 minutes before your first meal of the day for best results.",
                facts.name
            ),
            TipPriority::Medium,
            "clock",
        ));
        tips.push(tip(
            TipKind::Question,
            "Ask Your Doctor",
            format!(
                "{}, ask your doctor: \"How long should I take this acid reducer, and when should we review if I still need it?\"",
                facts.name
            ),
            TipPriority::Medium,
            "question",
        ));
    }

    tips
}

pub fn age_tips(facts: &ProfileFacts) -> Vec<FollowUpTip> {
    let mut tips = Vec::new();
    if facts.age_bracket == AgeBracket::Senior {
        tips.push(tip(
            TipKind::Tip,
            "Medication Review",
            format!(
                "{}, bring all your medications (including over-the-counter) to your next doctor visit for a comprehensive review.",
                facts.name
            ),
            TipPriority::Medium,
            "clipboard",
        ));
        tips.push(tip(
            TipKind::Lifestyle,
            "Stay Hydrated",
            format!(
                "{}, seniors process medications differently. Drink plenty of water and watch for unusual side effects.",
                facts.name
            ),
            TipPriority::Medium,
            "droplet",
        ));
    }
    if facts.age_bracket.is_pediatric() {
        tips.push(tip(
            TipKind::Tip,
            "Dosage Verification",
            format!(
                "For {}, always double-check pediatric dosages with your pharmacist before giving any medication.",
                facts.name
            ),
            TipPriority::High,
            "scale",
        ));
    }
    tips
}

pub fn history_tips(facts: &ProfileFacts, history: &MedicalHistory) -> Vec<FollowUpTip> {
    let mut tips = Vec::new();
    if history.mentions_condition("diabetes") {
        tips.push(tip(
            TipKind::Question,
            "Ask Your Doctor",
            format!(
                "{}, ask your doctor: \"Will these medications affect my blood sugar levels or interact with my diabetes medications?\"",
                facts.name
            ),
            TipPriority::High,
            "blood",
        ));
    }
    if history.mentions_condition("hypertension") {
        tips.push(tip(
            TipKind::Tip,
            "Blood Pressure Monitoring",
            format!(
                "{}, monitor your blood pressure more frequently while starting new medications, as some can affect blood pressure.",
                facts.name
            ),
            TipPriority::Medium,
            "pulse",
        ));
    }
    if history.has_current_medications() {
        tips.push(tip(
            TipKind::Question,
            "Ask Your Pharmacist",
            format!(
                "{}, ask your pharmacist: \"Can you check for interactions between my new prescription and my current medications?\"",
                facts.name
            ),
            TipPriority::High,
            "pill",
        ));
    }
    tips
}

pub fn general_tips(facts: &ProfileFacts) -> Vec<FollowUpTip> {
    let mut tips = vec![tip(
        TipKind::Lifestyle,
        "Medication Schedule",
        format!(
            "{}, set phone alarms or use a pill organizer to help remember your medication times consistently.",
            facts.name
        ),
        TipPriority::Low,
        "phone",
    )];

    let outside_normal_band = facts.weight_kg < 50.0
        || facts.weight_kg > 100.0
        || facts.bmi_bracket == BmiBracket::Obese
        || facts.bmi_bracket == BmiBracket::Underweight;
    if outside_normal_band {
        tips.push(tip(
            TipKind::Question,
            "Ask Your Doctor",
            format!(
                "{}, ask your doctor: \"Should my medication dosage be adjusted based on my current weight and BMI?\"",
                facts.name
            ),
            TipPriority::Medium,
            "scale",
        ));
    }
    tips
}
