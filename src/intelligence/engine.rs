//! Personalization operations — pure functions over the rule tables.
//!
//! No I/O and no mutation of inputs: every function derives patient facts,
//! walks the relevant table in its declared order, and returns fresh output.

use crate::models::{MedicalHistory, MedicationRecord, PatientProfile};

use super::rules::{
    age_tips, bmi_tips, general_tips, history_tips, medication_tips, ProfileFacts, RuleContext,
    DOSAGE_RULES, RECOMMENDATION_RULES, TIMING_RULES,
};
use super::types::{FollowUpTip, Recommendation};

/// Follow-up tips are capped to the highest-priority few — a wall of advice
/// reads as noise.
const MAX_FOLLOW_UP_TIPS: usize = 4;

/// All applicable recommendation rules for one medication, in table order.
pub fn personalized_recommendations(
    medication_name: &str,
    profile: &PatientProfile,
    history: &MedicalHistory,
) -> Vec<Recommendation> {
    let facts = ProfileFacts::derive(profile);
    let ctx = RuleContext::new(&facts, history, medication_name);

    RECOMMENDATION_RULES
        .iter()
        .filter(|rule| (rule.applies)(&ctx))
        .map(|rule| (rule.emit)(&ctx))
        .collect()
}

/// The dosage string with at most one appended parenthetical note, chosen by
/// the first matching branch of the dosage table.
pub fn personalized_dosage(standard_dosage: &str, profile: &PatientProfile) -> String {
    let facts = ProfileFacts::derive(profile);

    let note = DOSAGE_RULES
        .iter()
        .find(|rule| (rule.applies)(&facts))
        .map(|rule| (rule.note)(&facts))
        .unwrap_or_default();

    format!("{standard_dosage}{note}")
}

/// Timing suggestions gated on the patient facts and the schedule text.
/// Multiple rules may apply simultaneously.
pub fn timing_recommendations(profile: &PatientProfile, schedule: &str) -> Vec<String> {
    let facts = ProfileFacts::derive(profile);
    let schedule = schedule.to_lowercase();

    TIMING_RULES
        .iter()
        .filter(|rule| (rule.applies)(&facts, &schedule))
        .map(|rule| (rule.emit)(&facts))
        .collect()
}

/// Aggregated follow-up tips across BMI, medication, age, history, and
/// lifestyle rules — sorted by descending priority (stable, so generation
/// order breaks ties) and truncated. Empty when either context is missing.
pub fn follow_up_tips(
    medications: &[MedicationRecord],
    profile: Option<&PatientProfile>,
    history: Option<&MedicalHistory>,
) -> Vec<FollowUpTip> {
    let (Some(profile), Some(history)) = (profile, history) else {
        return Vec::new();
    };
    let facts = ProfileFacts::derive(profile);

    let mut tips = bmi_tips(&facts);
    for med in medications {
        tips.extend(medication_tips(&facts, &med.name));
    }
    tips.extend(age_tips(&facts));
    tips.extend(history_tips(&facts, history));
    tips.extend(general_tips(&facts));

    tips.sort_by_key(|t| std::cmp::Reverse(t.priority.weight()));
    tips.truncate(MAX_FOLLOW_UP_TIPS);
    tips
}

/// Banner warnings derived from the medical history alone, shown above the
/// decoded result regardless of which medications were detected.
pub fn history_warnings(history: &MedicalHistory) -> Vec<String> {
    let mut warnings = Vec::new();

    if history.mentions_condition("diabetes") {
        warnings.push(
            "You have diabetes - monitor blood sugar levels while taking these medications"
                .to_string(),
        );
    }
    if history.mentions_condition("hypertension") {
        warnings.push(
            "You have high blood pressure - some medications may affect your blood pressure"
                .to_string(),
        );
    }
    if history.mentions_allergy("penicillin") {
        warnings.push(
            "ALLERGY ALERT: You are allergic to Penicillin - verify this prescription is safe for you"
                .to_string(),
        );
    }
    if history.has_current_medications() {
        warnings.push(
            "Drug interaction check recommended - you are taking other medications".to_string(),
        );
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::types::{RecommendationKind, Severity, TipPriority};
    use crate::models::{Gender, HeightUnit, WeightUnit};

    fn profile(name: &str, age: u32, weight_kg: f64, height_cm: f64, gender: Gender) -> PatientProfile {
        PatientProfile::new(name, age, weight_kg, WeightUnit::Kg, height_cm, HeightUnit::Cm, gender)
            .unwrap()
    }

    fn history_with(conditions: &[&str]) -> MedicalHistory {
        let mut h = MedicalHistory::new();
        for c in conditions {
            h.add_condition(c);
        }
        h
    }

    #[test]
    fn senior_gets_timing_then_monitoring() {
        let p = profile("Mary", 72, 70.0, 165.0, Gender::Other);
        let recs = personalized_recommendations("Paracetamol 650mg", &p, &MedicalHistory::new());

        assert!(recs.len() >= 2);
        assert_eq!(recs[0].kind, RecommendationKind::Timing);
        assert_eq!(recs[0].severity, Severity::Info);
        assert_eq!(recs[1].kind, RecommendationKind::Monitoring);
        assert!(recs[0].message.contains("Mary"));
    }

    #[test]
    fn all_applicable_rules_fire_in_fixed_order() {
        // Senior, obese, heavy, female, on an NSAID, diabetic: the output
        // must walk age → BMI → weight → gender → medication → history.
        let p = profile("Rita", 70, 110.0, 160.0, Gender::Female);
        let h = history_with(&["Diabetes"]);
        let recs = personalized_recommendations("Ibuprofen 400mg", &p, &h);

        let kinds: Vec<_> = recs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecommendationKind::Timing,     // senior
                RecommendationKind::Monitoring, // senior
                RecommendationKind::Dosage,     // obese
                RecommendationKind::Monitoring, // obese
                RecommendationKind::Dosage,     // >100kg
                RecommendationKind::Warning,    // female disclosure
                RecommendationKind::Warning,    // nsaid + senior
                RecommendationKind::Monitoring, // nsaid + obese
                RecommendationKind::Monitoring, // diabetes
            ]
        );
    }

    #[test]
    fn child_dosage_verification_is_critical() {
        let p = profile("Timmy", 8, 25.0, 125.0, Gender::Male);
        let recs = personalized_recommendations("Amoxicillin 250mg", &p, &MedicalHistory::new());
        let critical: Vec<_> = recs.iter().filter(|r| r.severity == Severity::Critical).collect();
        assert!(!critical.is_empty());
        assert!(critical[0].message.contains("pediatrician"));
    }

    #[test]
    fn kidney_condition_is_critical_dosage() {
        let p = profile("Jon", 40, 80.0, 180.0, Gender::Male);
        let h = history_with(&["Kidney Disease"]);
        let recs = personalized_recommendations("Metformin 500mg", &p, &h);
        assert!(recs
            .iter()
            .any(|r| r.kind == RecommendationKind::Dosage && r.severity == Severity::Critical));
    }

    #[test]
    fn dosage_note_appends_exactly_one_parenthetical() {
        // Senior AND underweight AND low weight: senior branch wins.
        let p = profile("Mary", 80, 42.0, 160.0, Gender::Female);
        let dosage = personalized_dosage("500mg twice daily", &p);

        assert!(dosage.starts_with("500mg twice daily ("));
        assert!(dosage.contains("seniors may need reduced doses"));
        assert_eq!(dosage.matches('(').count(), 1);
    }

    #[test]
    fn dosage_branch_priority_low_weight_before_obese() {
        // Adult, <50kg and obese can't coexist; test low-weight vs high-weight
        // precedence through an adult profile.
        let light = profile("Ana", 30, 45.0, 160.0, Gender::Female);
        assert!(personalized_dosage("250mg", &light).contains("lower body weight"));

        let obese = profile("Max", 30, 95.0, 160.0, Gender::Male);
        assert!(personalized_dosage("250mg", &obese).contains("BMI"));

        let heavy_not_obese = profile("Tor", 30, 110.0, 195.0, Gender::Male);
        assert!(personalized_dosage("250mg", &heavy_not_obese).contains("higher body weight"));
    }

    #[test]
    fn dosage_unchanged_for_unremarkable_profile() {
        let p = profile("Jon", 35, 75.0, 180.0, Gender::Male);
        assert_eq!(personalized_dosage("400mg t.i.d", &p), "400mg t.i.d");
    }

    #[test]
    fn timing_matches_schedule_keywords_case_insensitively() {
        let p = profile("Mary", 72, 70.0, 165.0, Gender::Female);
        let timings = timing_recommendations(&p, "1 tablet T.I.D with meals");
        assert!(timings.iter().any(|t| t.contains("8 AM, 2 PM, and 8 PM")));
    }

    #[test]
    fn adolescent_girl_gets_supervision_and_cycle_notes() {
        let p = profile("Lena", 15, 50.0, 160.0, Gender::Female);
        let timings = timing_recommendations(&p, "once daily");
        assert_eq!(timings.len(), 3);
        assert!(timings[0].contains("school schedule"));
        assert!(timings[1].contains("adult supervision"));
        assert!(timings[2].contains("menstrual cycle"));
    }

    #[test]
    fn tips_empty_without_profile_or_history() {
        let meds = vec![MedicationRecord::named("Ibuprofen 400mg")];
        let p = profile("Jon", 35, 75.0, 180.0, Gender::Male);
        assert!(follow_up_tips(&meds, None, Some(&MedicalHistory::new())).is_empty());
        assert!(follow_up_tips(&meds, Some(&p), None).is_empty());
    }

    #[test]
    fn tips_are_capped_and_sorted_by_priority() {
        // Obese senior on an NSAID with diabetes: far more than four
        // candidate tips are generated.
        let p = profile("Rita", 70, 110.0, 160.0, Gender::Female);
        let h = history_with(&["Diabetes", "Hypertension"]);
        let meds = vec![MedicationRecord::named("Ibuprofen 400mg")];

        let tips = follow_up_tips(&meds, Some(&p), Some(&h));
        assert_eq!(tips.len(), 4);
        let weights: Vec<u8> = tips.iter().map(|t| t.priority.weight()).collect();
        assert!(weights.windows(2).all(|w| w[0] >= w[1]), "not sorted: {weights:?}");
        assert_eq!(tips[0].priority, TipPriority::High);
    }

    #[test]
    fn tip_sort_is_stable_within_priority() {
        // Normal-weight adult on an NSAID: two high-priority tips are
        // generated in a known order and must keep it.
        let p = profile("Jon", 35, 75.0, 180.0, Gender::Male);
        let meds = vec![MedicationRecord::named("Ibuprofen 400mg")];
        let tips = follow_up_tips(&meds, Some(&p), Some(&MedicalHistory::new()));

        assert!(tips.len() >= 2);
        assert_eq!(tips[0].title, "Ask Your Doctor");
        assert_eq!(tips[1].title, "Stomach Protection");
    }

    #[test]
    fn history_warnings_cover_all_four_banners() {
        let mut h = history_with(&["diabetes", "Hypertension"]);
        h.add_allergy("Penicillin");
        h.add_current_medication("Metformin");

        let warnings = history_warnings(&h);
        assert_eq!(warnings.len(), 4);
        assert!(warnings[0].contains("diabetes"));
        assert!(warnings[1].contains("blood pressure"));
        assert!(warnings[2].contains("ALLERGY ALERT"));
        assert!(warnings[3].contains("interaction"));
    }

    #[test]
    fn history_warnings_empty_for_clean_history() {
        assert!(history_warnings(&MedicalHistory::new()).is_empty());
    }
}
