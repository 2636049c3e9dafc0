//! End-to-end prescription processing: decode → parse → personalize.
//!
//! One blocking round trip per invocation; overlapping submissions are the
//! caller's concern. The result aggregate lives only for the current view —
//! nothing here persists.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::intelligence::{
    follow_up_tips, history_warnings, personalized_dosage, personalized_recommendations,
    timing_recommendations, FollowUpTip, Recommendation,
};
use crate::models::{default_glossary, GlossaryEntry, MedicalHistory, MedicationRecord, PatientProfile};
use crate::pipeline::decode::prompt::{build_decode_user_prompt, DECODE_SYSTEM_PROMPT};
use crate::pipeline::decode::{parse_reply, DecodeError, LlmClient, ParseFidelity};

/// Everything the result view renders for one decoded prescription.
/// Created per successful decode; discarded on reset or new submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedPrescription {
    pub medications: Vec<MedicationRecord>,
    pub glossary: Vec<GlossaryEntry>,
    pub general_instructions: Vec<String>,
    pub history_warnings: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub follow_up_tips: Vec<FollowUpTip>,
    pub raw_response: String,
    pub parse_fidelity: ParseFidelity,
}

/// Decode a prescription and derive all personalized guidance.
///
/// Profile and history are optional — without them the result still carries
/// parsed medications, the glossary, and general instructions, just no
/// personalization.
pub fn process_prescription(
    prescription_text: &str,
    profile: Option<&PatientProfile>,
    history: Option<&MedicalHistory>,
    client: &dyn LlmClient,
) -> Result<ProcessedPrescription, DecodeError> {
    let user_prompt = build_decode_user_prompt(prescription_text, profile, history);
    let raw_response = client.complete(DECODE_SYSTEM_PROMPT, &user_prompt)?;

    let parsed = parse_reply(&raw_response);
    let mut medications = parsed.medications;
    let mut recommendations = Vec::new();

    if let (Some(profile), Some(history)) = (profile, history) {
        for med in &mut medications {
            recommendations.extend(personalized_recommendations(&med.name, profile, history));
            med.personalized_dosage = Some(personalized_dosage(&med.dosage, profile));
            med.timing_notes = timing_recommendations(profile, &med.schedule);
        }
    }

    let history_warnings = history.map(history_warnings).unwrap_or_default();
    let follow_up_tips = follow_up_tips(&medications, profile, history);

    info!(
        medications = medications.len(),
        recommendations = recommendations.len(),
        tips = follow_up_tips.len(),
        fidelity = ?parsed.fidelity,
        "prescription processed"
    );

    Ok(ProcessedPrescription {
        medications,
        glossary: default_glossary(),
        general_instructions: parsed.general_instructions,
        history_warnings,
        recommendations,
        follow_up_tips,
        raw_response,
        parse_fidelity: parsed.fidelity,
    })
}
