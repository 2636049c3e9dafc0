//! Prompt construction for the decode and Q&A exchanges.
//!
//! The system prompts are fixed contracts: plain text only, one exact
//! per-medication template, explicit handling for OCR-garbled input. Patient
//! context goes through typed structs serialized deterministically — the
//! model never sees ad-hoc duck-typed blobs.

use std::fmt;

use crate::models::{MedicalHistory, MedicationRecord, PatientProfile};

/// System instruction for prescription decoding.
pub const DECODE_SYSTEM_PROMPT: &str = "\
You are an expert medical prescription interpreter. Format all responses in clean, plain text without any bold, italic, or markdown formatting.

CRITICAL FORMATTING RULES:
- NEVER use markdown symbols like *, **, #, or any formatting
- Use clean plain text with consistent font
- Format each medication exactly like this:

Medication: [Medicine Name]
Dose: [Amount and frequency]
Purpose: [What it treats]
How to Take: [Clear instructions]
Duration: [Time period]
Important Notes: [Warnings and side effects]

[Add spacing between medications]

DOSAGE SAFETY:
- Check if any dosage exceeds recommended maximums
- Include clear warnings in plain text (not markdown)
- For unclear OCR text, provide best medical interpretation with caution notes

HANDLING UNCLEAR TEXT:
- When prescription text contains OCR errors, use medical knowledge to suggest most likely medications
- Clearly indicate uncertainty with \"Possible interpretation:\" or \"Verification needed:\"
- Provide 2-3 most likely options for unclear medication names, ranked by likelihood
- Include a \"VERIFICATION NEEDED\" section for unclear elements

STRUCTURE YOUR RESPONSE:
1. Brief greeting with patient name if available
2. Each medication in the specified clean format
3. General patient-specific guidance section
4. Verification needed section (if applicable)
5. Important safety reminders

Keep all text plain and clean. Use a professional, caring tone with simple language.";

/// System instruction for the conversational Q&A assistant.
pub const QA_SYSTEM_PROMPT: &str = "\
You are a medication assistant for a prescription decoding service. You provide helpful, accurate medication guidance while maintaining appropriate medical disclaimers.

CRITICAL FORMATTING RULES:
- NEVER use any markdown symbols like *, **, #, or formatting
- Use clean, readable plain text only
- Structure responses with clear sections when helpful
- Use simple dashes or line breaks for lists
- Keep language simple and professional

CAPABILITIES:
- Answer questions about medications, side effects, interactions
- Provide personalized guidance based on patient profile
- Explain medical terms and instructions clearly
- Offer practical advice for medication management
- Recognize when to recommend professional medical consultation

RESPONSE STYLE:
- Friendly, professional, and reassuring tone
- Use clear, simple language without medical jargon
- Provide actionable advice when appropriate
- Always include appropriate medical disclaimers
- Emphasize the importance of following prescribed instructions

SAFETY GUIDELINES:
- Never provide emergency medical advice
- Always recommend consulting healthcare providers for serious concerns
- Acknowledge limitations and uncertainties
- Direct users to seek immediate help for severe symptoms

Remember: Use only plain text formatting. No bold, italic, or special symbols except basic punctuation.";

/// Patient details as presented to the model. Measures are normalized to
/// metric before serialization so the prompt never mixes unit systems.
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub name: String,
    pub age: u32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub gender: &'static str,
    pub bmi: f64,
}

impl ProfileContext {
    pub fn from_profile(profile: &PatientProfile) -> Self {
        Self {
            name: profile.name.clone(),
            age: profile.age,
            weight_kg: profile.weight_kg(),
            height_cm: profile.height_cm(),
            gender: profile.gender.as_str(),
            bmi: profile.bmi(),
        }
    }
}

impl fmt::Display for ProfileContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PATIENT INFORMATION:")?;
        writeln!(f, "- Name: {}", self.name)?;
        writeln!(f, "- Age: {} years", self.age)?;
        writeln!(f, "- Weight: {:.1}kg", self.weight_kg)?;
        writeln!(f, "- Height: {:.1}cm", self.height_cm)?;
        writeln!(f, "- Gender: {}", self.gender)?;
        write!(f, "- BMI: {:.1}", self.bmi)
    }
}

/// Medical history as presented to the model.
#[derive(Debug, Clone)]
pub struct HistoryContext {
    pub conditions: String,
    pub allergies: String,
    pub current_medications: String,
    pub notes: String,
}

impl HistoryContext {
    pub fn from_history(history: &MedicalHistory) -> Self {
        Self {
            conditions: join_or_none(&history.conditions),
            allergies: join_or_none(&history.allergies),
            current_medications: join_or_none(&history.current_medications),
            notes: if history.notes.trim().is_empty() {
                "None".to_string()
            } else {
                history.notes.clone()
            },
        }
    }
}

impl fmt::Display for HistoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MEDICAL HISTORY:")?;
        writeln!(f, "- Existing Conditions: {}", self.conditions)?;
        writeln!(f, "- Known Allergies: {}", self.allergies)?;
        writeln!(f, "- Current Medications: {}", self.current_medications)?;
        write!(f, "- Additional Notes: {}", self.notes)
    }
}

fn join_or_none(entries: &[String]) -> String {
    if entries.is_empty() {
        "None reported".to_string()
    } else {
        entries.join(", ")
    }
}

/// User message for the decode exchange: prescription text plus any
/// available patient/history context and the formatting instructions.
pub fn build_decode_user_prompt(
    prescription_text: &str,
    profile: Option<&PatientProfile>,
    history: Option<&MedicalHistory>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Please interpret this prescription text and format it in clean, plain text \
         without any formatting symbols:\n\nPRESCRIPTION TEXT:\n",
    );
    prompt.push_str(prescription_text);
    prompt.push('\n');

    if let Some(profile) = profile {
        prompt.push('\n');
        prompt.push_str(&ProfileContext::from_profile(profile).to_string());
        prompt.push('\n');
    }
    if let Some(history) = history {
        prompt.push('\n');
        prompt.push_str(&HistoryContext::from_history(history).to_string());
        prompt.push('\n');
    }

    prompt.push_str(
        "\nINSTRUCTIONS:\n\
         1. Format each medication using the exact clean template provided\n\
         2. Include dosage safety warnings if any dose appears excessive\n\
         3. Consider the patient's profile for personalized guidance\n\
         4. Recommend verification for any uncertain interpretations\n\
         5. Add proper spacing between sections for readability",
    );
    prompt
}

/// User message for the Q&A exchange: compact profile and prescription
/// context followed by the patient's question.
pub fn build_question_user_prompt(
    question: &str,
    profile: Option<&PatientProfile>,
    medications: &[MedicationRecord],
) -> String {
    let mut prompt = String::new();

    if let Some(profile) = profile {
        prompt.push_str("PATIENT CONTEXT:\n");
        let ctx = ProfileContext::from_profile(profile);
        prompt.push_str(&format!(
            "- Name: {}\n- Age: {} years\n- Weight: {:.1}kg\n- Height: {:.1}cm\n- Gender: {}\n- BMI: {:.1}\n",
            ctx.name, ctx.age, ctx.weight_kg, ctx.height_cm, ctx.gender, ctx.bmi
        ));
    }

    if !medications.is_empty() {
        prompt.push_str("\nCURRENT PRESCRIPTION:\n");
        for med in medications {
            prompt.push_str(&format!(
                "- {} ({}) - {}\n",
                med.name, med.dosage, med.schedule
            ));
        }
    }

    prompt.push_str("\nPATIENT QUESTION: ");
    prompt.push_str(question);
    prompt.push_str(
        "\n\nPlease provide a helpful, personalized response that addresses their question \
         while maintaining appropriate medical safety guidelines. Use clean plain text \
         formatting without any formatting symbols.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, HeightUnit, WeightUnit};

    fn profile() -> PatientProfile {
        PatientProfile::new("Asha", 34, 154.324, WeightUnit::Lb, 5.7415, HeightUnit::Ft, Gender::Female)
            .unwrap()
    }

    #[test]
    fn decode_system_prompt_carries_the_template_contract() {
        for field in [
            "Medication:",
            "Dose:",
            "Purpose:",
            "How to Take:",
            "Duration:",
            "Important Notes:",
        ] {
            assert!(DECODE_SYSTEM_PROMPT.contains(field), "missing {field}");
        }
        assert!(DECODE_SYSTEM_PROMPT.contains("VERIFICATION NEEDED"));
        assert!(DECODE_SYSTEM_PROMPT.contains("2-3 most likely options"));
        assert!(DECODE_SYSTEM_PROMPT.contains("NEVER use markdown symbols"));
    }

    #[test]
    fn profile_context_normalizes_to_metric() {
        let ctx = ProfileContext::from_profile(&profile());
        assert!((ctx.weight_kg - 70.0).abs() < 0.01);
        assert!((ctx.height_cm - 175.0).abs() < 0.01);

        let rendered = ctx.to_string();
        assert!(rendered.contains("Weight: 70.0kg"));
        assert!(rendered.contains("Height: 175.0cm"));
        assert!(rendered.contains("BMI: 22.9"));
    }

    #[test]
    fn history_context_defaults_to_none_reported() {
        let ctx = HistoryContext::from_history(&MedicalHistory::new());
        assert_eq!(ctx.conditions, "None reported");
        assert_eq!(ctx.allergies, "None reported");
        assert_eq!(ctx.notes, "None");
    }

    #[test]
    fn decode_prompt_embeds_text_and_optional_context() {
        let mut history = MedicalHistory::new();
        history.add_condition("Diabetes");

        let prompt =
            build_decode_user_prompt("Amoxicillin 500mg t.i.d", Some(&profile()), Some(&history));
        assert!(prompt.contains("PRESCRIPTION TEXT:\nAmoxicillin 500mg t.i.d"));
        assert!(prompt.contains("PATIENT INFORMATION:"));
        assert!(prompt.contains("Existing Conditions: Diabetes"));
        assert!(prompt.contains("INSTRUCTIONS:"));

        let bare = build_decode_user_prompt("Amoxicillin 500mg", None, None);
        assert!(!bare.contains("PATIENT INFORMATION:"));
        assert!(!bare.contains("MEDICAL HISTORY:"));
    }

    #[test]
    fn question_prompt_lists_medications_compactly() {
        let mut med = MedicationRecord::named("Ibuprofen 400mg");
        med.dosage = "400mg".to_string();
        med.schedule = "b.i.d".to_string();

        let prompt = build_question_user_prompt("Can I take this with food?", None, &[med]);
        assert!(prompt.contains("CURRENT PRESCRIPTION:\n- Ibuprofen 400mg (400mg) - b.i.d"));
        assert!(prompt.contains("PATIENT QUESTION: Can I take this with food?"));
        assert!(!prompt.contains("PATIENT CONTEXT:"));
    }
}
