//! Heuristic parser for the model's free-text reply.
//!
//! Deliberately tolerant, never failing: the reply format is a soft contract
//! the model usually honors, and when it does not the parser degrades to a
//! single catch-all medication carrying the whole reply. Callers distinguish
//! the two shapes via [`ParseFidelity`] instead of inspecting field values.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::MedicationRecord;

/// Fallback general instructions when the reply carried none.
const DEFAULT_INSTRUCTIONS: [&str; 3] = [
    "Take medications exactly as prescribed",
    "Complete the full course of treatment",
    "Contact your doctor if you have concerns",
];

/// How cleanly the reply decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFidelity {
    /// One or more medication blocks were detected.
    Structured,
    /// Nothing looked like a medication — the whole reply became a single
    /// catch-all record.
    Fallback,
}

/// Structured decomposition of one model reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedReply {
    pub medications: Vec<MedicationRecord>,
    pub general_instructions: Vec<String>,
    pub fidelity: ParseFidelity,
}

/// Line-based reply parser.
///
/// A line starts a new medication block when it contains a word followed by
/// an mg strength ("Amoxicillin 500mg") or opens a numbered list entry
/// ("2. Cetirizine"). Keyword lines (important/warning/advice) become general
/// instructions; everything else inside a block accumulates into that
/// medication's plain-language explanation.
pub struct ReplyParser {
    mg_pattern: Regex,
    numbered_start: Regex,
    numbered_prefix: Regex,
}

impl Default for ReplyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyParser {
    pub fn new() -> Self {
        Self {
            mg_pattern: Regex::new(r"(?i)\b\w+\s+\d+\s*mg\b").unwrap(),
            numbered_start: Regex::new(r"^\d+\.\s*\w").unwrap(),
            numbered_prefix: Regex::new(r"^\d+\.\s*").unwrap(),
        }
    }

    pub fn parse(&self, reply: &str) -> ParsedReply {
        let mut medications: Vec<MedicationRecord> = Vec::new();
        let mut general_instructions: Vec<String> = Vec::new();
        let mut current: Option<MedicationRecord> = None;

        for line in reply.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if self.starts_medication_block(line) {
                if let Some(done) = current.take() {
                    medications.push(done);
                }
                let name = self.numbered_prefix.replace(line, "").to_string();
                current = Some(MedicationRecord::named(&name));
            } else if is_general_instruction(line) {
                general_instructions.push(line.to_string());
            } else if let Some(med) = current.as_mut() {
                med.append_plain_language(line);
            }
        }

        if let Some(done) = current.take() {
            medications.push(done);
        }

        let fidelity = if medications.is_empty() {
            medications.push(fallback_medication(reply));
            ParseFidelity::Fallback
        } else {
            ParseFidelity::Structured
        };

        if general_instructions.is_empty() {
            general_instructions = DEFAULT_INSTRUCTIONS.iter().map(|s| s.to_string()).collect();
        }

        tracing::debug!(
            medications = medications.len(),
            instructions = general_instructions.len(),
            fidelity = ?fidelity,
            "reply parsed"
        );

        ParsedReply {
            medications,
            general_instructions,
            fidelity,
        }
    }

    fn starts_medication_block(&self, line: &str) -> bool {
        self.mg_pattern.is_match(line) || self.numbered_start.is_match(line)
    }
}

fn is_general_instruction(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("important") || lower.contains("warning") || lower.contains("advice")
}

fn fallback_medication(reply: &str) -> MedicationRecord {
    let mut med = MedicationRecord::named("Your Prescription");
    med.dosage = "As prescribed".to_string();
    med.schedule = "Follow doctor's instructions".to_string();
    med.instructions = "Take as directed".to_string();
    med.plain_language = reply.to_string();
    med
}

/// Parse with the default patterns.
pub fn parse_reply(reply: &str) -> ParsedReply {
    ReplyParser::new().parse(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_block_with_instruction_line() {
        let reply = "1. Amoxicillin 500mg\nTake with food\nIMPORTANT: do not skip doses";
        let parsed = parse_reply(reply);

        assert_eq!(parsed.fidelity, ParseFidelity::Structured);
        assert_eq!(parsed.medications.len(), 1);
        assert_eq!(parsed.medications[0].name, "Amoxicillin 500mg");
        assert!(parsed.medications[0].plain_language.contains("Take with food"));
        assert_eq!(
            parsed.general_instructions,
            vec!["IMPORTANT: do not skip doses"]
        );
    }

    #[test]
    fn unstructured_reply_degrades_to_single_fallback() {
        let reply = "I could not identify any specific medication in this text.\nPlease verify with your pharmacist.";
        let parsed = parse_reply(reply);

        assert_eq!(parsed.fidelity, ParseFidelity::Fallback);
        assert_eq!(parsed.medications.len(), 1);
        let med = &parsed.medications[0];
        assert_eq!(med.name, "Your Prescription");
        assert_eq!(med.dosage, "As prescribed");
        assert_eq!(med.schedule, "Follow doctor's instructions");
        assert_eq!(med.plain_language, reply);
        assert_eq!(parsed.general_instructions.len(), 3);
        assert_eq!(
            parsed.general_instructions[0],
            "Take medications exactly as prescribed"
        );
    }

    #[test]
    fn mg_strength_detected_without_numbering() {
        let reply = "Medication: Ibuprofen 400 mg\nTake after meals\n\nMedication: Omeprazole 20mg\nBefore breakfast";
        let parsed = parse_reply(reply);

        assert_eq!(parsed.fidelity, ParseFidelity::Structured);
        assert_eq!(parsed.medications.len(), 2);
        assert_eq!(parsed.medications[0].name, "Medication: Ibuprofen 400 mg");
        assert!(parsed.medications[0].plain_language.contains("after meals"));
        assert_eq!(parsed.medications[1].name, "Medication: Omeprazole 20mg");
    }

    #[test]
    fn keyword_lines_become_general_instructions() {
        let reply = "General advice: stay hydrated\n1. Paracetamol 650mg\nFor fever\nWarning: avoid alcohol";
        let parsed = parse_reply(reply);

        assert_eq!(parsed.medications.len(), 1);
        assert_eq!(parsed.general_instructions.len(), 2);
        assert!(parsed.general_instructions[0].contains("stay hydrated"));
        assert!(parsed.general_instructions[1].contains("avoid alcohol"));
    }

    #[test]
    fn multiple_blocks_flush_in_order() {
        let reply = "1. Amoxicillin 500mg\nAntibiotic for infection\n2. Cetirizine 10mg\nFor allergies";
        let parsed = parse_reply(reply);

        assert_eq!(parsed.medications.len(), 2);
        assert_eq!(parsed.medications[0].name, "Amoxicillin 500mg");
        assert_eq!(parsed.medications[0].plain_language, "Antibiotic for infection");
        assert_eq!(parsed.medications[1].name, "Cetirizine 10mg");
        assert_eq!(parsed.medications[1].plain_language, "For allergies");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let reply = "\n\n1. Metformin 500mg\n\n\nTake twice daily\n\n";
        let parsed = parse_reply(reply);
        assert_eq!(parsed.medications.len(), 1);
        assert_eq!(parsed.medications[0].plain_language, "Take twice daily");
    }

    #[test]
    fn empty_reply_still_produces_a_result() {
        let parsed = parse_reply("");
        assert_eq!(parsed.fidelity, ParseFidelity::Fallback);
        assert_eq!(parsed.medications.len(), 1);
        assert_eq!(parsed.general_instructions.len(), 3);
    }

    #[test]
    fn numbered_prefix_is_stripped_from_name() {
        let parsed = parse_reply("12. Atorvastatin 10mg");
        assert_eq!(parsed.medications[0].name, "Atorvastatin 10mg");
    }
}
