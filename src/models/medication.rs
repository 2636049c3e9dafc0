//! Medication records produced by the reply parser and enriched by the
//! personalization engine, plus the fixed medical-term glossary.

use serde::{Deserialize, Serialize};

/// One medication block detected in the model's reply.
///
/// `personalized_dosage` and `timing_notes` start empty and are filled in by
/// the personalization engine when a profile is available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub name: String,
    pub dosage: String,
    pub schedule: String,
    pub instructions: String,
    pub plain_language: String,
    pub warnings: Vec<String>,
    pub personalized_dosage: Option<String>,
    pub timing_notes: Vec<String>,
}

impl MedicationRecord {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dosage: String::new(),
            schedule: String::new(),
            instructions: String::new(),
            plain_language: String::new(),
            warnings: Vec::new(),
            personalized_dosage: None,
            timing_notes: Vec::new(),
        }
    }

    /// Append a free-text line to the plain-language explanation, space-joined.
    pub fn append_plain_language(&mut self, line: &str) {
        if self.plain_language.is_empty() {
            self.plain_language = line.to_string();
        } else {
            self.plain_language.push(' ');
            self.plain_language.push_str(line);
        }
    }
}

/// A shorthand medical term with its plain-language explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub term: String,
    pub explanation: String,
}

/// Prescription-shorthand glossary shown with every result.
pub fn default_glossary() -> Vec<GlossaryEntry> {
    [
        (
            "t.i.d",
            "Three times a day (Latin: ter in die) - typically morning, afternoon, and evening",
        ),
        (
            "b.i.d",
            "Twice a day (Latin: bis in die) - usually morning and evening, 12 hours apart",
        ),
        (
            "o.d",
            "Once a day (Latin: omni die) - take at the same time each day",
        ),
        (
            "p.r.n",
            "As needed (Latin: pro re nata) - only take when you have symptoms",
        ),
        (
            "SOS",
            "If necessary or as needed - similar to p.r.n, take only when required",
        ),
    ]
    .into_iter()
    .map(|(term, explanation)| GlossaryEntry {
        term: term.to_string(),
        explanation: explanation.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_plain_language_space_joins() {
        let mut med = MedicationRecord::named("Amoxicillin 500mg");
        med.append_plain_language("Take with food.");
        med.append_plain_language("Finish the course.");
        assert_eq!(med.plain_language, "Take with food. Finish the course.");
    }

    #[test]
    fn glossary_covers_common_shorthand() {
        let glossary = default_glossary();
        assert_eq!(glossary.len(), 5);
        let terms: Vec<&str> = glossary.iter().map(|g| g.term.as_str()).collect();
        assert!(terms.contains(&"t.i.d"));
        assert!(terms.contains(&"p.r.n"));
        assert!(terms.contains(&"SOS"));
    }
}
