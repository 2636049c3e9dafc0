//! Medical history — mutated only during history entry, read-only afterward.

use serde::{Deserialize, Serialize};

/// Conditions, allergies, and current medications reported by the patient.
///
/// Entries are free text from the form layer; lookups are case-insensitive
/// substring matches so "Kidney Disease" satisfies a "kidney" rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicalHistory {
    pub conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub current_medications: Vec<String>,
    pub notes: String,
}

impl MedicalHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_condition(&mut self, name: &str) {
        push_unique(&mut self.conditions, name);
    }

    pub fn remove_condition(&mut self, name: &str) {
        remove_entry(&mut self.conditions, name);
    }

    pub fn add_allergy(&mut self, name: &str) {
        push_unique(&mut self.allergies, name);
    }

    pub fn remove_allergy(&mut self, name: &str) {
        remove_entry(&mut self.allergies, name);
    }

    pub fn add_current_medication(&mut self, name: &str) {
        push_unique(&mut self.current_medications, name);
    }

    pub fn remove_current_medication(&mut self, name: &str) {
        remove_entry(&mut self.current_medications, name);
    }

    /// Does any reported condition mention `keyword` (case-insensitive)?
    pub fn mentions_condition(&self, keyword: &str) -> bool {
        mentions(&self.conditions, keyword)
    }

    /// Does any reported allergy mention `keyword` (case-insensitive)?
    pub fn mentions_allergy(&self, keyword: &str) -> bool {
        mentions(&self.allergies, keyword)
    }

    pub fn has_current_medications(&self) -> bool {
        !self.current_medications.is_empty()
    }
}

fn push_unique(entries: &mut Vec<String>, name: &str) {
    let name = name.trim();
    if name.is_empty() {
        return;
    }
    if !entries.iter().any(|e| e.eq_ignore_ascii_case(name)) {
        entries.push(name.to_string());
    }
}

fn remove_entry(entries: &mut Vec<String>, name: &str) {
    entries.retain(|e| !e.eq_ignore_ascii_case(name.trim()));
}

fn mentions(entries: &[String], keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    entries.iter().any(|e| e.to_lowercase().contains(&keyword))
}
