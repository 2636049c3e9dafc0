//! Per-upload failure tracking and the three-tier escalation policy.
//!
//! Explicit state threaded by the caller instead of hidden module state —
//! parallel sessions and tests each own their counter. The counter advances
//! only on real extraction failures: upload-validation rejections never ran a
//! method, and a manual-entry fallback bypasses OCR without resetting.

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// What the UI should offer after the latest failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTier {
    /// First failure: prompt a retry with a better photo.
    RetryOnly,
    /// Second failure: offer retry or manual entry.
    RetryOrManual,
    /// Third and later failures: force manual entry, suppress auto retries.
    ManualOnly,
}

/// Consecutive-failure state for one logical upload session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrSessionState {
    attempts: u32,
    last_error: Option<String>,
}

impl OcrSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Record a failed extraction attempt and return the tier the caller
    /// should escalate to. Validation rejections are recorded as the last
    /// error for display but do not advance the counter.
    pub fn record_failure(&mut self, error: &ExtractionError) -> Option<EscalationTier> {
        self.last_error = Some(error.to_string());
        if !error.counts_toward_escalation() {
            return self.escalation();
        }
        self.attempts += 1;
        tracing::debug!(attempts = self.attempts, "OCR attempt failed");
        self.escalation()
    }

    /// Any successful extraction resets the counter.
    pub fn record_success(&mut self) {
        self.attempts = 0;
        self.last_error = None;
    }

    /// The user started over with a new upload.
    pub fn new_upload(&mut self) {
        self.attempts = 0;
        self.last_error = None;
    }

    /// Current escalation tier, `None` while no attempt has failed.
    pub fn escalation(&self) -> Option<EscalationTier> {
        match self.attempts {
            0 => None,
            1 => Some(EscalationTier::RetryOnly),
            2 => Some(EscalationTier::RetryOrManual),
            _ => Some(EscalationTier::ManualOnly),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::ValidationIssue;

    fn method_failure() -> ExtractionError {
        ExtractionError::Exhausted {
            last_error: "engine unavailable".into(),
            guidance: "retry with better lighting".into(),
        }
    }

    #[test]
    fn three_failures_force_manual_entry() {
        let mut session = OcrSessionState::new();
        assert_eq!(
            session.record_failure(&method_failure()),
            Some(EscalationTier::RetryOnly)
        );
        assert_eq!(
            session.record_failure(&method_failure()),
            Some(EscalationTier::RetryOrManual)
        );
        assert_eq!(
            session.record_failure(&method_failure()),
            Some(EscalationTier::ManualOnly)
        );
        // Stays forced beyond three
        assert_eq!(
            session.record_failure(&method_failure()),
            Some(EscalationTier::ManualOnly)
        );
        assert_eq!(session.attempts(), 4);
    }

    #[test]
    fn success_resets_counter() {
        let mut session = OcrSessionState::new();
        session.record_failure(&method_failure());
        session.record_failure(&method_failure());
        session.record_success();
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.escalation(), None);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn new_upload_resets_counter() {
        let mut session = OcrSessionState::new();
        session.record_failure(&method_failure());
        session.new_upload();
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.escalation(), None);
    }

    #[test]
    fn validation_failure_keeps_counter_but_stores_error() {
        let mut session = OcrSessionState::new();
        let err = ExtractionError::Validation(ValidationIssue::EmptyFile);
        assert_eq!(session.record_failure(&err), None);
        assert_eq!(session.attempts(), 0);
        assert!(session.last_error().unwrap().contains("empty"));
    }
}
