//! Conversational Q&A over the decoded prescription.
//!
//! Each call is one independent round trip: the question plus static
//! profile/medication context, no server-side conversation state. The
//! visible history is the caller's to keep — [`ChatLog`] is the in-memory
//! helper for that, discarded on session reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MedicationRecord, PatientProfile};
use crate::pipeline::decode::prompt::{build_question_user_prompt, QA_SYSTEM_PROMPT};
use crate::pipeline::decode::{DecodeError, LlmClient};

/// Who said a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Patient,
    Assistant,
}

/// One visible message in the chat panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Caller-owned visible history. Never sent to the model — context beyond
/// the current question is limited to profile and medication summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLog {
    pub id: Uuid,
    pub turns: Vec<ChatTurn>,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatLog {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            turns: Vec::new(),
        }
    }

    pub fn push(&mut self, role: ChatRole, content: &str) {
        self.turns.push(ChatTurn {
            role,
            content: content.to_string(),
            at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Ask one free-text question with optional profile and prescription context.
pub fn answer_question(
    question: &str,
    profile: Option<&PatientProfile>,
    medications: &[MedicationRecord],
    client: &dyn LlmClient,
) -> Result<String, DecodeError> {
    let user_prompt = build_question_user_prompt(question, profile, medications);
    let reply = client.complete(QA_SYSTEM_PROMPT, &user_prompt)?;

    tracing::debug!(question_chars = question.len(), reply_chars = reply.len(), "Q&A reply");
    Ok(reply)
}

/// Ask a question and record both turns into the log.
pub fn answer_and_log(
    log: &mut ChatLog,
    question: &str,
    profile: Option<&PatientProfile>,
    medications: &[MedicationRecord],
    client: &dyn LlmClient,
) -> Result<String, DecodeError> {
    log.push(ChatRole::Patient, question);
    let reply = answer_question(question, profile, medications, client)?;
    log.push(ChatRole::Assistant, &reply);
    Ok(reply)
}
