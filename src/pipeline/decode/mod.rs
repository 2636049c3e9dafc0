pub mod client;
pub mod parser;
pub mod prompt;

pub use client::{LlmClient, MockLlmClient, OpenRouterClient};
pub use parser::{parse_reply, ParseFidelity, ParsedReply};
pub use prompt::{HistoryContext, ProfileContext};

use thiserror::Error;

/// Failures from the hosted language-model endpoint.
///
/// All retryable from the user's point of view — the caller re-offers the
/// submit action; this layer never retries on its own.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("could not reach the AI endpoint: {0}")]
    Connection(String),

    #[error("AI request timed out after {0}s")]
    Timeout(u64),

    #[error("AI processing failed: {status} {body}")]
    Http { status: u16, body: String },

    #[error("no response from AI model")]
    EmptyResponse,

    #[error("failed to parse AI response: {0}")]
    ResponseParsing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_user_presentable() {
        let err = DecodeError::Http {
            status: 503,
            body: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "AI processing failed: 503 Service Unavailable");
        assert_eq!(DecodeError::EmptyResponse.to_string(), "no response from AI model");
        assert_eq!(
            DecodeError::Timeout(120).to_string(),
            "AI request timed out after 120s"
        );
    }
}
