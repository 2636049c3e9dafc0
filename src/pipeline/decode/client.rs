//! Chat-completions client for the hosted language model.
//!
//! Single request/response round trip per call — no retry at this layer,
//! no streaming, no conversation state. An explicit timeout is set on the
//! HTTP client so a stalled endpoint surfaces as a typed error instead of
//! hanging the caller.

use std::cell::Cell;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::DecodeError;
use crate::config;

/// Seam for the language-model transport (allows mocking in tests and
/// swapping providers without touching prompt construction).
pub trait LlmClient {
    /// One system + user exchange, returning the model's full reply text.
    fn complete(&self, system: &str, user: &str) -> Result<String, DecodeError>;
}

/// OpenRouter-compatible chat-completions client.
pub struct OpenRouterClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
    referer: Option<String>,
    http: reqwest::blocking::Client,
}

impl OpenRouterClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_secs: u64) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature: 0.3,
            max_tokens: 2500,
            timeout_secs,
            referer: None,
            http,
        }
    }

    /// Client configured from RXLENS_AI_BASE_URL / RXLENS_AI_API_KEY /
    /// RXLENS_AI_MODEL with a 120s timeout.
    pub fn from_env() -> Self {
        Self::new(
            &config::ai_base_url(),
            &config::ai_api_key(),
            &config::ai_model(),
            120,
        )
    }

    /// Referer some gateways require for request attribution.
    pub fn with_referer(mut self, referer: &str) -> Self {
        self.referer = Some(referer.to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

impl LlmClient for OpenRouterClient {
    fn complete(&self, system: &str, user: &str) -> Result<String, DecodeError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let mut request = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-Title", config::APP_NAME)
            .json(&body);
        if let Some(referer) = &self.referer {
            request = request.header("HTTP-Referer", referer);
        }

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                DecodeError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                DecodeError::Timeout(self.timeout_secs)
            } else {
                DecodeError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DecodeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| DecodeError::ResponseParsing(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(DecodeError::EmptyResponse);
        }

        debug!(model = %self.model, chars = content.len(), "AI reply received");
        Ok(content)
    }
}

/// Mock LLM client for testing — returns a configurable reply and counts calls.
pub struct MockLlmClient {
    reply: Result<String, &'static str>,
    calls: Cell<usize>,
}

impl MockLlmClient {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: Cell::new(0),
        }
    }

    pub fn erroring(message: &'static str) -> Self {
        Self {
            reply: Err(message),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl LlmClient for MockLlmClient {
    fn complete(&self, _system: &str, _user: &str) -> Result<String, DecodeError> {
        self.calls.set(self.calls.get() + 1);
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(message) => Err(DecodeError::Connection((*message).to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_client_returns_configured_reply() {
        let client = MockLlmClient::replying("plain text reply");
        let reply = client.complete("system", "user").unwrap();
        assert_eq!(reply, "plain text reply");
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn mock_client_error_path() {
        let client = MockLlmClient::erroring("offline");
        assert!(matches!(
            client.complete("s", "u"),
            Err(DecodeError::Connection(_))
        ));
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = OpenRouterClient::new("https://openrouter.ai/api/v1/", "key", "model-x", 30);
        assert_eq!(client.base_url(), "https://openrouter.ai/api/v1");
        assert_eq!(client.model(), "model-x");
    }

    #[test]
    fn response_with_missing_choices_deserializes_empty() {
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn response_content_deserializes() {
        let json = r#"{"choices":[{"message":{"content":"Take with food"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Take with food");
    }
}
