//! Cloud OCR method — OCR.Space-compatible parse API.
//!
//! Multipart file upload plus language/engine parameters; the response is a
//! JSON envelope with a processing-error flag and an array of parsed-text
//! results, of which the first element's text is used. The API does its own
//! scaling and orientation detection, so this method receives the original
//! upload, not the preprocessed image.

use base64::Engine as _;
use serde::Deserialize;
use tracing::debug;

use super::types::{OcrMethod, OcrOutcome, ProgressReporter, UploadedFile};
use super::ExtractionError;
use crate::config;

/// Method identifier reported in outcomes and progress messages.
pub const CLOUD_METHOD_NAME: &str = "cloud-ocr";

/// The parse API reports no numeric confidence; successful extractions are
/// assigned this fixed score for orchestration decisions.
const CLOUD_ASSUMED_CONFIDENCE: f32 = 85.0;

/// Below this many characters the extraction is treated as failed — the
/// image almost certainly contains no readable text.
const MIN_PARSED_CHARS: usize = 3;

/// OCR.Space-compatible HTTP client.
pub struct CloudOcrClient {
    endpoint: String,
    api_key: String,
    language: String,
    /// Engine 2 handles rotated/low-contrast photos better than engine 1.
    engine: u8,
    /// Send the image as an inline base64 data URI instead of a file part.
    inline_base64: bool,
    http: reqwest::blocking::Client,
}

impl CloudOcrClient {
    pub fn new(endpoint: &str, api_key: &str, timeout_secs: u64) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            language: "eng".to_string(),
            engine: 2,
            inline_base64: false,
            http,
        }
    }

    /// Client configured from RXLENS_OCR_ENDPOINT / RXLENS_OCR_API_KEY.
    pub fn from_env() -> Self {
        Self::new(&config::cloud_ocr_endpoint(), &config::cloud_ocr_api_key(), 60)
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Switch the upload to an inline `base64Image` data URI. Some gateways
    /// reject multipart file parts; the parse API accepts both forms.
    pub fn with_inline_base64(mut self, inline: bool) -> Self {
        self.inline_base64 = inline;
        self
    }

    fn build_form(&self, file: &UploadedFile) -> reqwest::blocking::multipart::Form {
        let mime = file
            .resolved_content_type()
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let form = reqwest::blocking::multipart::Form::new()
            .text("language", self.language.clone())
            .text("isOverlayRequired", "false")
            .text("apikey", self.api_key.clone())
            .text("OCREngine", self.engine.to_string())
            .text("scale", "true")
            .text("isTable", "false")
            .text("detectOrientation", "true");

        if self.inline_base64 {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&file.bytes);
            form.text("base64Image", format!("data:{mime};base64,{encoded}"))
        } else {
            let part = reqwest::blocking::multipart::Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&mime)
                .unwrap_or_else(|_| {
                    reqwest::blocking::multipart::Part::bytes(file.bytes.clone())
                        .file_name(file.file_name.clone())
                });
            form.part("file", part)
        }
    }
}

/// Response envelope from the parse API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParseResponse {
    #[serde(default)]
    is_errored_on_processing: bool,
    /// String or array of strings depending on the failure — kept loose.
    error_message: Option<serde_json::Value>,
    parsed_results: Option<Vec<ParsedResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    parsed_text: Option<String>,
}

impl ParseResponse {
    fn error_text(&self) -> String {
        match &self.error_message {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Array(parts)) => parts
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            _ => "Unknown error".to_string(),
        }
    }
}

impl OcrMethod for CloudOcrClient {
    fn name(&self) -> &'static str {
        CLOUD_METHOD_NAME
    }

    fn extract(
        &self,
        file: &UploadedFile,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<OcrOutcome, ExtractionError> {
        progress.report("upload", 10, "Uploading image to cloud OCR...");

        let form = self.build_form(file);

        progress.report("processing", 50, "Processing image with cloud OCR...");

        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ExtractionError::CloudRequest(format!(
                        "could not reach {}: {e}",
                        self.endpoint
                    ))
                } else if e.is_timeout() {
                    ExtractionError::CloudRequest("request timed out".to_string())
                } else {
                    ExtractionError::CloudRequest(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = match status.as_u16() {
                401 => "authentication failed - invalid API key".to_string(),
                404 => "endpoint not found - API key may be invalid or service unavailable"
                    .to_string(),
                429 => "rate limit exceeded - please try again later".to_string(),
                code => format!("HTTP {code}"),
            };
            return Err(ExtractionError::CloudRequest(detail));
        }

        progress.report("parsing", 90, "Parsing OCR results...");

        let parsed: ParseResponse = response
            .json()
            .map_err(|e| ExtractionError::CloudRequest(format!("malformed response: {e}")))?;

        if parsed.is_errored_on_processing {
            return Err(ExtractionError::CloudRejected(parsed.error_text()));
        }

        let text = parsed
            .parsed_results
            .as_ref()
            .and_then(|results| results.first())
            .and_then(|r| r.parsed_text.as_deref())
            .unwrap_or("")
            .trim()
            .to_string();

        if text.len() < MIN_PARSED_CHARS {
            return Err(ExtractionError::OcrProcessing(
                "extracted text is too short - image may not contain readable text".to_string(),
            ));
        }

        progress.report("complete", 100, "Cloud OCR extraction completed");
        debug!(chars = text.len(), "cloud OCR extraction succeeded");

        Ok(OcrOutcome {
            text,
            confidence: CLOUD_ASSUMED_CONFIDENCE,
            method: CLOUD_METHOD_NAME,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_envelope_deserializes() {
        let json = r#"{
            "ParsedResults": [{"ParsedText": "Amoxicillin 500mg\nTake t.i.d"}],
            "IsErroredOnProcessing": false
        }"#;
        let parsed: ParseResponse = serde_json::from_str(json).unwrap();
        assert!(!parsed.is_errored_on_processing);
        assert_eq!(
            parsed.parsed_results.unwrap()[0].parsed_text.as_deref(),
            Some("Amoxicillin 500mg\nTake t.i.d")
        );
    }

    #[test]
    fn error_message_string_form() {
        let json = r#"{"IsErroredOnProcessing": true, "ErrorMessage": "Timed out"}"#;
        let parsed: ParseResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.error_text(), "Timed out");
    }

    #[test]
    fn error_message_array_form() {
        let json =
            r#"{"IsErroredOnProcessing": true, "ErrorMessage": ["E101", "image unreadable"]}"#;
        let parsed: ParseResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.error_text(), "E101; image unreadable");
    }

    #[test]
    fn missing_error_message_has_fallback() {
        let json = r#"{"IsErroredOnProcessing": true}"#;
        let parsed: ParseResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.error_text(), "Unknown error");
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = CloudOcrClient::new("https://ocr.example/parse/image/", "key", 30);
        assert_eq!(client.endpoint, "https://ocr.example/parse/image");
        assert_eq!(client.name(), CLOUD_METHOD_NAME);
    }
}
