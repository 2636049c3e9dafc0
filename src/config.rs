/// Application-level constants
pub const APP_NAME: &str = "rxlens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard upload ceiling enforced by the OCR orchestrator before any method runs.
/// A different (smaller) limit may apply upstream in the UI; this one is
/// authoritative for the extraction core.
pub const MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024; // 15 MB

/// Default cloud OCR endpoint (OCR.Space-compatible parse API).
pub const DEFAULT_CLOUD_OCR_ENDPOINT: &str = "https://api.ocr.space/parse/image";

/// Default chat-completions base URL (OpenRouter-compatible).
pub const DEFAULT_AI_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default decode/Q&A model.
pub const DEFAULT_AI_MODEL: &str = "deepseek/deepseek-r1:free";

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    format!("{APP_NAME}=info")
}

/// Chat-completions base URL, overridable via RXLENS_AI_BASE_URL.
pub fn ai_base_url() -> String {
    std::env::var("RXLENS_AI_BASE_URL").unwrap_or_else(|_| DEFAULT_AI_BASE_URL.to_string())
}

/// API key for the chat-completions endpoint (RXLENS_AI_API_KEY).
/// Empty string when unset — request construction decides how to fail.
pub fn ai_api_key() -> String {
    std::env::var("RXLENS_AI_API_KEY").unwrap_or_default()
}

/// Decode/Q&A model name, overridable via RXLENS_AI_MODEL.
pub fn ai_model() -> String {
    std::env::var("RXLENS_AI_MODEL").unwrap_or_else(|_| DEFAULT_AI_MODEL.to_string())
}

/// Cloud OCR endpoint, overridable via RXLENS_OCR_ENDPOINT.
pub fn cloud_ocr_endpoint() -> String {
    std::env::var("RXLENS_OCR_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_CLOUD_OCR_ENDPOINT.to_string())
}

/// Cloud OCR API key (RXLENS_OCR_API_KEY). The OCR.Space demo key is the
/// documented fallback for evaluation use.
pub fn cloud_ocr_api_key() -> String {
    std::env::var("RXLENS_OCR_API_KEY").unwrap_or_else(|_| "helloworld".to_string())
}
