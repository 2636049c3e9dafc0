pub mod types;
pub mod session;
pub mod preprocess;
pub mod cloud;
pub mod local;
pub mod metadata;
pub mod orchestrator;

pub use orchestrator::*;
pub use preprocess::*;
pub use session::*;
pub use types::*;

use thiserror::Error;

/// Upload precondition violations, checked before any OCR method runs.
/// These never count toward the failure-escalation counter — no extraction
/// was attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("no file selected or file is empty")]
    EmptyFile,

    #[error("file too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("unsupported content type: {0} (expected an image or PDF)")]
    UnsupportedType(String),
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image bytes could not be decoded. Fatal for the current image;
    /// the caller must prompt for a different one. Never retried.
    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    #[error("image encoding failed: {0}")]
    ImageEncode(String),

    #[error("upload rejected: {0}")]
    Validation(#[from] ValidationIssue),

    #[error("OCR engine initialization failed: {0}")]
    EngineInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("cloud OCR request failed: {0}")]
    CloudRequest(String),

    #[error("cloud OCR rejected the image: {0}")]
    CloudRejected(String),

    /// Every method in the strategy list was tried and none produced usable
    /// text. Carries the last underlying failure plus remediation guidance;
    /// drives the retry/manual escalation policy, not a terminal failure.
    #[error("all OCR methods failed: {last_error}")]
    Exhausted { last_error: String, guidance: String },
}

impl ExtractionError {
    /// Validation failures are rejected before any method runs and must not
    /// advance the escalation counter.
    pub fn counts_toward_escalation(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}
