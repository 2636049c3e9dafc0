//! Multi-method OCR orchestration.
//!
//! Methods are attempted strictly sequentially in a fixed priority order —
//! local engine, cloud API, metadata fallback — so "first successful,
//! good-enough" short-circuiting is well-defined and no two methods race.
//! The short-circuit conditions are data on each strategy, not scattered
//! conditionals: a strategy carries its own acceptance policy and the
//! orchestrator adds one global confidence bar.

use tracing::{info, warn};

use super::preprocess::ImagePreprocessor;
use super::types::{OcrMethod, OcrOutcome, OcrProgress, ProgressReporter, UploadedFile};
use super::{ExtractionError, OcrSessionState, ValidationIssue};
use crate::config;

/// User-facing remediation steps attached to an exhausted extraction.
pub const REMEDIATION_GUIDANCE: &str = "Please try:\n\
1. Taking a clearer photo with better lighting\n\
2. Ensuring the prescription text is clearly visible\n\
3. Using a higher resolution image\n\
4. Typing the prescription manually for best results";

/// Orchestration thresholds.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hard upload ceiling, checked before any method runs.
    pub max_file_bytes: usize,
    /// A method's output must be strictly longer than this to count as usable.
    pub min_text_chars: usize,
    /// Any successful method above this confidence stops the search.
    pub accept_confidence: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: config::MAX_UPLOAD_BYTES,
            min_text_chars: 10,
            accept_confidence: 70.0,
        }
    }
}

/// Per-strategy stopping predicate: stop the search when this strategy
/// succeeds above its own confidence bar, even below the global one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptPolicy {
    pub min_confidence: Option<f32>,
}

impl AcceptPolicy {
    pub fn above(confidence: f32) -> Self {
        Self {
            min_confidence: Some(confidence),
        }
    }

    fn accepts(&self, outcome: &OcrOutcome) -> bool {
        self.min_confidence
            .map(|bar| outcome.confidence > bar)
            .unwrap_or(false)
    }
}

struct OcrStrategy {
    method: Box<dyn OcrMethod>,
    accept: AcceptPolicy,
}

/// A usable extraction, annotated with how it was obtained.
#[derive(Debug, Clone)]
pub struct ExtractionSuccess {
    pub text: String,
    pub method: &'static str,
    pub confidence: f32,
}

impl ExtractionSuccess {
    /// The text prefixed with the extraction metadata banner the result view
    /// shows above the raw OCR output.
    pub fn annotated_text(&self) -> String {
        format!(
            "=== OCR EXTRACTION RESULTS ===\n\
             Method: {}\n\
             Confidence: {:.1}%\n\
             Text Length: {} characters\n\
             \n\
             === EXTRACTED TEXT ===\n\
             \n\
             {}",
            self.method,
            self.confidence,
            self.text.len(),
            self.text
        )
    }
}

/// Tries each strategy in order until one yields usable text.
pub struct OcrOrchestrator {
    strategies: Vec<OcrStrategy>,
    preprocessor: ImagePreprocessor,
    config: OrchestratorConfig,
}

impl OcrOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            strategies: Vec::new(),
            preprocessor: ImagePreprocessor::default(),
            config,
        }
    }

    /// Append a strategy. Order of calls is the attempt order.
    pub fn with_strategy(mut self, method: Box<dyn OcrMethod>, accept: AcceptPolicy) -> Self {
        self.strategies.push(OcrStrategy { method, accept });
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Production strategy list: local engine (when compiled in and tessdata
    /// is configured), then the cloud API, then the metadata fallback.
    pub fn standard() -> Self {
        #[allow(unused_mut)]
        let mut orchestrator = Self::new(OrchestratorConfig::default());

        #[cfg(feature = "ocr")]
        {
            if let Ok(dir) = std::env::var("RXLENS_TESSDATA_DIR") {
                match super::local::LocalOcrEngine::new(std::path::Path::new(&dir)) {
                    Ok(engine) => {
                        orchestrator = orchestrator
                            .with_strategy(Box::new(engine), AcceptPolicy::above(30.0));
                    }
                    Err(e) => warn!("local OCR engine unavailable: {e}"),
                }
            }
        }

        orchestrator
            .with_strategy(
                Box::new(super::cloud::CloudOcrClient::from_env()),
                AcceptPolicy::default(),
            )
            .with_strategy(
                Box::new(super::metadata::ImageMetadataFallback),
                AcceptPolicy::default(),
            )
    }

    /// Upload preconditions, checked before any method runs. A rejection
    /// here never touches the escalation counter.
    pub fn validate_upload(&self, file: &UploadedFile) -> Result<(), ExtractionError> {
        if file.bytes.is_empty() {
            return Err(ValidationIssue::EmptyFile.into());
        }
        if file.size() > self.config.max_file_bytes {
            return Err(ValidationIssue::TooLarge {
                size: file.size(),
                max: self.config.max_file_bytes,
            }
            .into());
        }

        match file.resolved_content_type() {
            Some(ct) if ct.starts_with("image/") || ct == "application/pdf" => Ok(()),
            Some(ct) => Err(ValidationIssue::UnsupportedType(ct).into()),
            None => Err(ValidationIssue::UnsupportedType("unknown".into()).into()),
        }
    }

    /// Run the strategy list against one upload.
    pub fn extract(
        &self,
        file: &UploadedFile,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<ExtractionSuccess, ExtractionError> {
        self.validate_upload(file)?;

        let total = self.strategies.len();
        let mut best: Option<OcrOutcome> = None;
        let mut last_error = String::new();
        // Preprocessed image shared by every pixel-level method; built lazily
        // so a cloud-only run never decodes locally.
        let mut preprocessed: Option<UploadedFile> = None;

        for (index, strategy) in self.strategies.iter().enumerate() {
            let name = strategy.method.name();
            progress.report(
                "method",
                ((index * 100) / total.max(1)) as u8,
                &format!("Trying {name}..."),
            );

            if strategy.method.prefers_preprocessed() && preprocessed.is_none() {
                // A PDF (or undecodable image) cannot be preprocessed; that
                // fails this method, not the whole search — later methods
                // may still handle the original bytes.
                match self.preprocessor.preprocess(&file.bytes) {
                    Ok(prepared) => {
                        preprocessed = Some(
                            UploadedFile::new(&file.file_name, prepared.png_bytes)
                                .with_content_type("image/png"),
                        );
                    }
                    Err(e) => {
                        warn!(method = name, error = %e, "preprocessing failed, skipping method");
                        last_error = e.to_string();
                        continue;
                    }
                }
            }
            let input: &UploadedFile = if strategy.method.prefers_preprocessed() {
                preprocessed.as_ref().unwrap_or(file)
            } else {
                file
            };

            match strategy.method.extract(input, progress) {
                Ok(outcome) => {
                    if outcome.text.trim().len() <= self.config.min_text_chars {
                        warn!(method = name, "method produced too little text");
                        last_error = format!("{name} produced too little text");
                        continue;
                    }

                    info!(
                        method = name,
                        confidence = outcome.confidence,
                        chars = outcome.text.len(),
                        "OCR method succeeded"
                    );

                    let stop = strategy.accept.accepts(&outcome)
                        || outcome.confidence > self.config.accept_confidence;

                    // Always prefer the first successful result; later
                    // methods only decide whether to keep searching.
                    if best.is_none() {
                        best = Some(outcome);
                    }
                    if stop {
                        break;
                    }
                }
                Err(e) => {
                    warn!(method = name, error = %e, "OCR method failed");
                    last_error = e.to_string();
                }
            }
        }

        match best {
            Some(outcome) => {
                progress.report("complete", 100, "OCR extraction completed");
                Ok(ExtractionSuccess {
                    text: outcome.text,
                    method: outcome.method,
                    confidence: outcome.confidence,
                })
            }
            None => {
                if last_error.is_empty() {
                    last_error = "no OCR method produced usable text".to_string();
                }
                Err(ExtractionError::Exhausted {
                    last_error,
                    guidance: REMEDIATION_GUIDANCE.to_string(),
                })
            }
        }
    }

    /// Like [`extract`](Self::extract), recording the outcome into the
    /// caller's session state for the retry/manual escalation policy.
    pub fn extract_with_session(
        &self,
        file: &UploadedFile,
        session: &mut OcrSessionState,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<ExtractionSuccess, ExtractionError> {
        match self.extract(file, progress) {
            Ok(success) => {
                session.record_success();
                Ok(success)
            }
            Err(e) => {
                session.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Convenience wrapper taking a plain closure as the progress sink.
    pub fn extract_with(
        &self,
        file: &UploadedFile,
        sink: &mut dyn FnMut(OcrProgress),
    ) -> Result<ExtractionSuccess, ExtractionError> {
        let mut progress = ProgressReporter::new(sink);
        self.extract(file, &mut progress)
    }
}
